use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use vidl_rs::{config::Args, downloader::Downloader, server, ytdlp::YtDlp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ytdlp = YtDlp::from_command_line(&args.ytdlp).with_python(&args.python);
    let downloader = Arc::new(Downloader::new(Arc::new(ytdlp), args.download_dir()));

    // Nothing can be served without the extractor.
    let version = downloader
        .check_dependencies()
        .await
        .context("yt-dlp is unavailable")?;
    info!("Using yt-dlp {}", version);
    info!("Downloading into {}", downloader.download_dir().display());

    let addr = args.listen_addr();
    server::serve(downloader, addr)
        .await
        .with_context(|| format!("running server on {}", addr))?;

    info!("Done");
    Ok(())
}
