use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;

pub const DEFAULT_PORT: u16 = 3001;

/// Local HTTP bridge for downloading videos with yt-dlp
#[derive(Parser, Debug, Clone)]
#[command(name = "vidl-rs")]
#[command(version)]
pub struct Args {
    /// Port to listen on (always bound to 127.0.0.1)
    #[arg(short, long, env = "VIDL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory downloads are written to before being served
    #[arg(short, long, env = "VIDL_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// yt-dlp command line, e.g. "python3 -m yt_dlp"
    #[arg(long, env = "VIDL_YTDLP", default_value = crate::ytdlp::PROGRAM)]
    pub ytdlp: String,

    /// Python interpreter used to install yt-dlp when it is missing
    #[arg(long, env = "VIDL_PYTHON", default_value = "python3")]
    pub python: String,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(default_download_dir)
    }
}

/// `~/Downloads/VideoDownloads`, or `./VideoDownloads` without a home
/// directory.
pub fn default_download_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("VideoDownloads")
}
