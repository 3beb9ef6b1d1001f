use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Output, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_aux::prelude::*;
use tokio::process::Command;

use crate::{
    extractor::{Extractor, ExtractorError, Metadata},
    quality::Quality,
    util,
};

pub const PROGRAM: &str = "yt-dlp";
pub const OUTPUT_TEMPLATE: &str = "%(title)s_%(id)s.%(ext)s";

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Adapter that shells out to yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    leading_args: Vec<String>,
    python: String,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct DumpJson {
    id: Option<String>,
    title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    duration: Option<f64>,
    uploader: Option<String>,
    thumbnail: Option<String>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(PROGRAM)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            python: "python3".to_string(),
            probe_timeout: PROBE_TIMEOUT,
            fetch_timeout: FETCH_TIMEOUT,
        }
    }

    /// Builds an adapter from a command line such as `python3 -m yt_dlp`.
    pub fn from_command_line(cmdline: &str) -> Self {
        let mut parts = cmdline.split_whitespace();
        match parts.next() {
            Some(program) => Self::new(program).with_args(parts),
            None => Self::default(),
        }
    }

    /// Arguments placed before every invocation's own arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Interpreter used to `pip install` yt-dlp when it is missing.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_timeouts(mut self, probe: Duration, fetch: Duration) -> Self {
        self.probe_timeout = probe;
        self.fetch_timeout = fetch;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(
        &self,
        args: &[OsString],
        limit: Duration,
        stage: &'static str,
    ) -> Result<Output, ExtractorError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so ffmpeg and other helpers die with yt-dlp.
        #[cfg(unix)]
        cmd.process_group(0);

        debug!("Running {} {:?} {:?}", self.program, self.leading_args, args);
        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractorError::NotInstalled(self.program.clone()),
            _ => ExtractorError::IoError(e),
        })?;
        let pid = child.id();

        // Dropping the child on timeout kills it; the rest of its group follows.
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("{} gave up after {:?}", stage, limit);
                if let Some(pid) = pid {
                    kill_process_group(pid).await;
                }
                return Err(ExtractorError::Timeout(stage));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} exited with {}: {}", self.program, output.status, stderr);
            return Err(ExtractorError::Failed(if stderr.is_empty() {
                format!("{} failed", stage)
            } else {
                stderr
            }));
        }

        Ok(output)
    }

    async fn version(&self) -> Result<String, ExtractorError> {
        let output = self
            .run(&[OsString::from("--version")], VERSION_TIMEOUT, "Version check")
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn install(&self) {
        info!("Installing {} with {} -m pip", PROGRAM, self.python);
        let status = Command::new(&self.python)
            .args(["-m", "pip", "install", PROGRAM])
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => info!("Installed {}", PROGRAM),
            Ok(status) => warn!("pip exited with {}", status),
            Err(e) => warn!("Could not run {}: {}", self.python, e),
        }
    }
}

#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let status = Command::new("kill")
        .args(["-KILL", "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => debug!("Killed process group {}", pgid),
        Ok(_) => debug!("Process group {} already gone", pgid),
        Err(e) => warn!("Could not kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32) {}

pub fn parse_metadata(stdout: &[u8]) -> Result<Metadata, serde_json::Error> {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    let info: DumpJson = serde_json::from_str(line)?;

    Ok(Metadata {
        id: info.id,
        title: info.title,
        duration: info.duration,
        uploader: info.uploader,
        thumbnail: info.thumbnail,
    })
}

pub fn fetch_args(url: &str, quality: Quality, outdir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = quality.args().into_iter().map(OsString::from).collect();
    args.push("-o".into());
    args.push(outdir.join(OUTPUT_TEMPLATE).into_os_string());
    args.extend(
        [
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--print",
            "after_move:filepath",
            url,
        ]
        .map(OsString::from),
    );
    args
}

/// Logs partial files an aborted download left behind. They are not removed
/// since another download may still be writing them.
async fn report_leftovers(outdir: &Path) {
    match util::partial_files(outdir).await {
        Ok(parts) if !parts.is_empty() => warn!(
            "{} partial file(s) left in {}: {:?}",
            parts.len(),
            outdir.display(),
            parts
        ),
        Ok(_) => (),
        Err(e) => debug!("Could not scan {}: {}", outdir.display(), e),
    }
}

/// Picks the path yt-dlp printed, if it points at a file.
fn reported_path(stdout: &[u8]) -> Option<PathBuf> {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

#[async_trait]
impl Extractor for YtDlp {
    async fn check_dependencies(&self) -> Result<String, ExtractorError> {
        match self.version().await {
            Ok(version) => return Ok(version),
            Err(e) => warn!("{} is not usable: {}", self.program, e),
        }

        self.install().await;
        self.version()
            .await
            .map_err(|_| ExtractorError::NotInstalled(self.program.clone()))
    }

    async fn probe(&self, url: &str) -> Result<Metadata, ExtractorError> {
        let args = ["--dump-json", "--no-playlist", url].map(OsString::from);
        let output = self
            .run(&args, self.probe_timeout, "Metadata lookup")
            .await?;
        Ok(parse_metadata(&output.stdout)?)
    }

    async fn fetch(
        &self,
        url: &str,
        quality: Quality,
        outdir: &Path,
    ) -> Result<PathBuf, ExtractorError> {
        info!("Downloading {} ({}) to {}", url, quality, outdir.display());
        let output = match self
            .run(&fetch_args(url, quality, outdir), self.fetch_timeout, "Download")
            .await
        {
            Ok(output) => output,
            Err(e) => {
                report_leftovers(outdir).await;
                return Err(e);
            }
        };

        if let Some(path) = reported_path(&output.stdout) {
            return Ok(path);
        }

        warn!(
            "{} did not report an output file, using the newest file in {}",
            self.program,
            outdir.display()
        );
        util::newest_file(outdir).await?.ok_or(ExtractorError::NoFile)
    }
}
