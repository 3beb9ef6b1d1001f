use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    extractor::{Extractor, ExtractorError},
    platform::{self, Platform},
    quality::Quality,
};

/// Result of a metadata lookup. Lookup failures are reported through `ok`
/// and `error` rather than returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub ok: bool,
    pub title: String,
    pub duration: f64,
    pub uploader: String,
    pub thumbnail: String,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub filename: String,
}

pub type DownloadResult = Result<DownloadedFile, ExtractorError>;

/// Facade over an [`Extractor`] writing into one download directory.
pub struct Downloader {
    extractor: Arc<dyn Extractor>,
    download_dir: PathBuf,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn Extractor>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Creates the download directory and makes sure the extractor can run.
    pub async fn check_dependencies(&self) -> Result<String, ExtractorError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        self.extractor.check_dependencies().await
    }

    pub async fn get_video_info(&self, url: &str) -> VideoInfo {
        let platform = platform::detect(url);

        match self.extractor.probe(url).await {
            Ok(meta) => VideoInfo {
                ok: true,
                title: meta.title.unwrap_or_else(|| "Unknown".to_string()),
                duration: meta.duration.unwrap_or_default(),
                uploader: meta.uploader.unwrap_or_else(|| "Unknown".to_string()),
                thumbnail: meta.thumbnail.unwrap_or_default(),
                platform,
                error: None,
            },
            Err(e) => {
                warn!("Metadata lookup for {} failed: {}", url, e);
                VideoInfo {
                    ok: false,
                    title: String::new(),
                    duration: 0.0,
                    uploader: String::new(),
                    thumbnail: String::new(),
                    platform,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn download(&self, url: &str, quality: Quality) -> DownloadResult {
        let path = self
            .extractor
            .fetch(url, quality, &self.download_dir)
            .await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ExtractorError::NoFile)?;

        info!("Downloaded {}", path.display());
        Ok(DownloadedFile { path, filename })
    }
}
