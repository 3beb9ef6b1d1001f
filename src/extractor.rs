use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::quality::Quality;

/// Metadata reported by the extraction tool for a single video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("{0} is not installed")]
    NotInstalled(String),
    #[error("{0} timeout")]
    Timeout(&'static str),
    #[error("{0}")]
    Failed(String),
    #[error("No file found")]
    NoFile,
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("could not parse extractor output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

/// The external program that understands video pages and produces files.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Makes sure the tool can be invoked, returning its version.
    async fn check_dependencies(&self) -> Result<String, ExtractorError>;

    /// Looks up metadata without downloading anything.
    async fn probe(&self, url: &str) -> Result<Metadata, ExtractorError>;

    /// Downloads `url` into `outdir`, returning the path of the produced file.
    async fn fetch(
        &self,
        url: &str,
        quality: Quality,
        outdir: &Path,
    ) -> Result<PathBuf, ExtractorError>;
}
