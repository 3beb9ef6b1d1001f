//! # vidl-rs
//!
//! A small local HTTP bridge in front of [yt-dlp](https://github.com/yt-dlp/yt-dlp).
//! A client can probe a video URL for metadata and ask for the video itself,
//! which is downloaded into a scratch directory, streamed back and deleted.
//!
//! ## Usage
//!
//! The [`downloader::Downloader`] facade is constructed explicitly around an
//! [`extractor::Extractor`], so tests can swap the subprocess adapter for a
//! fake one.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vidl_rs::{downloader::Downloader, quality::Quality, ytdlp::YtDlp};
//!
//! #[tokio::main]
//! async fn main() {
//!     let downloader = Downloader::new(Arc::new(YtDlp::default()), "/tmp/videos");
//!     downloader.check_dependencies().await.unwrap();
//!
//!     let info = downloader.get_video_info("https://youtu.be/...").await;
//!     println!("{} on {}", info.title, info.platform);
//!
//!     let file = downloader
//!         .download("https://youtu.be/...", Quality::P1080)
//!         .await
//!         .unwrap();
//!     println!("Saved {}", file.path.display());
//! }
//! ```
//!
//! The `server` module exposes the same operations over HTTP:
//!
//! - `GET /api/check?url=` returns the detected platform and title.
//! - `GET /api/download?url=&quality=` streams the downloaded file.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod config;
pub mod downloader;
pub mod extractor;
pub mod platform;
pub mod quality;
pub mod server;
pub mod util;
pub mod ytdlp;
