use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

// Leftovers yt-dlp writes while a download is still in flight.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

fn is_partial(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Returns the most recently modified regular file directly inside `dir`.
///
/// This is a heuristic: two downloads finishing in the same directory at
/// the same time can pick up each other's files.
pub async fn newest_file(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !meta.is_file() || is_partial(&path) {
            continue;
        }

        let modified = meta.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Lists in-flight download leftovers directly inside `dir`.
pub async fn partial_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut parts = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_partial(&path) {
            parts.push(path);
        }
    }

    parts.sort();
    Ok(parts)
}

/// Removes a file, logging instead of failing. Returns whether anything was
/// removed.
pub fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) => {
            debug!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let mut bytes = bytes as f64;
    let mut suffix = "B";

    for next in ["KiB", "MiB", "GiB", "TiB"] {
        if bytes <= 1024.0 {
            break;
        }
        bytes /= 1024.0;
        suffix = next;
    }

    format!("{:.2} {}", bytes, suffix)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[tokio::test]
    async fn newest_file_picks_latest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.mp4", 300);
        let newest = touch(dir.path(), "new.webm", 10);
        touch(dir.path(), "middle.mp3", 100);

        assert_eq!(newest_file(dir.path()).await.unwrap(), Some(newest));
    }

    #[tokio::test]
    async fn newest_file_ignores_dirs_and_partials() {
        let dir = tempfile::tempdir().unwrap();
        let done = touch(dir.path(), "done.mp4", 60);
        touch(dir.path(), "in_flight.mp4.part", 1);
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        assert_eq!(newest_file(dir.path()).await.unwrap(), Some(done));
    }

    #[tokio::test]
    async fn newest_file_in_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(newest_file(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_files_lists_only_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "done.mp4", 0);
        let part = touch(dir.path(), "clip.f137.mp4.part", 0);
        let ytdl = touch(dir.path(), "clip.f137.mp4.ytdl", 0);

        assert_eq!(partial_files(dir.path()).await.unwrap(), vec![part, ytdl]);
    }

    #[test]
    fn remove_quietly_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "video.mp4", 0);

        assert!(remove_quietly(&path));
        assert!(!path.exists());
        assert!(!remove_quietly(&path));
    }

    #[test]
    fn format_bytes_picks_suffix() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
    }
}
