use std::fmt;

/// Requested output quality, mapped onto a yt-dlp format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    P720,
    P1080,
    P1440,
    P2160,
    Audio,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::Best,
        Quality::P720,
        Quality::P1080,
        Quality::P1440,
        Quality::P2160,
        Quality::Audio,
    ];

    /// Parses a quality label. Unrecognized labels fall back to `Best`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "720" => Quality::P720,
            "1080" => Quality::P1080,
            "1440" => Quality::P1440,
            "4k" => Quality::P2160,
            "audio" => Quality::Audio,
            _ => Quality::Best,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P720 => "720",
            Quality::P1080 => "1080",
            Quality::P1440 => "1440",
            Quality::P2160 => "4k",
            Quality::Audio => "audio",
        }
    }

    pub fn format_selector(&self) -> &'static str {
        match self {
            Quality::Best => "bestvideo+bestaudio/best",
            Quality::P720 => "bestvideo[height<=720]+bestaudio/best[height<=720]",
            Quality::P1080 => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            Quality::P1440 => "bestvideo[height<=1440]+bestaudio/best[height<=1440]",
            Quality::P2160 => "bestvideo[height<=2160]+bestaudio/best[height<=2160]",
            Quality::Audio => "bestaudio/best",
        }
    }

    /// Arguments passed to yt-dlp to select this quality.
    pub fn args(&self) -> Vec<&'static str> {
        let mut args = vec!["-f", self.format_selector()];
        if *self == Quality::Audio {
            args.extend(["-x", "--audio-format", "mp3"]);
        }
        args
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
