use std::fmt;

use serde::Serialize;

/// Coarse label for the site a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
    Twitter,
    Reddit,
    Direct,
}

// First match wins.
const PATTERNS: &[(&[&str], Platform)] = &[
    (&["youtube.com", "youtu.be"], Platform::Youtube),
    (&["tiktok.com"], Platform::Tiktok),
    (&["instagram.com"], Platform::Instagram),
    (&["facebook.com", "fb.watch"], Platform::Facebook),
    (&["twitter.com", "x.com"], Platform::Twitter),
    (&["reddit.com"], Platform::Reddit),
];

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
            Platform::Direct => "direct",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a URL by case-insensitive substring match. Anything that
/// matches none of the known sites is `Direct`.
pub fn detect(url: &str) -> Platform {
    let url = url.to_lowercase();

    PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| url.contains(n)))
        .map(|(_, platform)| *platform)
        .unwrap_or(Platform::Direct)
}
