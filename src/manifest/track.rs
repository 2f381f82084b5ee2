use serde::{Deserialize, Serialize};
use std::path::Path;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// One entry of `tracks.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    /// Path of the audio file, `/`-separated, relative to the manifest.
    pub src: String,
}

impl TrackDescriptor {
    /// Stand-in shown when the manifest could not be loaded.
    pub fn placeholder() -> Self {
        Self {
            title: "No tracks available".into(),
            artist: "Please add MP3s to the audio folder".into(),
            src: String::new(),
        }
    }

    pub fn has_source(&self) -> bool {
        !self.src.is_empty()
    }
}

/// Derive title and artist from a file name of the form `Artist - Title.mp3`.
pub fn describe_track(path: &Path, src: String) -> TrackDescriptor {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut parts = stem.split(" - ");
    match (parts.next(), parts.next()) {
        (Some(artist), Some(title)) => TrackDescriptor {
            title: title.trim().to_string(),
            artist: artist.trim().to_string(),
            src,
        },
        _ => TrackDescriptor {
            title: stem.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            src,
        },
    }
}
