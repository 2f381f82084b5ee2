use std::fs;
use std::path::{Path, PathBuf};

use super::track::TrackDescriptor;
use super::ManifestError;

/// Tracks from a manifest plus the directory their `src` paths resolve against.
#[derive(Clone, Debug)]
pub struct Playlist {
    pub tracks: Vec<TrackDescriptor>,
    pub base_dir: PathBuf,
}

impl Playlist {
    pub fn new(tracks: Vec<TrackDescriptor>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            tracks,
            base_dir: base_dir.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackDescriptor> {
        self.tracks.get(index)
    }

    /// Filesystem path of a track, or `None` for descriptors without a source.
    pub fn resolve(&self, track: &TrackDescriptor) -> Option<PathBuf> {
        track.has_source().then(|| self.base_dir.join(&track.src))
    }
}

pub fn read_manifest(path: &Path) -> Result<Vec<TrackDescriptor>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the playlist, substituting a single placeholder if the manifest is
/// unavailable or malformed.
pub fn load_manifest(path: &Path) -> Playlist {
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    match read_manifest(path) {
        Ok(tracks) => {
            if tracks.is_empty() {
                log::info!("No tracks found in {}", path.display());
            } else {
                log::info!("Loaded {} tracks from {}", tracks.len(), path.display());
            }
            Playlist::new(tracks, base_dir)
        }
        Err(err) => {
            log::warn!("Error loading tracks: {}", err);
            Playlist::new(vec![TrackDescriptor::placeholder()], base_dir)
        }
    }
}
