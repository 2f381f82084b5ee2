use std::fs;
use std::path::{Path, PathBuf};

use super::track::{describe_track, TrackDescriptor};
use super::ManifestError;

const AUDIO_EXTENSION: &str = "mp3";

/// Recursively collect MP3 files under `dir`.
///
/// Entries of each directory are visited in file-name order, so the result is
/// stable across runs. `src` paths are made relative to `base` when possible.
pub fn scan_audio_directory(dir: &Path, base: &Path) -> Result<Vec<TrackDescriptor>, ManifestError> {
    let mut tracks = Vec::new();
    scan_recursive(dir, base, &mut tracks)?;
    Ok(tracks)
}

fn scan_recursive(
    dir: &Path,
    base: &Path,
    tracks: &mut Vec<TrackDescriptor>,
) -> Result<(), ManifestError> {
    let io_err = |source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(io_err)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            scan_recursive(&path, base, tracks)?;
        } else if is_audio_file(&path) {
            let src = source_path(&path, base);
            log::debug!("Found track: {}", src);
            tracks.push(describe_track(&path, src));
        }
    }

    Ok(())
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(AUDIO_EXTENSION))
}

fn source_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan `audio_dir` and write the manifest to `output`.
///
/// A missing audio directory produces an empty manifest rather than an error.
/// Returns the number of tracks written.
pub fn generate_manifest(audio_dir: &Path, output: &Path) -> Result<usize, ManifestError> {
    let base = output.parent().unwrap_or_else(|| Path::new(""));

    let tracks = if audio_dir.is_dir() {
        scan_audio_directory(audio_dir, base)?
    } else {
        log::info!(
            "Audio directory {} not found. Creating empty manifest",
            audio_dir.display()
        );
        Vec::new()
    };

    let json = serde_json::to_string_pretty(&tracks).map_err(|source| ManifestError::Serialize {
        path: output.to_path_buf(),
        source,
    })?;
    fs::write(output, json).map_err(|source| ManifestError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    log::info!("Generated {} with {} tracks", output.display(), tracks.len());
    Ok(tracks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn scans_recursively_in_name_order() {
        let tmp = TempDir::new().unwrap();
        let audio = tmp.path().join("audio");
        touch(&audio.join("b.mp3"));
        touch(&audio.join("a - Song.MP3"));
        touch(&audio.join("notes.txt"));
        touch(&audio.join("sub/c.mp3"));

        let tracks = scan_audio_directory(&audio, tmp.path()).unwrap();
        let srcs: Vec<_> = tracks.iter().map(|t| t.src.as_str()).collect();
        assert_eq!(srcs, ["audio/a - Song.MP3", "audio/b.mp3", "audio/sub/c.mp3"]);
        assert_eq!(tracks[0].artist, "a");
        assert_eq!(tracks[0].title, "Song");
    }

    #[test]
    fn missing_directory_writes_empty_manifest() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("tracks.json");
        let count = generate_manifest(&tmp.path().join("nope"), &out).unwrap();
        assert_eq!(count, 0);
        let parsed: Vec<TrackDescriptor> =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn generated_manifest_is_relative_to_output() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("audio/Artist - Title.mp3"));
        let out = tmp.path().join("tracks.json");

        assert_eq!(generate_manifest(&tmp.path().join("audio"), &out).unwrap(), 1);
        let parsed: Vec<TrackDescriptor> =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed[0].src, "audio/Artist - Title.mp3");
    }
}
