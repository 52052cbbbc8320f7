//! Track discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the decoder is expected to handle
pub const AUDIO_EXTENSIONS: [&str; 7] = ["flac", "wav", "mp3", "ogg", "m4a", "aac", "aiff"];

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand files and directories into a sorted, de-duplicated track list.
/// Directories are walked recursively; non-audio files are ignored.
pub fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_audio_file(path) {
                files.push(path.clone());
            }
        } else if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            log::warn!("Skipping {}: no such file or directory", path.display());
        }
    }

    files.sort();
    files.dedup();
    files
}
