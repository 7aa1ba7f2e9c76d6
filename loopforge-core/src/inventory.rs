use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Container extensions accepted as raw audio clips.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg"];

/// Container extensions accepted as raw video clips.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// File name prefix used for assembled production artifacts.
pub const PRODUCTION_PREFIX: &str = "production_";

/// Enumerates clips directly inside `dir` whose extension matches.
///
/// A missing directory yields an empty inventory rather than an error; the
/// caller decides whether that is worth reporting.
pub fn scan_clips(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut clips = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            clips.push(entry.into_path());
        }
    }
    clips.sort();
    Ok(clips)
}

/// Production artifacts (files named `production_*`) inside `dir`.
pub fn production_files(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let clips = scan_clips(dir, extensions)?;
    Ok(clips
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(PRODUCTION_PREFIX))
                .unwrap_or(false)
        })
        .collect())
}

/// Newest production artifact by modification time.
pub fn latest_production_file(dir: &Path, extensions: &[&str]) -> io::Result<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for path in production_files(dir, extensions)? {
        let modified = path.metadata()?.modified()?;
        match &latest {
            Some((newest, _)) if modified <= *newest => {}
            _ => latest = Some((modified, path)),
        }
    }
    Ok(latest.map(|(_, path)| path))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
