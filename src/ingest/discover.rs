// File discovery and classification for ingest

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{
    ARCHIVE_EXTENSION, AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, IMPORTABLE_EXTENSIONS,
    LUT_EXTENSIONS, MACRO_EXTENSIONS, PATH_DB_SEPARATOR, VIDEO_EXTENSIONS,
};
use crate::db::schema::AssetKind;
use crate::error::{ShelfError, Result};

/// Lowercased extension without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is something a scan should pick up
pub fn is_importable(path: &Path) -> bool {
    match extension_of(path) {
        Some(ext) => IMPORTABLE_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

pub fn is_archive(path: &Path) -> bool {
    extension_of(path).as_deref() == Some(ARCHIVE_EXTENSION)
}

/// Determine asset kind from file extension
pub fn detect_kind(path: &Path) -> AssetKind {
    let ext = extension_of(path).unwrap_or_default();
    let ext = ext.as_str();

    if VIDEO_EXTENSIONS.contains(&ext) {
        AssetKind::Video
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        AssetKind::Image
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        AssetKind::Audio
    } else if ext == ARCHIVE_EXTENSION {
        AssetKind::Archive
    } else if MACRO_EXTENSIONS.contains(&ext) {
        AssetKind::Macro
    } else if LUT_EXTENSIONS.contains(&ext) {
        AssetKind::Lut
    } else {
        AssetKind::Other
    }
}

/// Importable files under `root`, in walk order (sorted by name per directory)
pub fn discover_importable(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_importable(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Count importable files under `root` (first scan pass, for progress totals)
pub fn count_importable(root: &Path) -> usize {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_importable(e.path()))
        .count()
}

/// Clean up a caller-supplied category path.
/// `\` becomes `/`, empty and `.` segments go away, `..` and absolute paths are rejected.
/// Returns `None` for the uncategorized root.
pub fn normalize_category(raw: Option<&str>) -> Result<Option<String>> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(None),
    };

    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') || Path::new(raw).is_absolute() {
        return Err(ShelfError::InvalidPath(format!("category must be relative: {}", raw)));
    }

    let mut segments = Vec::new();
    for segment in unified.split(PATH_DB_SEPARATOR) {
        match segment.trim() {
            "" | "." => continue,
            ".." => return Err(ShelfError::InvalidPath(format!("category may not contain '..': {}", raw))),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(segments.join("/")))
}

/// `dir` relative to `root` as a `/`-separated path, `None` when `dir` is `root`.
pub fn relative_dir(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Category for files directly inside `dir` during a scan of `root`:
/// one segment per directory level, prefixed by `base` when given.
pub fn derive_category(root: &Path, dir: &Path, base: Option<&str>) -> Option<String> {
    match (base, relative_dir(root, dir)) {
        (Some(base), Some(sub)) => Some(format!("{}/{}", base, sub)),
        (Some(base), None) => Some(base.to_string()),
        (None, sub) => sub,
    }
}
