// Archive expansion
//
// A package archive (.drfx, a zip) is unpacked into its own folder under
// storage. Every `.setting` member becomes a catalog entry whose kind comes
// from the folder keywords above it and whose category is its folder path
// inside the archive.

use std::fs::File;
use std::path::{Path, PathBuf};
use rusqlite::Connection;
use serde::Serialize;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::constants::{
    ARCHIVE_DEFAULT_KIND, ARCHIVE_KIND_KEYWORDS, ARCHIVE_MEMBER_EXTENSIONS,
    ROOT_CATEGORY, SIDECAR_PREVIEW_EXTENSIONS,
};
use crate::db::schema::{self, AssetKind, InsertOutcome, NewAsset};
use crate::error::{ShelfError, Result};
use crate::ingest::copy::random_suffix;
use crate::ingest::discover::{extension_of, relative_dir};

/// What one archive expansion produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveExpansion {
    pub extract_dir: PathBuf,
    /// New catalog entries created from members
    pub registered: usize,
    /// Members whose storage path was already cataloged
    pub already_cataloged: usize,
}

/// Unpack `archive_path` into a fresh `<stem>_<8 hex>` folder under `storage_root`
/// and register its members.
pub fn expand_archive(conn: &Connection, archive_path: &Path, storage_root: &Path) -> Result<ArchiveExpansion> {
    if !archive_path.is_file() {
        return Err(ShelfError::SourceNotFound(archive_path.to_path_buf()));
    }

    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ShelfError::InvalidPath(format!("No file name: {}", archive_path.display())))?;

    let extract_dir = storage_root.join(format!("{}_{}", stem, random_suffix()));
    std::fs::create_dir_all(&extract_dir)?;

    if let Err(reason) = extract_all(archive_path, &extract_dir) {
        if let Err(e) = std::fs::remove_dir_all(&extract_dir) {
            log::warn!("Could not clean up {}: {}", extract_dir.display(), e);
        }
        return Err(ShelfError::ArchiveCorrupt {
            path: archive_path.to_path_buf(),
            reason,
        });
    }

    let (registered, already_cataloged) = register_members(conn, &extract_dir)?;
    log::info!(
        "Expanded {} into {} ({} registered, {} already cataloged)",
        archive_path.display(),
        extract_dir.display(),
        registered,
        already_cataloged
    );

    Ok(ArchiveExpansion {
        extract_dir,
        registered,
        already_cataloged,
    })
}

fn extract_all(archive_path: &Path, dest: &Path) -> std::result::Result<(), String> {
    let file = File::open(archive_path).map_err(|e| e.to_string())?;
    let mut archive = ZipArchive::new(file).map_err(|e| e.to_string())?;
    // An entry whose name would escape `dest` fails the whole extraction,
    // which is reported as a corrupt archive
    archive.extract(dest).map_err(|e| e.to_string())
}

fn register_members(conn: &Connection, extract_dir: &Path) -> Result<(usize, usize)> {
    let mut registered = 0;
    let mut already_cataloged = 0;

    let members = WalkDir::new(extract_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_member(e.path()));

    for entry in members {
        let path = entry.path();
        let rel_dir = path
            .parent()
            .and_then(|dir| relative_dir(extract_dir, dir))
            .unwrap_or_default();

        let kind = classify_member(&rel_dir);
        let category = member_category(&rel_dir);
        let preview = find_sidecar_preview(path).map(|p| p.to_string_lossy().into_owned());
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let asset = NewAsset::new(path.to_string_lossy(), display_name, kind)
            .with_category(Some(category))
            .with_preview(preview);

        match schema::insert_asset(conn, &asset)? {
            InsertOutcome::Inserted(id) => {
                log::debug!("Registered archive member {} as {} (id {})", path.display(), kind, id);
                registered += 1;
            }
            InsertOutcome::AlreadyExists => already_cataloged += 1,
        }
    }

    Ok((registered, already_cataloged))
}

fn is_member(path: &Path) -> bool {
    match extension_of(path) {
        Some(ext) => ARCHIVE_MEMBER_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Kind for a member from its folder path inside the archive.
/// Keywords are matched as case-sensitive substrings, first hit wins.
pub fn classify_member(rel_dir: &str) -> AssetKind {
    ARCHIVE_KIND_KEYWORDS
        .iter()
        .find(|(keyword, _)| rel_dir.contains(*keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(ARCHIVE_DEFAULT_KIND)
}

/// Category for a member: its folder path, or `Root` at the top of the archive.
pub fn member_category(rel_dir: &str) -> String {
    if rel_dir.is_empty() {
        ROOT_CATEGORY.to_string()
    } else {
        rel_dir.to_string()
    }
}

/// Image with the member's stem next to it, if any (png, then jpg, then jpeg)
pub fn find_sidecar_preview(member: &Path) -> Option<PathBuf> {
    SIDECAR_PREVIEW_EXTENSIONS
        .iter()
        .map(|ext| member.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
