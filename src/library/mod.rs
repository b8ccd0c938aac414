// Library folder operations
//
// Categories are plain `/`-separated paths on asset records, mirrored by real
// folders under storage. These helpers keep the two views together.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use rusqlite::Connection;
use serde::Serialize;
use walkdir::WalkDir;

use crate::constants::PATH_DB_SEPARATOR;
use crate::db::schema::{self, Asset};
use crate::error::{ShelfError, Result};
use crate::ingest::discover::{normalize_category, relative_dir};

/// One folder in the category tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub name: String,
    pub path: String,
    /// Assets filed directly under this path
    pub count: i64,
    /// Assets in this folder and everything below it
    pub total: i64,
    pub children: Vec<CategoryNode>,
}

/// Outcome of removing a category folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeletion {
    pub records_removed: usize,
    /// Backing files that could not be deleted
    pub files_failed: Vec<PathBuf>,
    pub directory_removed: bool,
}

/// Catalog categories merged with the physical folders under storage, as a sorted tree.
pub fn category_tree(conn: &Connection, storage_root: &Path) -> Result<Vec<CategoryNode>> {
    let counts = schema::category_counts(conn)?;

    let mut paths: BTreeSet<String> = schema::list_categories(conn)?.into_iter().collect();
    if storage_root.is_dir() {
        let dirs = WalkDir::new(storage_root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| relative_dir(storage_root, e.path()));
        paths.extend(dirs);
    }

    // Every ancestor gets a node even if nothing is filed there
    let mut all = BTreeSet::new();
    for path in &paths {
        let mut prefix = String::new();
        for segment in path.split(PATH_DB_SEPARATOR).filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push(PATH_DB_SEPARATOR);
            }
            prefix.push_str(segment);
            all.insert(prefix.clone());
        }
    }

    Ok(build_level(None, &all, &counts))
}

fn parent_of(path: &str) -> Option<&str> {
    path.rfind(PATH_DB_SEPARATOR).map(|i| &path[..i])
}

fn build_level(parent: Option<&str>, all: &BTreeSet<String>, counts: &BTreeMap<String, i64>) -> Vec<CategoryNode> {
    all.iter()
        .filter(|p| parent_of(p) == parent)
        .map(|path| {
            let children = build_level(Some(path.as_str()), all, counts);
            let count = counts.get(path).copied().unwrap_or(0);
            let total = count + children.iter().map(|c| c.total).sum::<i64>();
            let name = path
                .rsplit(PATH_DB_SEPARATOR)
                .next()
                .unwrap_or(path.as_str())
                .to_string();
            CategoryNode {
                name,
                path: path.clone(),
                count,
                total,
                children,
            }
        })
        .collect()
}

fn in_subtree(category: Option<&str>, path: &str) -> bool {
    match category {
        Some(c) => c == path || (c.starts_with(path) && c[path.len()..].starts_with(PATH_DB_SEPARATOR)),
        None => false,
    }
}

/// Assets filed under `path` or any folder below it, newest first.
pub fn assets_in_category(conn: &Connection, path: &str) -> Result<Vec<Asset>> {
    let path = normalize_category(Some(path))?
        .ok_or_else(|| ShelfError::InvalidPath("empty category".to_string()))?;

    let assets = schema::list_assets(conn)?
        .into_iter()
        .filter(|a| in_subtree(a.category_path.as_deref(), &path))
        .collect();
    Ok(assets)
}

/// Create the folder for a category. Creating an existing one is fine.
pub fn create_category(storage_root: &Path, path: &str) -> Result<PathBuf> {
    let path = normalize_category(Some(path))?
        .ok_or_else(|| ShelfError::InvalidPath("empty category".to_string()))?;

    let dir = storage_root.join(&path);
    std::fs::create_dir_all(&dir)?;
    log::info!("Created category {}", path);
    Ok(dir)
}

/// Remove a category: every asset in its subtree or stored inside its folder
/// (record, then file), then the folder.
/// File and folder removal are best-effort and reported back rather than failing.
pub fn delete_category(conn: &Connection, storage_root: &Path, path: &str) -> Result<FolderDeletion> {
    let path = normalize_category(Some(path))?
        .ok_or_else(|| ShelfError::InvalidPath("refusing to delete the storage root".to_string()))?;

    let dir = storage_root.join(&path);
    let mut result = FolderDeletion::default();

    // Archive members live in their extraction folder but are filed under
    // their path inside the archive, so the folder is matched on disk too
    let mut doomed: BTreeMap<i64, Asset> = assets_in_category(conn, &path)?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    for asset in schema::list_assets(conn)? {
        if Path::new(&asset.storage_path).starts_with(&dir) {
            doomed.entry(asset.id).or_insert(asset);
        }
    }

    for asset in doomed.values() {
        schema::delete_asset(conn, asset.id)?;
        result.records_removed += 1;
    }
    for asset in doomed.values() {
        if !remove_backing_file(asset) {
            result.files_failed.push(PathBuf::from(&asset.storage_path));
        }
    }

    if dir.exists() {
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => result.directory_removed = true,
            Err(e) => log::warn!("Could not remove folder {}: {}", dir.display(), e),
        }
    }

    log::info!(
        "Deleted category {} ({} records, {} files left behind)",
        path,
        result.records_removed,
        result.files_failed.len()
    );
    Ok(result)
}

/// Delete one asset: the record always, the backing file if possible.
/// Returns whether the file is gone afterwards.
pub fn delete_asset_with_file(conn: &Connection, id: i64) -> Result<bool> {
    let asset = schema::get_asset(conn, id)?.ok_or(ShelfError::RecordNotFound(id))?;
    schema::delete_asset(conn, id)?;
    Ok(remove_backing_file(&asset))
}

fn remove_backing_file(asset: &Asset) -> bool {
    let file = Path::new(&asset.storage_path);
    match file.try_exists() {
        Ok(false) => return true,
        Ok(true) => {}
        Err(e) => {
            log::warn!("Could not check {}: {}", file.display(), e);
            return false;
        }
    }
    match std::fs::remove_file(file) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not delete {}: {}", file.display(), e);
            false
        }
    }
}
