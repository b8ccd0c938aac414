// Ingest pipeline module
//
// import: copy into storage under a unique name, preview, register
// scan:   walk a folder tree, import every supported file, folders become categories
// sync:   drop catalog records whose files have disappeared

pub mod copy;
pub mod discover;
pub mod progress;
pub mod sync;

use std::path::{Path, PathBuf};
use rusqlite::Connection;
use serde::Serialize;

use crate::archive::{self, ArchiveExpansion};
use crate::db::schema::{self, InsertOutcome, NewAsset};
use crate::error::{ShelfError, Result};
use crate::preview::{FfmpegTool, MediaTool, PreviewGenerator};

pub use progress::{CancelFlag, ScanControl, ScanProgress};

/// What a single import produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum ImportOutcome {
    /// A new catalog entry for the copied file
    Asset { id: i64, storage_path: PathBuf },
    /// The storage path was already registered; the fresh copy was removed
    AlreadyCataloged { storage_path: PathBuf },
    /// A package archive was expanded and its members registered
    Archive(ArchiveExpansion),
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Category prefix for everything found by the scan
    pub base_category: Option<String>,
    pub cancel: Option<CancelFlag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub total: usize,
    pub processed: usize,
    pub imported: usize,
    pub already_cataloged: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Bundles the catalog, the storage root and the preview generator for one import session.
pub struct Ingestor<'a, T: MediaTool = FfmpegTool> {
    conn: &'a Connection,
    storage_root: &'a Path,
    previews: &'a PreviewGenerator<T>,
}

impl<'a, T: MediaTool> Ingestor<'a, T> {
    pub fn new(conn: &'a Connection, storage_root: &'a Path, previews: &'a PreviewGenerator<T>) -> Self {
        Self { conn, storage_root, previews }
    }

    /// Copy one file into storage and catalog it.
    /// `.drfx` archives are expanded instead, and their members carry their own categories.
    pub fn import_file(&self, source: &Path, category_path: Option<&str>) -> Result<ImportOutcome> {
        if !source.exists() {
            return Err(ShelfError::SourceNotFound(source.to_path_buf()));
        }
        if !source.is_file() {
            return Err(ShelfError::InvalidPath(format!("Not a file: {}", source.display())));
        }

        if discover::is_archive(source) {
            if category_path.is_some() {
                log::debug!("Ignoring category for archive {}", source.display());
            }
            let expansion = archive::expand_archive(self.conn, source, self.storage_root)?;
            return Ok(ImportOutcome::Archive(expansion));
        }

        let category = discover::normalize_category(category_path)?;
        let dest_dir = match &category {
            Some(c) => self.storage_root.join(c),
            None => self.storage_root.to_path_buf(),
        };

        let dest = copy::copy_into_storage(source, &dest_dir)?;
        let kind = discover::detect_kind(source);
        let preview = self.previews.generate_preview(&dest, kind);

        let display_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let asset = NewAsset::new(dest.to_string_lossy(), display_name, kind)
            .with_category(category)
            .with_preview(preview.map(|p| p.to_string_lossy().into_owned()));

        match schema::insert_asset(self.conn, &asset) {
            Ok(InsertOutcome::Inserted(id)) => {
                log::info!("Imported {} as {} (id {})", source.display(), kind, id);
                Ok(ImportOutcome::Asset { id, storage_path: dest })
            }
            Ok(InsertOutcome::AlreadyExists) => {
                log::warn!("{} is already cataloged, removing the new copy", dest.display());
                let _ = std::fs::remove_file(&dest);
                Ok(ImportOutcome::AlreadyCataloged { storage_path: dest })
            }
            Err(e) => {
                // No uncataloged copies left in storage
                let _ = std::fs::remove_file(&dest);
                Err(e)
            }
        }
    }

    /// Import every supported file under `root`.
    ///
    /// Two passes: count first so progress has a total, then import in walk order.
    /// A failing file is logged and counted, the scan keeps going. Cancellation is
    /// checked before each file; files already imported stay imported.
    pub fn scan_directory<F>(&self, root: &Path, options: &ScanOptions, mut on_progress: F) -> Result<ScanSummary>
    where
        F: FnMut(&ScanProgress) -> ScanControl,
    {
        if !root.is_dir() {
            return Err(ShelfError::SourceNotFound(root.to_path_buf()));
        }
        let base = discover::normalize_category(options.base_category.as_deref())?;

        let mut summary = ScanSummary {
            total: discover::count_importable(root),
            ..Default::default()
        };
        log::info!("Scanning {} ({} importable files)", root.display(), summary.total);

        for path in discover::discover_importable(root) {
            let cancelled = options.cancel.as_ref().map(|c| c.is_cancelled()).unwrap_or(false);
            if cancelled {
                log::info!("Scan of {} cancelled after {} files", root.display(), summary.processed);
                summary.cancelled = true;
                break;
            }

            let category = path
                .parent()
                .and_then(|dir| discover::derive_category(root, dir, base.as_deref()));

            let mut progress = ScanProgress::new(summary.processed as u64 + 1, summary.total as u64)
                .with_file(&path);

            match self.import_file(&path, category.as_deref()) {
                Ok(ImportOutcome::AlreadyCataloged { .. }) => summary.already_cataloged += 1,
                Ok(_) => summary.imported += 1,
                Err(e) => {
                    log::error!("Failed to import {}: {}", path.display(), e);
                    summary.failed += 1;
                    progress = progress.error(e.to_string());
                }
            }
            summary.processed += 1;

            if on_progress(&progress) == ScanControl::Abort {
                log::info!("Scan of {} stopped by caller after {} files", root.display(), summary.processed);
                summary.cancelled = true;
                break;
            }
        }

        log::info!(
            "Scan of {} done: {} imported, {} already cataloged, {} failed",
            root.display(),
            summary.imported,
            summary.already_cataloged,
            summary.failed
        );
        Ok(summary)
    }

    pub fn sync_with_storage(&self) -> Result<usize> {
        sync::sync_with_storage(self.conn)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
