// Catalog/storage reconciliation

use std::path::Path;
use rusqlite::Connection;

use crate::db::schema;
use crate::error::Result;

/// Drop every catalog record whose stored file no longer exists.
/// Records whose file cannot be checked are kept. Never touches the filesystem.
/// Returns how many records were removed.
pub fn sync_with_storage(conn: &Connection) -> Result<usize> {
    let assets = schema::list_assets(conn)?;
    let mut removed = 0;

    for asset in &assets {
        match Path::new(&asset.storage_path).try_exists() {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                log::warn!("Keeping catalog entry {}: cannot check {}: {}", asset.id, asset.storage_path, e);
                continue;
            }
        }

        match schema::delete_asset(conn, asset.id) {
            Ok(()) => {
                log::info!("Dropped catalog entry {} ({}): file is gone", asset.id, asset.storage_path);
                removed += 1;
            }
            Err(e) => log::error!("Could not drop catalog entry {}: {}", asset.id, e),
        }
    }

    if removed > 0 {
        log::info!("Storage sync removed {} stale record(s)", removed);
    }
    Ok(removed)
}
