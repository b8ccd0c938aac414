// Catalog database module

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

use crate::constants::DB_FILENAME;

/// Open or create the catalog at the given path and bring its schema up to date.
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create catalog directory {}", parent.display()))?;
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Cannot open catalog {}", db_path.display()))?;

    // WAL keeps readers unblocked while an import is writing
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Open an in-memory catalog with the full schema (tests and dry runs).
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// Get the catalog path inside an app-data root
pub fn get_db_path(app_root: &Path) -> PathBuf {
    app_root.join(DB_FILENAME)
}
