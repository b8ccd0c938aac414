// Catalog migrations
// Migrations are forward-only and additive. Never edit or delete a migration after it ships.

use rusqlite::{Connection, params};
use anyhow::Result;

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: core assets table. IF NOT EXISTS so catalogs written before
    // versioning was introduced are adopted instead of rejected.
    r#"
    CREATE TABLE IF NOT EXISTS assets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        storage_path TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'other'
    );
    "#,
    // Migration 2: indexes for the sidebar and grid queries
    r#"
    CREATE INDEX IF NOT EXISTS idx_assets_category ON assets(category_path);
    CREATE INDEX IF NOT EXISTS idx_assets_favorite ON assets(is_favorite);
    CREATE INDEX IF NOT EXISTS idx_assets_added_at ON assets(added_at);
    "#,
];

/// Optional columns an older catalog file may be missing: (name, column definition).
const OPTIONAL_COLUMNS: &[(&str, &str)] = &[
    ("category_path", "category_path TEXT"),
    ("preview_path", "preview_path TEXT"),
    ("added_at", "added_at TEXT"),
    ("is_favorite", "is_favorite INTEGER NOT NULL DEFAULT 0"),
];

/// Columns every catalog must have once migrations have run
const REQUIRED_COLUMNS: &[&str] = &["storage_path", "display_name", "kind"];

/// Renames that turn the unversioned layout (`file_path`, `file_name`, ...) into the current one
const LEGACY_RENAMES: &[(&str, &str)] = &[
    ("file_path", "storage_path"),
    ("file_name", "display_name"),
    ("file_type", "kind"),
    ("category_name", "category_path"),
    ("date_added", "added_at"),
];

/// Schema version this build writes
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

/// Column names currently present on the assets table
fn asset_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(assets)")?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Add any optional column the assets table lacks and backfill `added_at`.
/// Only ever adds; existing data is left untouched.
fn add_missing_columns(conn: &Connection) -> Result<usize> {
    let existing = asset_columns(conn)?;
    let mut added = 0;

    for (name, definition) in OPTIONAL_COLUMNS {
        if existing.iter().any(|c| c == name) {
            continue;
        }
        conn.execute_batch(&format!("ALTER TABLE assets ADD COLUMN {}", definition))?;
        log::info!("Added missing catalog column {}", name);
        added += 1;
    }

    let now = super::schema::now_timestamp();
    conn.execute(
        "UPDATE assets SET added_at = ?1 WHERE added_at IS NULL",
        params![now],
    )?;

    Ok(added)
}

/// Rename the columns of an unversioned catalog in place.
/// Returns false when there is no assets table or it already has the current layout.
fn adopt_legacy_layout(conn: &Connection) -> Result<bool> {
    let columns = asset_columns(conn)?;
    let has = |name: &str| columns.iter().any(|c| c == name);
    if columns.is_empty() || has("storage_path") || !has("file_path") {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;
    for &(old, new) in LEGACY_RENAMES {
        if has(old) && !has(new) {
            tx.execute_batch(&format!("ALTER TABLE assets RENAME COLUMN {} TO {}", old, new))?;
        }
    }
    // CURRENT_TIMESTAMP wrote `YYYY-MM-DD HH:MM:SS` in UTC
    tx.execute(
        "UPDATE assets SET added_at = replace(added_at, ' ', 'T') || '.000Z'
         WHERE added_at GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9] [0-9][0-9]:[0-9][0-9]:[0-9][0-9]'",
        [],
    )?;
    tx.execute("UPDATE assets SET kind = 'other' WHERE kind IS NULL", [])?;
    tx.commit()?;

    log::info!("Adopted unversioned catalog layout");
    Ok(true)
}

/// Fail before anything is stamped if the assets table cannot be read by this build
fn ensure_required_columns(conn: &Connection) -> Result<()> {
    let columns = asset_columns(conn)?;
    if columns.is_empty() {
        return Ok(());
    }
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !columns.iter().any(|c| c == name))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "Catalog table `assets` has an unrecognised layout (missing {}). Refusing to open it.",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Run all pending migrations (crash-safe: version is bumped only after a step succeeds)
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = latest_version();

    // Refuse to open a catalog created by a newer build
    if current_version > target_version {
        anyhow::bail!(
            "Catalog schema version {} is newer than this build supports (max {}). Please upgrade.",
            current_version,
            target_version
        );
    }

    adopt_legacy_layout(conn)?;
    ensure_required_columns(conn)?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(migration)?;

        // Later migrations index the optional columns, so they must exist first
        if migration_version == 1 {
            add_missing_columns(conn)?;
        }

        conn.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;
        log::info!("Applied catalog migration {}", migration_version);
    }

    // Also covers files stamped current whose columns were dropped by hand
    add_missing_columns(conn)?;

    Ok(())
}
