// Catalog schema types and query helpers

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::{Connection, params, OptionalExtension};
use serde::{Deserialize, Serialize};
use crate::error::{ShelfError, Result};

// ----- Asset kind -----

/// What an asset is. Derived once at import time and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Image,
    Audio,
    Archive,
    Macro,
    Transition,
    Title,
    Generator,
    Effect,
    Lut,
    Other,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
            AssetKind::Archive => "archive",
            AssetKind::Macro => "macro",
            AssetKind::Transition => "transition",
            AssetKind::Title => "title",
            AssetKind::Generator => "generator",
            AssetKind::Effect => "effect",
            AssetKind::Lut => "lut",
            AssetKind::Other => "other",
        }
    }

    /// Parse a stored kind. Anything unrecognised reads back as `Other`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "video" => AssetKind::Video,
            "image" => AssetKind::Image,
            "audio" => AssetKind::Audio,
            "archive" => AssetKind::Archive,
            "macro" => AssetKind::Macro,
            "transition" => AssetKind::Transition,
            "title" => AssetKind::Title,
            "generator" => AssetKind::Generator,
            "effect" => AssetKind::Effect,
            "lut" => AssetKind::Lut,
            _ => AssetKind::Other,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ----- Asset -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub storage_path: String,
    pub display_name: String,
    pub kind: AssetKind,
    pub category_path: Option<String>,
    pub preview_path: Option<String>,
    pub added_at: String,
    pub is_favorite: bool,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub storage_path: String,
    pub display_name: String,
    pub kind: AssetKind,
    pub category_path: Option<String>,
    pub preview_path: Option<String>,
}

impl NewAsset {
    pub fn new(storage_path: impl Into<String>, display_name: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            storage_path: storage_path.into(),
            display_name: display_name.into(),
            kind,
            category_path: None,
            preview_path: None,
        }
    }

    pub fn with_category(mut self, category_path: Option<String>) -> Self {
        self.category_path = category_path;
        self
    }

    pub fn with_preview(mut self, preview_path: Option<String>) -> Self {
        self.preview_path = preview_path;
        self
    }
}

/// Result of registering an asset. A storage path is registered at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    AlreadyExists,
}

impl InsertOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            InsertOutcome::Inserted(id) => Some(*id),
            InsertOutcome::AlreadyExists => None,
        }
    }
}

const ASSET_COLUMNS: &str =
    "id, storage_path, display_name, kind, category_path, preview_path, added_at, is_favorite";

/// Current time as stored in `added_at` (UTC, millisecond precision, sorts lexically)
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn map_asset(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
    let kind: Option<String> = row.get(3)?;
    Ok(Asset {
        id: row.get(0)?,
        storage_path: row.get(1)?,
        display_name: row.get(2)?,
        kind: kind.as_deref().map(AssetKind::from_db).unwrap_or(AssetKind::Other),
        category_path: row.get(4)?,
        preview_path: row.get(5)?,
        added_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        is_favorite: row.get(7)?,
    })
}

fn query_assets<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Asset>> {
    let mut stmt = conn.prepare(sql)?;
    let assets = stmt.query_map(params, map_asset)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(assets)
}

/// Register an asset. A duplicate `storage_path` is a no-op reported as `AlreadyExists`.
pub fn insert_asset(conn: &Connection, asset: &NewAsset) -> Result<InsertOutcome> {
    let changed = conn.execute(
        "INSERT INTO assets (storage_path, display_name, kind, category_path, preview_path, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(storage_path) DO NOTHING",
        params![
            asset.storage_path,
            asset.display_name,
            asset.kind.as_str(),
            asset.category_path,
            asset.preview_path,
            now_timestamp(),
        ],
    )?;

    if changed == 0 {
        return Ok(InsertOutcome::AlreadyExists);
    }
    Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
}

pub fn get_asset(conn: &Connection, id: i64) -> Result<Option<Asset>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM assets WHERE id = ?1", ASSET_COLUMNS),
        params![id],
        map_asset,
    ).optional()?;
    Ok(result)
}

/// All assets, newest first
pub fn list_assets(conn: &Connection) -> Result<Vec<Asset>> {
    query_assets(
        conn,
        &format!("SELECT {} FROM assets ORDER BY added_at DESC, id DESC", ASSET_COLUMNS),
        params![],
    )
}

/// Case-insensitive substring match on the display name, newest first
pub fn search_assets(conn: &Connection, query: &str) -> Result<Vec<Asset>> {
    let pattern = format!("%{}%", escape_like(query));
    query_assets(
        conn,
        &format!(
            "SELECT {} FROM assets
             WHERE LOWER(display_name) LIKE LOWER(?1) ESCAPE '\\'
             ORDER BY added_at DESC, id DESC",
            ASSET_COLUMNS
        ),
        params![pattern],
    )
}

/// Escape LIKE wildcards so user input is matched literally
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn list_favorite_assets(conn: &Connection) -> Result<Vec<Asset>> {
    query_assets(
        conn,
        &format!(
            "SELECT {} FROM assets WHERE is_favorite = 1 ORDER BY added_at DESC, id DESC",
            ASSET_COLUMNS
        ),
        params![],
    )
}

/// Assets whose category is exactly `category_path` (no subfolders)
pub fn list_assets_by_category(conn: &Connection, category_path: &str) -> Result<Vec<Asset>> {
    query_assets(
        conn,
        &format!(
            "SELECT {} FROM assets WHERE category_path = ?1 ORDER BY display_name, id",
            ASSET_COLUMNS
        ),
        params![category_path],
    )
}

pub fn count_assets(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
    Ok(count)
}

pub fn update_asset_preview(conn: &Connection, id: i64, preview_path: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE assets SET preview_path = ?1 WHERE id = ?2",
        params![preview_path, id],
    )?;
    if changed == 0 {
        return Err(ShelfError::RecordNotFound(id));
    }
    Ok(())
}

/// Remove the catalog record only. File removal is the caller's business.
pub fn delete_asset(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM assets WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(ShelfError::RecordNotFound(id));
    }
    Ok(())
}

/// Flip the favorite flag and return the new value.
pub fn toggle_favorite(conn: &Connection, id: i64) -> Result<bool> {
    let current: Option<bool> = conn.query_row(
        "SELECT is_favorite FROM assets WHERE id = ?1",
        params![id],
        |row| row.get(0),
    ).optional()?;

    let current = current.ok_or(ShelfError::RecordNotFound(id))?;
    let next = !current;
    conn.execute(
        "UPDATE assets SET is_favorite = ?1 WHERE id = ?2",
        params![next, id],
    )?;
    Ok(next)
}

// ----- Categories -----

/// Distinct non-null category paths, sorted
pub fn list_categories(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT category_path FROM assets
         WHERE category_path IS NOT NULL
         ORDER BY category_path"
    )?;
    let categories = stmt.query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(categories)
}

/// Asset count per exact category path. Subtree totals are summed by the caller.
pub fn category_counts(conn: &Connection) -> Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(
        "SELECT category_path, COUNT(*) FROM assets
         WHERE category_path IS NOT NULL
         GROUP BY category_path"
    )?;

    let mut counts = BTreeMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    for row in rows {
        let (path, count) = row?;
        counts.insert(path, count);
    }

    Ok(counts)
}
