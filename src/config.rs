// Asset Shelf settings
//
// Stored as pretty JSON in <app root>/config.json. A missing file means defaults;
// a corrupt file is an error so user settings are never silently discarded.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILENAME, DEFAULT_TOOL_TIMEOUT_SECS, ENV_HOME,
    PREVIEW_CACHE_FOLDER, STORAGE_FOLDER,
};
use crate::error::{ShelfError, Result};

/// How thumbnail file names are derived from the asset they preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewCacheKey {
    /// `<file name>.jpg`. Two files with the same name share one thumbnail.
    #[default]
    FileName,
    /// `<blake3 of the full path>.jpg`. No cross-folder collisions.
    StoragePathHash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub storage_path: PathBuf,
    pub preview_cache_path: PathBuf,
    pub catalog_path: PathBuf,
    pub preview_cache_key: PreviewCacheKey,
    pub tool_timeout_secs: u64,
    pub sync_on_open: bool,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self::for_root(&default_app_root())
    }
}

impl ShelfConfig {
    /// Defaults laid out under a given app-data root
    pub fn for_root(root: &Path) -> Self {
        Self {
            storage_path: root.join(STORAGE_FOLDER),
            preview_cache_path: root.join(PREVIEW_CACHE_FOLDER),
            catalog_path: crate::db::get_db_path(root),
            preview_cache_key: PreviewCacheKey::default(),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            sync_on_open: true,
        }
    }

    /// Load `config.json` from `root`, or defaults for that root if absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = config_file(root);
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::for_root(root));
        }

        let text = std::fs::read_to_string(&path)?;
        // Fields missing from the file fall back to this root's defaults, not the global ones
        let mut value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ShelfError::Config(format!("{}: {}", path.display(), e)))?;
        let defaults = serde_json::to_value(Self::for_root(root))?;
        if let (Some(obj), Some(def)) = (value.as_object_mut(), defaults.as_object()) {
            for (k, v) in def {
                obj.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        serde_json::from_value(value)
            .map_err(|e| ShelfError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write `config.json` under `root` (temp file + rename).
    pub fn save(&self, root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;
        let path = config_file(root);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Where the settings for `root` are stored
pub fn config_file(root: &Path) -> PathBuf {
    root.join(CONFIG_FILENAME)
}

/// App-data root: $SHELF_HOME, else the platform data dir, else ./asset-shelf
pub fn default_app_root() -> PathBuf {
    if let Ok(home) = std::env::var(ENV_HOME) {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }

    directories::ProjectDirs::from("", "", APP_DIR_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}
