// Asset Shelf - Library Entry Point

pub mod constants;
pub mod error;
pub mod tools;
pub mod config;
pub mod db;
pub mod preview;
pub mod archive;
pub mod ingest;
pub mod library;

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::Connection;

use config::ShelfConfig;
use db::schema::{self, AssetKind};
use error::{ShelfError, Result};
use ingest::Ingestor;
use preview::{FfmpegTool, MediaTool, PreviewGenerator};

/// An opened shelf: settings, the catalog connection and the preview generator.
pub struct Shelf<T: MediaTool = FfmpegTool> {
    config: ShelfConfig,
    conn: Connection,
    previews: PreviewGenerator<T>,
}

impl Shelf<FfmpegTool> {
    /// Open using the settings stored under `root` (defaults if there are none).
    pub fn open_at(root: &Path) -> Result<Self> {
        Self::open(ShelfConfig::load(root)?)
    }

    /// Open with ffmpeg as the preview tool.
    pub fn open(config: ShelfConfig) -> Result<Self> {
        let tool = FfmpegTool::new(Duration::from_secs(config.tool_timeout_secs));
        Self::open_with_tool(config, tool)
    }
}

impl<T: MediaTool> Shelf<T> {
    pub fn open_with_tool(config: ShelfConfig, tool: T) -> Result<Self> {
        std::fs::create_dir_all(&config.storage_path)?;
        std::fs::create_dir_all(&config.preview_cache_path)?;

        let conn = db::open_db(&config.catalog_path)?;
        let previews = PreviewGenerator::new(&config.preview_cache_path, config.preview_cache_key, tool);
        log::info!(
            "Opened shelf: catalog {}, storage {}",
            config.catalog_path.display(),
            config.storage_path.display()
        );

        let shelf = Self { config, conn, previews };
        if shelf.config.sync_on_open {
            let removed = shelf.ingestor().sync_with_storage()?;
            if removed > 0 {
                log::info!("Removed {} catalog entries for missing files", removed);
            }
        }
        Ok(shelf)
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn storage_root(&self) -> &Path {
        &self.config.storage_path
    }

    pub fn previews(&self) -> &PreviewGenerator<T> {
        &self.previews
    }

    pub fn ingestor(&self) -> Ingestor<'_, T> {
        Ingestor::new(&self.conn, &self.config.storage_path, &self.previews)
    }

    /// Render the preview for an asset again and store the new path.
    pub fn regenerate_preview(&self, id: i64) -> Result<Option<PathBuf>> {
        let asset = schema::get_asset(&self.conn, id)?.ok_or(ShelfError::RecordNotFound(id))?;
        let file = Path::new(&asset.storage_path);

        // Drop the cached thumbnail so the tool actually runs
        if matches!(asset.kind, AssetKind::Video | AssetKind::Audio) {
            if let Some(cached) = self.previews.cache_path(file) {
                if cached.exists() {
                    std::fs::remove_file(&cached)?;
                }
            }
        }

        let preview = self.previews.generate_preview(file, asset.kind);
        if let Some(path) = &preview {
            schema::update_asset_preview(&self.conn, id, &path.to_string_lossy())?;
        }
        Ok(preview)
    }

    /// Use an existing image as an asset's preview. The image is referenced in place, not copied.
    pub fn set_preview(&self, id: i64, image: &Path) -> Result<PathBuf> {
        if !image.is_file() {
            return Err(ShelfError::SourceNotFound(image.to_path_buf()));
        }
        if ingest::discover::detect_kind(image) != AssetKind::Image {
            return Err(ShelfError::InvalidPath(format!("Not an image: {}", image.display())));
        }

        let image = image.canonicalize()?;
        schema::update_asset_preview(&self.conn, id, &image.to_string_lossy())?;
        log::info!("Preview for asset {} set to {}", id, image.display());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ImportOutcome;
    use crate::preview::testing::FakeTool;
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> Shelf<FakeTool> {
        Shelf::open_with_tool(ShelfConfig::for_root(tmp.path()), FakeTool::default()).unwrap()
    }

    #[test]
    fn test_open_lays_out_app_root() {
        let tmp = TempDir::new().unwrap();
        let shelf = open(&tmp);

        assert!(shelf.storage_root().is_dir());
        assert!(shelf.previews().cache_dir().is_dir());
        assert!(tmp.path().join(constants::DB_FILENAME).exists());
        assert_eq!(schema::count_assets(shelf.conn()).unwrap(), 0);
    }

    #[test]
    fn test_reopen_syncs_away_missing_files() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("clip.mp4");
        std::fs::write(&source, b"frames").unwrap();

        let stored = {
            let shelf = open(&tmp);
            match shelf.ingestor().import_file(&source, None).unwrap() {
                ImportOutcome::Asset { storage_path, .. } => storage_path,
                other => panic!("expected a new asset, got {:?}", other),
            }
        };
        std::fs::remove_file(&stored).unwrap();

        let shelf = open(&tmp);
        assert_eq!(schema::count_assets(shelf.conn()).unwrap(), 0);
    }

    #[test]
    fn test_regenerate_preview_reruns_tool() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("rain.wav");
        std::fs::write(&source, b"riff").unwrap();
        let shelf = open(&tmp);

        let id = match shelf.ingestor().import_file(&source, Some("Ambience")).unwrap() {
            ImportOutcome::Asset { id, .. } => id,
            other => panic!("expected a new asset, got {:?}", other),
        };
        assert_eq!(shelf.previews().tool().calls.get(), 1);

        let preview = shelf.regenerate_preview(id).unwrap().unwrap();
        assert_eq!(shelf.previews().tool().calls.get(), 2);

        let asset = schema::get_asset(shelf.conn(), id).unwrap().unwrap();
        assert_eq!(asset.preview_path.as_deref(), Some(&*preview.to_string_lossy()));

        assert!(matches!(shelf.regenerate_preview(9999), Err(ShelfError::RecordNotFound(9999))));
    }

    #[test]
    fn test_set_preview_uses_chosen_image() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("Glow.cube");
        std::fs::write(&source, b"LUT_3D_SIZE 2").unwrap();
        let cover = tmp.path().join("glow-cover.png");
        std::fs::write(&cover, b"png").unwrap();
        let shelf = open(&tmp);

        let id = match shelf.ingestor().import_file(&source, None).unwrap() {
            ImportOutcome::Asset { id, .. } => id,
            other => panic!("expected a new asset, got {:?}", other),
        };
        assert!(schema::get_asset(shelf.conn(), id).unwrap().unwrap().preview_path.is_none());

        let stored = shelf.set_preview(id, &cover).unwrap();
        assert_eq!(stored, cover.canonicalize().unwrap());
        let asset = schema::get_asset(shelf.conn(), id).unwrap().unwrap();
        assert_eq!(asset.preview_path.as_deref(), Some(&*stored.to_string_lossy()));
        assert_eq!(shelf.previews().tool().calls.get(), 0);

        assert!(matches!(
            shelf.set_preview(id, &tmp.path().join("missing.png")),
            Err(ShelfError::SourceNotFound(_))
        ));
        assert!(matches!(shelf.set_preview(id, &source), Err(ShelfError::InvalidPath(_))));
        assert!(matches!(shelf.set_preview(9999, &cover), Err(ShelfError::RecordNotFound(9999))));
    }
}
