// Preview generation
//
// Produces a reusable thumbnail for a stored asset:
// - video: one frame at 1s, bounded width
// - audio: waveform picture
// - image: the file itself is the preview
// - anything else: no preview
//
// Always best-effort. Tool failures are logged and turned into `None`.

pub mod thumb;

use std::path::{Path, PathBuf};

use crate::config::PreviewCacheKey;
use crate::constants::{
    THUMB_EXTENSION, THUMB_MAX_WIDTH, THUMB_SEEK_SECONDS,
    WAVEFORM_COLOR, WAVEFORM_HEIGHT, WAVEFORM_WIDTH,
};
use crate::db::schema::AssetKind;
use crate::error::Result;

pub use thumb::FfmpegTool;

/// The external media processor previews are rendered with.
pub trait MediaTool {
    /// Write one still frame taken `offset_secs` into `source`, at most `max_width` wide.
    fn extract_frame(&self, source: &Path, output: &Path, offset_secs: f64, max_width: u32) -> Result<()>;

    /// Write a `width`x`height` waveform picture of `source` drawn in `color`.
    fn render_waveform(&self, source: &Path, output: &Path, width: u32, height: u32, color: &str) -> Result<()>;
}

/// Thumbnail generator with a flat on-disk cache.
#[derive(Debug, Clone)]
pub struct PreviewGenerator<T: MediaTool = FfmpegTool> {
    cache_dir: PathBuf,
    cache_key: PreviewCacheKey,
    tool: T,
}

impl<T: MediaTool> PreviewGenerator<T> {
    pub fn new(cache_dir: impl Into<PathBuf>, cache_key: PreviewCacheKey, tool: T) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            cache_key,
            tool,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Deterministic thumbnail location for `file_path`.
    pub fn cache_path(&self, file_path: &Path) -> Option<PathBuf> {
        let name = match self.cache_key {
            PreviewCacheKey::FileName => {
                let file_name = file_path.file_name()?.to_string_lossy();
                format!("{}.{}", file_name, THUMB_EXTENSION)
            }
            PreviewCacheKey::StoragePathHash => {
                let hash = blake3::hash(file_path.to_string_lossy().as_bytes());
                format!("{}.{}", &hash.to_hex()[..16], THUMB_EXTENSION)
            }
        };
        Some(self.cache_dir.join(name))
    }

    /// Return a preview for `file_path`, rendering one only if none is cached yet.
    pub fn generate_preview(&self, file_path: &Path, kind: AssetKind) -> Option<PathBuf> {
        match kind {
            AssetKind::Image => Some(file_path.to_path_buf()),
            AssetKind::Video | AssetKind::Audio => self.render_cached(file_path, kind),
            _ => None,
        }
    }

    fn render_cached(&self, file_path: &Path, kind: AssetKind) -> Option<PathBuf> {
        let output = self.cache_path(file_path)?;
        if output.exists() {
            log::debug!("Preview cache hit for {}", file_path.display());
            return Some(output);
        }

        let result = if kind == AssetKind::Video {
            self.tool.extract_frame(file_path, &output, THUMB_SEEK_SECONDS, THUMB_MAX_WIDTH)
        } else {
            self.tool.render_waveform(file_path, &output, WAVEFORM_WIDTH, WAVEFORM_HEIGHT, WAVEFORM_COLOR)
        };

        match result {
            Ok(()) => Some(output),
            Err(e) => {
                log::warn!("No preview for {}: {}", file_path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::path::Path;

    use crate::error::{ShelfError, Result};
    use super::MediaTool;

    /// Stand-in for ffmpeg: writes a small file and counts invocations.
    #[derive(Default)]
    pub struct FakeTool {
        pub calls: Cell<usize>,
        pub fail: bool,
    }

    impl FakeTool {
        pub fn failing() -> Self {
            Self { calls: Cell::new(0), fail: true }
        }

        fn write(&self, output: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ShelfError::PreviewFailed("fake tool told to fail".to_string()));
            }
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output, b"\xFF\xD8fake jpeg")?;
            Ok(())
        }
    }

    impl MediaTool for FakeTool {
        fn extract_frame(&self, _source: &Path, output: &Path, _offset_secs: f64, _max_width: u32) -> Result<()> {
            self.write(output)
        }

        fn render_waveform(&self, _source: &Path, output: &Path, _w: u32, _h: u32, _color: &str) -> Result<()> {
            self.write(output)
        }
    }
}
