// Asset Shelf Constants
// Folder layout, extension tables and preview geometry shared across modules.

use crate::db::schema::AssetKind;

// Paths
pub const PATH_DB_SEPARATOR: char = '/';
pub const APP_DIR_NAME: &str = "asset-shelf";
pub const CONFIG_FILENAME: &str = "config.json";
pub const DB_FILENAME: &str = "catalog.db";
pub const STORAGE_FOLDER: &str = "storage";
pub const PREVIEW_CACHE_FOLDER: &str = "cache/previews";

// Environment overrides
pub const ENV_HOME: &str = "SHELF_HOME";
pub const ENV_FFMPEG_PATH: &str = "SHELF_FFMPEG_PATH";

// Collision-avoiding suffix (hex chars taken from a v4 UUID)
pub const NAME_SUFFIX_LEN: usize = 8;

// Category given to archive members sitting directly at the extraction root
pub const ROOT_CATEGORY: &str = "Root";

// Preview settings
pub const THUMB_EXTENSION: &str = "jpg";
pub const THUMB_SEEK_SECONDS: f64 = 1.0;
pub const THUMB_MAX_WIDTH: u32 = 320;
pub const WAVEFORM_WIDTH: u32 = 320;
pub const WAVEFORM_HEIGHT: u32 = 240;
pub const WAVEFORM_COLOR: &str = "0x007acc";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const TOOL_POLL_INTERVAL_MS: u64 = 50;
pub const STDERR_TAIL_LINES: usize = 5;

// Archive package extension
pub const ARCHIVE_EXTENSION: &str = "drfx";

// Files registered out of an expanded archive
pub const ARCHIVE_MEMBER_EXTENSIONS: [&str; 1] = ["setting"];

// Sidecar preview images next to an archive member, tried in order
pub const SIDECAR_PREVIEW_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// Archive folder keyword -> kind. Evaluated top to bottom, first hit wins, case-sensitive.
pub const ARCHIVE_KIND_KEYWORDS: [(&str, AssetKind); 4] = [
    ("Transitions", AssetKind::Transition),
    ("Titles", AssetKind::Title),
    ("Generators", AssetKind::Generator),
    ("Effects", AssetKind::Effect),
];
pub const ARCHIVE_DEFAULT_KIND: AssetKind = AssetKind::Macro;

// Import extension table (lowercase, no dot)
pub const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "mov"];
pub const IMAGE_EXTENSIONS: [&str; 2] = ["png", "jpg"];
pub const AUDIO_EXTENSIONS: [&str; 2] = ["wav", "mp3"];
pub const MACRO_EXTENSIONS: [&str; 1] = ["setting"];
pub const LUT_EXTENSIONS: [&str; 1] = ["cube"];

/// Every extension `scan_directory` will pick up.
pub const IMPORTABLE_EXTENSIONS: [&str; 9] = [
    "drfx", "setting", "cube", "mp4", "mov", "png", "jpg", "wav", "mp3",
];
