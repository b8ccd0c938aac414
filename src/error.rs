// Asset Shelf Error Types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Copy failed for {}: {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preview failed: {0}")]
    PreviewFailed(String),

    #[error("Archive {} could not be read: {reason}", path.display())]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("Asset not found: {0}")]
    RecordNotFound(i64),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ShelfError {
    fn from(err: anyhow::Error) -> Self {
        ShelfError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
