//! Error types for the versioner.

use thiserror::Error;

/// Errors surfaced by `archive` and `clean`.
///
/// Per-file problems during a cleaning pass (a version that vanished
/// mid-walk, a permission error on removal) are logged and skipped
/// rather than surfaced here; only failures that abort the whole
/// operation become errors.
#[derive(Error, Debug)]
pub enum VersionerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error scanning versions directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("item has no usable file name: {0}")]
    BadItem(String),
}

/// Result alias for versioner operations.
pub type Result<T> = std::result::Result<T, VersionerError>;
