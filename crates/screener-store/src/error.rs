//! Error types for template library storage

use thiserror::Error;

/// Storage failures
///
/// Validation problems are not errors here; they are reported as
/// [`Refusal`](crate::Refusal)s. A `StoreError` means the backend itself
/// could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend read or write failed
    #[error("Storage error for key '{key}': {detail}")]
    Backend { key: String, detail: String },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Lock poisoned by a panicking writer
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
