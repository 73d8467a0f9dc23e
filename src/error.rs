//! Error types for the record store.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    #[error("Attachment not found: {}", .0.display())]
    AttachmentNotFound(PathBuf),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Payload too large: {name} is {size} bytes (limit {limit})")]
    PayloadTooLarge { name: String, size: u64, limit: u64 },

    #[error("Failed to save collection: {0}")]
    SaveFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Image processing error: {0}")]
    Image(String),
}

/// Coarse classification of a [`StoreError`], for callers that map errors
/// to user-facing responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown collection, record, or attachment.
    NotFound,
    /// Empty or disallowed input.
    Validation,
    /// A single upload exceeded the size ceiling.
    PayloadTooLarge,
    /// JSON read/write or filesystem failure.
    Storage,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::CollectionNotFound(_)
            | StoreError::RecordNotFound { .. }
            | StoreError::AttachmentNotFound(_) => ErrorKind::NotFound,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            StoreError::Io(_)
            | StoreError::SaveFailed(_)
            | StoreError::Serialization(_)
            | StoreError::Image(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn record_not_found(collection: &str, id: &str) -> Self {
        StoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
