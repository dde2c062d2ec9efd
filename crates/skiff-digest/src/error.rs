//! Error types for the digest pipeline.

use thiserror::Error;

/// Errors that can occur while building or delivering a digest.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Sync-service error while reading the document tree.
    #[error("sync error: {0}")]
    Sync(#[from] skiff_sync::SyncError),

    /// The mail template is missing a delimiter.
    #[error("template error: {0}")]
    Template(String),

    /// IO error reading the template file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Mail transport failure.
    #[error("delivery error: {0}")]
    Delivery(String),
}
