//! Error types for the sync-service client.

use thiserror::Error;

/// Errors that can occur when talking to the sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input rejected before any network action.
    #[error("validation error: {0}")]
    Validation(String),

    /// Workspace join failed at the sync service.
    #[error("join failed: {0}")]
    Join(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error from the metadata store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sync service returned something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),
}
