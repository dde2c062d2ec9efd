//! Error types for the agent core.

use thiserror::Error;

/// Errors that can occur while starting or running an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Sync-service error (validation, join, protocol).
    #[error("sync error: {0}")]
    Sync(#[from] skiff_sync::SyncError),

    /// The requested channel does not exist in the workspace.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// Digest pipeline error.
    #[error("digest error: {0}")]
    Digest(#[from] skiff_digest::DigestError),

    /// Text-generation backend error.
    #[error("generation error: {0}")]
    Generation(String),

    /// Failed to persist or load the run-state record.
    #[error("run-state error: {0}")]
    RunState(#[from] std::io::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
