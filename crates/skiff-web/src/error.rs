//! Error types for the control surface.

use thiserror::Error;

/// Errors that can occur while serving the control API.
#[derive(Debug, Error)]
pub enum WebError {
    /// Agent lifecycle error.
    #[error("agent error: {0}")]
    Agent(#[from] skiff_agent::AgentError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
