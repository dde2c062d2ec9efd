//! Error types for identity bootstrap.

use thiserror::Error;

/// Errors that can occur while obtaining a signing credential.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service reported a terminal failure.
    #[error("credential issuance failed: {0}")]
    Terminal(String),

    /// No verification code could be obtained from the code source.
    #[error("no verification code available")]
    NoCode,

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity service returned something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),
}
