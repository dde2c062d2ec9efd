//! Core types shared across the workspace session and chat channel.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SyncError;

/// Required pre-shared key length in bytes.
pub const PSK_LEN: usize = 32;

/// A workspace pre-shared key.
///
/// Construction is the only place key length is checked; everything
/// downstream can rely on the invariant.
#[derive(Clone, PartialEq, Eq)]
pub struct Psk([u8; PSK_LEN]);

impl Psk {
    /// Build a key from raw bytes. Any length other than 32 is a
    /// validation error, not a protocol error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        let arr: [u8; PSK_LEN] = bytes.try_into().map_err(|_| {
            SyncError::Validation(format!(
                "pre-shared key must be exactly {} bytes, got {}",
                PSK_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Build a key from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, SyncError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| SyncError::Validation(format!("invalid hex pre-shared key: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PSK_LEN] {
        &self.0
    }

    /// Hex encoding for wire transfer to the local sync daemon.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log key material
        write!(f, "Psk(..)")
    }
}

/// Identifies a workspace and the secret that unlocks it.
#[derive(Debug, Clone)]
pub struct WorkspaceDescriptor {
    pub name: String,
    pub psk: Psk,
}

/// Locally persisted workspace metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMetadata {
    pub name: String,
    /// Public/trusted join mode flag, interpreted by the sync service.
    pub trusted: bool,
    /// When true, certificate validation is relaxed for this workspace.
    pub relaxed_certs: bool,
    pub joined_at: DateTime<Utc>,
}

/// A single message in a chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub timestamp_ms: i64,
    pub text: String,
}
