//! Persisted run-state record.
//!
//! A local record of the last successfully started agent, read at
//! startup so `serve` can auto-resume without a control call.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AgentError, DispatchMode};

/// Parameters of the last successfully started agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub workspace_name: String,
    pub preshared_key_hex: String,
    pub channel_name: String,
    pub mode: DispatchMode,
}

/// File-backed store for the run-state record.
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<Option<RunState>, AgentError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => Ok(Some(state)),
                Err(e) => {
                    // A corrupt record is not worth crashing over
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed run-state record");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, state: &RunState) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, contents).await?;
        debug!(path = %self.path.display(), "persisted run state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> RunState {
        RunState {
            workspace_name: "team".to_string(),
            preshared_key_hex: "00".repeat(32),
            channel_name: "general".to_string(),
            mode: DispatchMode::AiReply,
        }
    }

    #[tokio::test]
    async fn load_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("agent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("agent.json"));

        store.save(&test_state()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.workspace_name, "team");
        assert_eq!(loaded.channel_name, "general");
        assert!(matches!(loaded.mode, DispatchMode::AiReply));
    }

    #[tokio::test]
    async fn malformed_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = RunStateStore::new(path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn run_state_wire_names_are_camel_case() {
        let json = serde_json::to_value(test_state()).unwrap();
        assert!(json.get("workspaceName").is_some());
        assert!(json.get("presharedKeyHex").is_some());
        assert!(json.get("channelName").is_some());
    }
}
