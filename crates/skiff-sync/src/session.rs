//! Workspace session setup.
//!
//! Joining is idempotent: a workspace already present in the local
//! metadata store is resumed without another join round-trip.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    ChatChannel, DocumentTree, MetadataStore, Psk, SyncError, SyncService, WorkspaceDescriptor,
    WorkspaceMetadata,
};

/// A live session on a joined workspace.
pub struct WorkspaceSession {
    descriptor: WorkspaceDescriptor,
    tree: Arc<dyn DocumentTree>,
    chat: Arc<dyn ChatChannel>,
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl WorkspaceSession {
    /// Assemble a session from resolved handles.
    pub fn new(
        descriptor: WorkspaceDescriptor,
        tree: Arc<dyn DocumentTree>,
        chat: Arc<dyn ChatChannel>,
    ) -> Self {
        Self {
            descriptor,
            tree,
            chat,
        }
    }

    /// Join-or-resume a workspace.
    ///
    /// Key length is validated before any network action. When
    /// `relax_certs` is set, the stored metadata's certificate policy
    /// is flipped and persisted back before resuming; operating across
    /// organizational trust boundaries requires that to be explicit
    /// and durable, not implicit.
    #[tracing::instrument(skip(service, store, psk_bytes))]
    pub async fn setup(
        service: &dyn SyncService,
        store: &dyn MetadataStore,
        name: &str,
        psk_bytes: &[u8],
        relax_certs: bool,
    ) -> Result<Self, SyncError> {
        let psk = Psk::from_bytes(psk_bytes)?;

        match store.get(name).await? {
            Some(mut meta) => {
                debug!(workspace = %name, "workspace already joined, resuming");
                if relax_certs && !meta.relaxed_certs {
                    meta.relaxed_certs = true;
                    store.put(name, &meta).await?;
                    info!(workspace = %name, "relaxed certificate validation persisted");
                }
            }
            None => {
                info!(workspace = %name, "joining workspace");
                service
                    .join_workspace(name, name, true, relax_certs, &psk)
                    .await?;
                let meta = WorkspaceMetadata {
                    name: name.to_string(),
                    trusted: true,
                    relaxed_certs: relax_certs,
                    joined_at: Utc::now(),
                };
                store.put(name, &meta).await?;
            }
        }

        let descriptor = WorkspaceDescriptor {
            name: name.to_string(),
            psk,
        };
        service.resume_workspace(&descriptor).await
    }

    pub fn descriptor(&self) -> &WorkspaceDescriptor {
        &self.descriptor
    }

    pub fn document_tree(&self) -> Arc<dyn DocumentTree> {
        Arc::clone(&self.tree)
    }

    pub fn chat_channel(&self) -> Arc<dyn ChatChannel> {
        Arc::clone(&self.chat)
    }
}

/// Escape a workspace name for use in paths and URLs.
///
/// Bytes outside `[A-Za-z0-9._-]` are percent-encoded.
pub fn escape_workspace_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", byte));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::{Mutex, mpsc, watch};

    use crate::ChatMessage;

    struct NullTree;

    #[async_trait]
    impl DocumentTree for NullTree {
        async fn list_projects(&self) -> Result<Vec<String>, SyncError> {
            Ok(vec![])
        }
        async fn list_files(&self, _project: &str) -> Result<Vec<String>, SyncError> {
            Ok(vec![])
        }
        async fn read_file(&self, _project: &str, _path: &str) -> Result<String, SyncError> {
            Ok(String::new())
        }
    }

    struct NullChat;

    #[async_trait]
    impl ChatChannel for NullChat {
        async fn list_channels(&self) -> Result<Vec<String>, SyncError> {
            Ok(vec![])
        }
        async fn history(&self, _channel: &str) -> Result<Vec<ChatMessage>, SyncError> {
            Ok(vec![])
        }
        async fn subscribe(
            &self,
            _channel: &str,
            _shutdown_rx: watch::Receiver<bool>,
        ) -> Result<mpsc::Receiver<ChatMessage>, SyncError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
        async fn publish(&self, _channel: &str, _message: &ChatMessage) -> Result<(), SyncError> {
            Ok(())
        }
    }

    struct FakeService {
        joins: AtomicUsize,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                joins: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SyncService for FakeService {
        async fn join_workspace(
            &self,
            _name: &str,
            _display_name: &str,
            _trusted: bool,
            _relaxed_certs: bool,
            _psk: &Psk,
        ) -> Result<(), SyncError> {
            self.joins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resume_workspace(
            &self,
            descriptor: &WorkspaceDescriptor,
        ) -> Result<WorkspaceSession, SyncError> {
            Ok(WorkspaceSession::new(
                descriptor.clone(),
                Arc::new(NullTree),
                Arc::new(NullChat),
            ))
        }
    }

    struct MemoryStore {
        entries: Mutex<Vec<WorkspaceMetadata>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MetadataStore for MemoryStore {
        async fn get(&self, name: &str) -> Result<Option<WorkspaceMetadata>, SyncError> {
            Ok(self
                .entries
                .lock()
                .await
                .iter()
                .find(|m| m.name == name)
                .cloned())
        }

        async fn put(&self, name: &str, meta: &WorkspaceMetadata) -> Result<(), SyncError> {
            let mut entries = self.entries.lock().await;
            entries.retain(|m| m.name != name);
            let mut meta = meta.clone();
            meta.name = name.to_string();
            entries.push(meta);
            Ok(())
        }
    }

    #[tokio::test]
    async fn setup_rejects_short_psk_before_joining() {
        let service = FakeService::new();
        let store = MemoryStore::new();

        let err = WorkspaceSession::setup(&service, &store, "ws", &[0u8; 31], false)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(service.joins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn setup_joins_unknown_workspace_once() {
        let service = FakeService::new();
        let store = MemoryStore::new();

        WorkspaceSession::setup(&service, &store, "ws", &[0u8; 32], false)
            .await
            .unwrap();
        assert_eq!(service.joins.load(Ordering::SeqCst), 1);

        // Second setup resumes without another join
        WorkspaceSession::setup(&service, &store, "ws", &[0u8; 32], false)
            .await
            .unwrap();
        assert_eq!(service.joins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn setup_persists_relaxed_certs_on_existing_workspace() {
        let service = FakeService::new();
        let store = MemoryStore::new();

        WorkspaceSession::setup(&service, &store, "ws", &[0u8; 32], false)
            .await
            .unwrap();
        assert!(!store.get("ws").await.unwrap().unwrap().relaxed_certs);

        WorkspaceSession::setup(&service, &store, "ws", &[0u8; 32], true)
            .await
            .unwrap();
        assert!(store.get("ws").await.unwrap().unwrap().relaxed_certs);
    }

    #[test]
    fn escape_passes_safe_names_through() {
        assert_eq!(escape_workspace_name("team-alpha_1.0"), "team-alpha_1.0");
    }

    #[test]
    fn escape_percent_encodes_spaces_and_slashes() {
        assert_eq!(escape_workspace_name("team alpha"), "team%20alpha");
        assert_eq!(escape_workspace_name("a/b"), "a%2Fb");
    }
}
