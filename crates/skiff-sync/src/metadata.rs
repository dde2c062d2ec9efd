//! Local metadata store for joined workspaces.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::{SyncError, WorkspaceMetadata, session::escape_workspace_name};

/// Store for per-workspace join metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<WorkspaceMetadata>, SyncError>;

    async fn put(&self, name: &str, meta: &WorkspaceMetadata) -> Result<(), SyncError>;
}

/// File-backed metadata store, one JSON file per workspace.
pub struct FileMetadataStore {
    dir: PathBuf,
}

impl FileMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_workspace_name(name)))
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get(&self, name: &str) -> Result<Option<WorkspaceMetadata>, SyncError> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let meta = serde_json::from_str(&contents)?;
                Ok(Some(meta))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &str, meta: &WorkspaceMetadata) -> Result<(), SyncError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(name);
        let contents = serde_json::to_string_pretty(meta)?;
        tokio::fs::write(&path, contents).await?;
        debug!(workspace = %name, path = %path.display(), "persisted workspace metadata");
        Ok(())
    }
}
