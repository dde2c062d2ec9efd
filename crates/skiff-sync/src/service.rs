//! Trait seams over the external sync service.
//!
//! The sync daemon owns replication, CRDT merging, and the network
//! protocol. Skiff only ever needs these narrow views of it.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::{ChatMessage, Psk, SyncError, WorkspaceDescriptor, WorkspaceSession};

/// Workspace-level operations on the sync service.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Join a workspace with the given policy flags and pre-shared key.
    async fn join_workspace(
        &self,
        name: &str,
        display_name: &str,
        trusted: bool,
        relaxed_certs: bool,
        psk: &Psk,
    ) -> Result<(), SyncError>;

    /// Resume an already-joined workspace.
    async fn resume_workspace(
        &self,
        descriptor: &WorkspaceDescriptor,
    ) -> Result<WorkspaceSession, SyncError>;
}

/// Read access to a workspace's replicated document tree.
#[async_trait]
pub trait DocumentTree: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<String>, SyncError>;

    async fn list_files(&self, project: &str) -> Result<Vec<String>, SyncError>;

    /// Read the live text content of a file.
    async fn read_file(&self, project: &str, path: &str) -> Result<String, SyncError>;
}

/// A workspace's chat surface.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<String>, SyncError>;

    /// Full channel history in insertion order.
    async fn history(&self, channel: &str) -> Result<Vec<ChatMessage>, SyncError>;

    /// Subscribe to a channel's event stream.
    ///
    /// Messages arrive on the returned receiver in channel history
    /// order. The underlying forwarding task stops when `shutdown_rx`
    /// flips to true.
    async fn subscribe(
        &self,
        channel: &str,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<ChatMessage>, SyncError>;

    /// Publish a message to a channel.
    async fn publish(&self, channel: &str, message: &ChatMessage) -> Result<(), SyncError>;
}
