//! Sync-service client for Skiff.
//!
//! The distributed synchronization engine that keeps a workspace
//! consistent across peers is an external daemon. This crate wraps it
//! behind narrow traits ([`SyncService`], [`DocumentTree`],
//! [`ChatChannel`]) and provides the HTTP/websocket client that talks
//! to the local daemon, plus [`WorkspaceSession`] setup on top.

mod error;
mod http;
mod metadata;
mod service;
mod session;
mod types;

pub use error::SyncError;
pub use http::HttpSyncService;
pub use metadata::{FileMetadataStore, MetadataStore};
pub use service::{ChatChannel, DocumentTree, SyncService};
pub use session::{WorkspaceSession, escape_workspace_name};
pub use types::{ChatMessage, PSK_LEN, Psk, WorkspaceDescriptor, WorkspaceMetadata};
