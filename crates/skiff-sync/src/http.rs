//! HTTP/websocket client for the local sync daemon.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::{
    ChatChannel, ChatMessage, DocumentTree, Psk, SyncError, SyncService, WorkspaceDescriptor,
    WorkspaceSession, session::escape_workspace_name,
};

/// Capacity of the per-subscription delivery queue.
const SUBSCRIPTION_QUEUE_SIZE: usize = 256;

/// Client for the sync daemon's HTTP API.
pub struct HttpSyncService {
    http: Client,
    base_url: String,
}

impl HttpSyncService {
    /// Create a new client for the given daemon base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Derive the websocket URL for a given API path.
    fn ws_url(&self, path: &str) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}{}", base, path)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status.to_string());
    if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
        Err(SyncError::Join(message))
    } else {
        Err(SyncError::Protocol(message))
    }
}

#[async_trait]
impl SyncService for HttpSyncService {
    #[tracing::instrument(skip(self, psk))]
    async fn join_workspace(
        &self,
        name: &str,
        display_name: &str,
        trusted: bool,
        relaxed_certs: bool,
        psk: &Psk,
    ) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url("/workspaces/join"))
            .json(&json!({
                "name": name,
                "displayName": display_name,
                "trusted": trusted,
                "relaxedCerts": relaxed_certs,
                "pskHex": psk.to_hex(),
            }))
            .send()
            .await?;

        check_status(response).await?;
        info!(workspace = %name, "joined workspace");
        Ok(())
    }

    async fn resume_workspace(
        &self,
        descriptor: &WorkspaceDescriptor,
    ) -> Result<WorkspaceSession, SyncError> {
        let escaped_name = escape_workspace_name(&descriptor.name);
        let response = self
            .http
            .get(self.url(&format!("/workspaces/{}", escaped_name)))
            .send()
            .await?;
        check_status(response).await?;

        let tree = Arc::new(HttpDocumentTree {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            workspace: escaped_name.to_string(),
        });
        let chat = Arc::new(HttpChatChannel {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            ws_base: self.ws_url(""),
            workspace: escaped_name.clone(),
        });

        debug!(workspace = %escaped_name, "resumed workspace");
        Ok(WorkspaceSession::new(descriptor.clone(), tree, chat))
    }
}

/// Document-tree accessor over the daemon's HTTP API.
struct HttpDocumentTree {
    http: Client,
    base_url: String,
    workspace: String,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FileContentResponse {
    content: String,
}

impl HttpDocumentTree {
    fn url(&self, path: &str) -> String {
        format!("{}/workspaces/{}{}", self.base_url, self.workspace, path)
    }
}

#[async_trait]
impl DocumentTree for HttpDocumentTree {
    async fn list_projects(&self) -> Result<Vec<String>, SyncError> {
        let response = self.http.get(self.url("/projects")).send().await?;
        let body: ProjectsResponse = check_status(response).await?.json().await?;
        Ok(body.projects)
    }

    async fn list_files(&self, project: &str) -> Result<Vec<String>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!(
                "/projects/{}/files",
                escape_workspace_name(project)
            )))
            .send()
            .await?;
        let body: FilesResponse = check_status(response).await?.json().await?;
        Ok(body.files)
    }

    async fn read_file(&self, project: &str, path: &str) -> Result<String, SyncError> {
        let response = self
            .http
            .get(self.url(&format!(
                "/projects/{}/file",
                escape_workspace_name(project)
            )))
            .query(&[("path", path)])
            .send()
            .await?;
        let body: FileContentResponse = check_status(response).await?.json().await?;
        Ok(body.content)
    }
}

/// Chat accessor over the daemon's HTTP API plus a websocket event feed.
struct HttpChatChannel {
    http: Client,
    base_url: String,
    ws_base: String,
    workspace: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    channels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    messages: Vec<ChatMessage>,
}

impl HttpChatChannel {
    fn url(&self, path: &str) -> String {
        format!("{}/workspaces/{}{}", self.base_url, self.workspace, path)
    }
}

#[async_trait]
impl ChatChannel for HttpChatChannel {
    async fn list_channels(&self) -> Result<Vec<String>, SyncError> {
        let response = self.http.get(self.url("/channels")).send().await?;
        let body: ChannelsResponse = check_status(response).await?.json().await?;
        Ok(body.channels)
    }

    async fn history(&self, channel: &str) -> Result<Vec<ChatMessage>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!(
                "/channels/{}/history",
                escape_workspace_name(channel)
            )))
            .send()
            .await?;
        let body: HistoryResponse = check_status(response).await?.json().await?;
        Ok(body.messages)
    }

    async fn subscribe(
        &self,
        channel: &str,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<ChatMessage>, SyncError> {
        let ws_url = format!(
            "{}/workspaces/{}/channels/{}/events",
            self.ws_base,
            self.workspace,
            escape_workspace_name(channel)
        );

        let (stream, _) = connect_async(&ws_url).await?;
        info!(workspace = %self.workspace, channel = %channel, "subscribed to channel events");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_QUEUE_SIZE);
        let channel_name = channel.to_string();

        tokio::spawn(async move {
            let (_write, mut read) = stream.split();
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            debug!(channel = %channel_name, "subscription shutting down");
                            break;
                        }
                    }
                    frame = read.next() => {
                        match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                match serde_json::from_str::<ChatMessage>(&text) {
                                    Ok(message) => {
                                        if tx.send(message).await.is_err() {
                                            debug!(channel = %channel_name, "subscriber dropped, ending feed");
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(channel = %channel_name, error = %e, "skipping malformed event frame");
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!(channel = %channel_name, "event stream closed");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!(channel = %channel_name, error = %e, "event stream error");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn publish(&self, channel: &str, message: &ChatMessage) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url(&format!(
                "/channels/{}/messages",
                escape_workspace_name(channel)
            )))
            .json(message)
            .send()
            .await?;
        check_status(response).await?;
        debug!(channel = %channel, id = %message.id, "published message");
        Ok(())
    }
}
