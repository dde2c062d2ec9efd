//! Singleton agent lifecycle.
//!
//! The manager owns the one mutable slot crossing the control
//! boundary. Replacement is cancel-before-install: the previous
//! handle's subscription is detached and its task joined before the
//! new session is even constructed, so no two agents are ever
//! subscribed at the same instant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use skiff_digest::DigestPipeline;
use skiff_sync::{MetadataStore, Psk, SyncService, WorkspaceSession};

use crate::{
    AgentError, ChannelBridge, Dispatch, RunState, RunStateStore, Subscription, TextGenerator,
};

/// Which behavior the agent attaches to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    AiReply,
    Digest,
}

/// Collaborators wired into every agent the manager starts.
pub struct AgentDeps {
    pub sync: Arc<dyn SyncService>,
    pub metadata: Arc<dyn MetadataStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub pipeline: Arc<DigestPipeline>,
    /// Relax certificate validation on joined workspaces.
    pub relax_certs: bool,
    /// Author name stamped on outbound replies.
    pub author: String,
    /// Process-level shutdown, signaled by a completed digest run.
    pub process_shutdown: watch::Sender<bool>,
    /// Optional persisted run-state record for auto-resume.
    pub run_state: Option<RunStateStore>,
}

/// Description of the currently running agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub workspace_name: String,
    pub channel_name: String,
}

struct ActiveAgent {
    workspace_name: String,
    channel_name: String,
    shutdown_tx: watch::Sender<bool>,
    subscription: Subscription,
}

/// Owns the single active agent and its replacement protocol.
pub struct AgentLifecycleManager {
    deps: AgentDeps,
    // Single-writer discipline: only this manager mutates the slot
    active: Mutex<Option<ActiveAgent>>,
}

impl AgentLifecycleManager {
    pub fn new(deps: AgentDeps) -> Self {
        Self {
            deps,
            active: Mutex::new(None),
        }
    }

    /// Start a new agent, replacing any currently running one.
    ///
    /// The PSK is validated before any handle state is touched. On
    /// any setup failure nothing is installed; with the previous
    /// agent already cancelled, the slot is simply left empty.
    #[tracing::instrument(skip(self, psk_hex))]
    pub async fn start_or_replace(
        &self,
        workspace_name: &str,
        psk_hex: &str,
        channel_name: &str,
        mode: DispatchMode,
    ) -> Result<AgentStatus, AgentError> {
        let psk = Psk::from_hex(psk_hex)?;

        let mut slot = self.active.lock().await;

        if let Some(previous) = slot.take() {
            info!(
                workspace = %previous.workspace_name,
                channel = %previous.channel_name,
                "cancelling previous agent"
            );
            let _ = previous.shutdown_tx.send(true);
            // Cancellation completes before the new agent exists
            previous.subscription.join().await;
        }

        let session = WorkspaceSession::setup(
            self.deps.sync.as_ref(),
            self.deps.metadata.as_ref(),
            workspace_name,
            psk.as_bytes(),
            self.deps.relax_certs,
        )
        .await?;
        let session = Arc::new(session);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatch = match mode {
            DispatchMode::AiReply => Dispatch::AiReply {
                generator: Arc::clone(&self.deps.generator),
                author: self.deps.author.clone(),
            },
            DispatchMode::Digest => Dispatch::Digest {
                pipeline: Arc::clone(&self.deps.pipeline),
                complete_tx: self.deps.process_shutdown.clone(),
            },
        };

        let subscription =
            ChannelBridge::attach(session, channel_name, dispatch, shutdown_rx).await?;

        *slot = Some(ActiveAgent {
            workspace_name: workspace_name.to_string(),
            channel_name: channel_name.to_string(),
            shutdown_tx,
            subscription,
        });
        drop(slot);

        info!(workspace = %workspace_name, channel = %channel_name, "agent started");

        if let Some(store) = &self.deps.run_state {
            let record = RunState {
                workspace_name: workspace_name.to_string(),
                preshared_key_hex: psk.to_hex(),
                channel_name: channel_name.to_string(),
                mode,
            };
            if let Err(e) = store.save(&record).await {
                warn!(error = %e, "failed to persist run state");
            }
        }

        Ok(AgentStatus {
            workspace_name: workspace_name.to_string(),
            channel_name: channel_name.to_string(),
        })
    }

    /// The currently active agent, if any.
    pub async fn status(&self) -> Option<AgentStatus> {
        self.active.lock().await.as_ref().map(|a| AgentStatus {
            workspace_name: a.workspace_name.clone(),
            channel_name: a.channel_name.clone(),
        })
    }

    /// Cancel the active agent, if any.
    pub async fn shutdown(&self) {
        let mut slot = self.active.lock().await;
        if let Some(agent) = slot.take() {
            info!(workspace = %agent.workspace_name, "shutting down active agent");
            let _ = agent.shutdown_tx.send(true);
            agent.subscription.join().await;
        }
    }
}
