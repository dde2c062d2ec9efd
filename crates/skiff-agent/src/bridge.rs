//! Channel bridge: subscription, self-reply guard, dispatch.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skiff_digest::DigestPipeline;
use skiff_sync::{ChatMessage, WorkspaceSession};

use crate::{AgentError, TextGenerator};

/// Prefix marking messages the agent itself authored.
///
/// The guard is content-based, not author-based: any message starting
/// with this prefix is dropped, including externally authored ones
/// that happen to share it. Known fragility, preserved deliberately.
pub const SELF_REPLY_SENTINEL: &str = "AGENT: ";

/// Behavior attached to non-self messages. Exactly one per
/// subscription, chosen at agent-start time.
pub enum Dispatch {
    /// Generate a reply and publish it back to the same channel.
    AiReply {
        generator: Arc<dyn TextGenerator>,
        /// Author name stamped on outbound messages.
        author: String,
    },
    /// Run the digest pipeline once, then signal process shutdown.
    Digest {
        pipeline: Arc<DigestPipeline>,
        /// Signaled on successful completion; the single scheduled
        /// run is over and the process should exit.
        complete_tx: watch::Sender<bool>,
    },
}

/// A live channel subscription.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wait for the subscription task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "subscription task failed");
        }
    }
}

/// Bridges one chat channel to one dispatch behavior.
pub struct ChannelBridge;

impl ChannelBridge {
    /// Subscribe to `channel_name` on the session's chat handle.
    ///
    /// Fails with [`AgentError::ChannelNotFound`] without subscribing
    /// when the channel does not exist. Messages reach the dispatch in
    /// channel history order; the bridge never reorders or batches.
    #[tracing::instrument(skip(session, dispatch, shutdown_rx), fields(workspace = %session.descriptor().name))]
    pub async fn attach(
        session: Arc<WorkspaceSession>,
        channel_name: &str,
        dispatch: Dispatch,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Subscription, AgentError> {
        let chat = session.chat_channel();

        let channels = chat.list_channels().await?;
        if !channels.iter().any(|c| c == channel_name) {
            return Err(AgentError::ChannelNotFound(channel_name.to_string()));
        }

        let rx = chat.subscribe(channel_name, shutdown_rx.clone()).await?;
        info!(channel = %channel_name, "channel bridge attached");

        let channel = channel_name.to_string();
        let task = tokio::spawn(run_subscription(
            session, channel, dispatch, shutdown_rx, rx,
        ));

        Ok(Subscription { task })
    }
}

async fn run_subscription(
    session: Arc<WorkspaceSession>,
    channel: String,
    dispatch: Dispatch,
    mut shutdown_rx: watch::Receiver<bool>,
    mut rx: tokio::sync::mpsc::Receiver<ChatMessage>,
) {
    let chat = session.chat_channel();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    debug!(channel = %channel, "bridge shutting down");
                    break;
                }
            }
            message = rx.recv() => {
                let Some(message) = message else {
                    info!(channel = %channel, "event stream ended");
                    break;
                };

                if message.text.starts_with(SELF_REPLY_SENTINEL) {
                    debug!(channel = %channel, id = %message.id, "ignoring own reply");
                    continue;
                }

                // An in-flight callback from a cancelled handle must
                // not take externally visible actions
                if *shutdown_rx.borrow() {
                    break;
                }

                match &dispatch {
                    Dispatch::AiReply { generator, author } => {
                        handle_ai_reply(
                            chat.as_ref(),
                            &channel,
                            &message,
                            generator.as_ref(),
                            author,
                            &shutdown_rx,
                        )
                        .await;
                    }
                    Dispatch::Digest { pipeline, complete_tx } => {
                        match pipeline.run(&session).await {
                            Ok(()) => {
                                if *shutdown_rx.borrow() {
                                    break;
                                }
                                info!(channel = %channel, "digest run complete, signaling shutdown");
                                let _ = complete_tx.send(true);
                                break;
                            }
                            Err(e) => {
                                // Fatal to this run only; a re-sent
                                // trigger starts another attempt
                                error!(channel = %channel, error = %e, "digest run failed");
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn handle_ai_reply(
    chat: &dyn skiff_sync::ChatChannel,
    channel: &str,
    message: &ChatMessage,
    generator: &dyn TextGenerator,
    author: &str,
    shutdown_rx: &watch::Receiver<bool>,
) {
    let reply = match generator.generate(&message.text).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(channel = %channel, error = %e, "generation failed");
            return;
        }
    };

    // The handle may have been replaced while generating
    if *shutdown_rx.borrow() {
        debug!(channel = %channel, "handle cancelled mid-generation, dropping reply");
        return;
    }

    let outbound = ChatMessage {
        id: Uuid::new_v4().to_string(),
        author: author.to_string(),
        timestamp_ms: Utc::now().timestamp_millis(),
        text: format!("{}{}", SELF_REPLY_SENTINEL, reply),
    };

    // Awaited so delivery failure surfaces here, but not retried
    if let Err(e) = chat.publish(channel, &outbound).await {
        warn!(channel = %channel, error = %e, "failed to publish reply");
    }
}
