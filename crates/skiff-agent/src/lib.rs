//! Agent core for Skiff.
//!
//! One agent per process: the lifecycle manager owns the single
//! active handle, the channel bridge wires a workspace chat channel
//! to a dispatch behavior (AI reply or digest-and-notify).

mod bridge;
mod error;
mod generate;
mod lifecycle;
mod runstate;

pub use bridge::{ChannelBridge, Dispatch, SELF_REPLY_SENTINEL, Subscription};
pub use error::AgentError;
pub use generate::{CompletionClient, TextGenerator};
pub use lifecycle::{AgentDeps, AgentLifecycleManager, AgentStatus, DispatchMode};
pub use runstate::{RunState, RunStateStore};
