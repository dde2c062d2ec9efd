//! Identity bootstrap for Skiff.
//!
//! Before anything else runs, the process must hold a usable signing
//! credential for its principal. The identity service owns the
//! credential and the challenge/response retry cadence; this crate
//! drives the handshake through an explicit state machine and aborts
//! startup on terminal failure.

mod bootstrap;
mod error;
mod machine;
mod service;

pub use bootstrap::ensure_identity;
pub use error::IdentityError;
pub use machine::{ChallengeAction, ChallengeMachine, ChallengeState};
pub use service::{CodeSource, HttpIdentityService, IdentityService, PromptCodeSource};
