//! Challenge/response state machine.
//!
//! The identity service owns the retry cadence and calls back into
//! caller-supplied code repeatedly. Rather than nesting callbacks, the
//! handshake is modeled as a pull-based machine: feed it status tags,
//! act on the returned [`ChallengeAction`]. The machine tolerates an
//! unbounded number of callbacks in any order the service produces.

use tracing::{info, warn};

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    /// No credential and no challenge in flight.
    NoCredential,
    /// A challenge has been issued; awaiting a verification code.
    ChallengeIssued,
    /// A code has been submitted; awaiting the verdict.
    CodeSubmitted,
    /// The last submitted code was rejected.
    Rejected,
    /// A usable credential exists.
    Valid,
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeAction {
    /// Obtain a verification code out-of-band and submit it.
    SubmitCode,
    /// The previous code was wrong; the service will ask again.
    Retry,
    /// Nothing actionable; wait for the next status.
    Wait,
    /// The credential is valid; the handshake is over.
    Done,
}

/// Pull-based challenge/response machine.
#[derive(Debug)]
pub struct ChallengeMachine {
    state: ChallengeState,
}

impl ChallengeMachine {
    pub fn new() -> Self {
        Self {
            state: ChallengeState::NoCredential,
        }
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    /// Mark the challenge as issued.
    pub fn challenge_issued(&mut self) {
        if self.state == ChallengeState::NoCredential {
            self.state = ChallengeState::ChallengeIssued;
        }
    }

    /// Mark a code as submitted.
    pub fn code_submitted(&mut self) {
        self.state = ChallengeState::CodeSubmitted;
    }

    /// Feed a status tag from the identity service.
    ///
    /// Unknown tags are logged and leave the handshake pending; only
    /// the service decides when the handshake is over.
    pub fn on_status(&mut self, status: &str) -> ChallengeAction {
        match status {
            "valid" => {
                self.state = ChallengeState::Valid;
                ChallengeAction::Done
            }
            "need-code" => {
                self.state = ChallengeState::ChallengeIssued;
                ChallengeAction::SubmitCode
            }
            "wrong-code" => {
                warn!("verification code rejected, retrying");
                // Rejection is recoverable: fall back to awaiting a code
                self.state = ChallengeState::Rejected;
                ChallengeAction::Retry
            }
            other => {
                info!(status = %other, "identity challenge pending");
                ChallengeAction::Wait
            }
        }
    }
}

impl Default for ChallengeMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn starts_without_credential() {
        let machine = ChallengeMachine::new();
        assert_eq!(machine.state(), ChallengeState::NoCredential);
    }

    #[test]
    fn happy_path_reaches_valid() {
        let mut machine = ChallengeMachine::new();
        machine.challenge_issued();
        assert_eq!(machine.on_status("need-code"), ChallengeAction::SubmitCode);
        machine.code_submitted();
        assert_eq!(machine.state(), ChallengeState::CodeSubmitted);
        assert_eq!(machine.on_status("valid"), ChallengeAction::Done);
        assert_eq!(machine.state(), ChallengeState::Valid);
    }

    #[test]
    fn wrong_code_is_recoverable() {
        let mut machine = ChallengeMachine::new();
        machine.challenge_issued();
        machine.on_status("need-code");
        machine.code_submitted();

        assert_eq!(machine.on_status("wrong-code"), ChallengeAction::Retry);
        assert_eq!(machine.state(), ChallengeState::Rejected);

        // The service asks again and the handshake proceeds
        assert_eq!(machine.on_status("need-code"), ChallengeAction::SubmitCode);
        machine.code_submitted();
        assert_eq!(machine.on_status("valid"), ChallengeAction::Done);
    }

    #[test_case("pending")]
    #[test_case("rate-limited")]
    #[test_case("")]
    fn unknown_status_waits_without_state_change(status: &str) {
        let mut machine = ChallengeMachine::new();
        machine.challenge_issued();
        assert_eq!(machine.on_status(status), ChallengeAction::Wait);
        assert_eq!(machine.state(), ChallengeState::ChallengeIssued);
    }

    #[test]
    fn repeated_callbacks_are_idempotent() {
        let mut machine = ChallengeMachine::new();
        machine.challenge_issued();

        // The service may invoke the callback any number of times
        for _ in 0..100 {
            assert_eq!(machine.on_status("need-code"), ChallengeAction::SubmitCode);
        }
        machine.code_submitted();
        for _ in 0..100 {
            assert_eq!(machine.on_status("valid"), ChallengeAction::Done);
            assert_eq!(machine.state(), ChallengeState::Valid);
        }
    }
}
