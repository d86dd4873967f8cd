//! Protocol states and the allowed transitions between them.

use std::fmt;

use bat_types::ConfirmationId;

use crate::ConfirmationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Idle,
    TokensRequested,
    TokensIssued,
    ConfirmationPrepared,
    ConfirmationSent,
    Redeemed,
    Failed,
}

impl ProtocolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Failed)
    }

    /// The forward edges of the protocol, plus `Failed` from any
    /// non-terminal state.
    pub fn can_transition_to(&self, next: ProtocolState) -> bool {
        use ProtocolState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, TokensRequested)
            | (TokensRequested, TokensIssued)
            | (TokensIssued, ConfirmationPrepared)
            | (ConfirmationPrepared, ConfirmationSent)
            | (ConfirmationSent, Redeemed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TokensRequested => "tokens_requested",
            Self::TokensIssued => "tokens_issued",
            Self::ConfirmationPrepared => "confirmation_prepared",
            Self::ConfirmationSent => "confirmation_sent",
            Self::Redeemed => "redeemed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one confirmation. Starts with tokens already issued.
#[derive(Debug)]
pub struct ConfirmationMachine {
    id: ConfirmationId,
    state: ProtocolState,
}

impl ConfirmationMachine {
    pub fn new(id: ConfirmationId) -> Self {
        Self {
            id,
            state: ProtocolState::TokensIssued,
        }
    }

    pub fn id(&self) -> &ConfirmationId {
        &self.id
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn advance(&mut self, next: ProtocolState) -> Result<(), ConfirmationError> {
        if !self.state.can_transition_to(next) {
            return Err(ConfirmationError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(confirmation_id = %self.id, from = %self.state, to = %next, "confirmation state");
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ProtocolState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProtocolState::*;

    const ALL: [ProtocolState; 7] = [
        Idle,
        TokensRequested,
        TokensIssued,
        ConfirmationPrepared,
        ConfirmationSent,
        Redeemed,
        Failed,
    ];

    #[test]
    fn happy_path_is_allowed() {
        let path = [Idle, TokensRequested, TokensIssued, ConfirmationPrepared, ConfirmationSent, Redeemed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in ALL {
            assert!(!Redeemed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }

    #[test]
    fn every_live_state_can_fail() {
        for state in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!TokensIssued.can_transition_to(ConfirmationSent));
        assert!(!ConfirmationSent.can_transition_to(ConfirmationPrepared));
        assert!(!Idle.can_transition_to(Redeemed));
    }

    #[test]
    fn machine_rejects_illegal_transition() {
        let mut machine = ConfirmationMachine::new(ConfirmationId::new("c1"));
        assert_eq!(machine.state(), TokensIssued);
        let err = machine.advance(Redeemed).unwrap_err();
        assert!(matches!(
            err,
            ConfirmationError::InvalidTransition { from: TokensIssued, to: Redeemed }
        ));
        machine.advance(ConfirmationPrepared).unwrap();
        machine.fail();
        assert_eq!(machine.state(), Failed);
        machine.fail();
        assert_eq!(machine.state(), Failed);
    }
}
