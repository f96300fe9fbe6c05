//! Per-connection state machine
//!
//! `Connecting -> Open -> Active -> Closing -> Closed`, where `Active` loops
//! on itself for every message exchanged. Any state before `Closing` may
//! jump straight to `Closing` on error or timeout.

use crate::error::StateError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Socket accepted, session not yet open
    #[default]
    Connecting,
    /// Session open, `connected` sent
    Open,
    /// At least one message exchanged
    Active,
    /// Teardown started
    Closing,
    /// Session summarized and released
    Closed,
}

/// Validate a state transition
///
/// # Errors
/// Returns `StateError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(from: ConnectionState, to: ConnectionState) -> Result<(), StateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: ConnectionState) -> Vec<ConnectionState> {
    use ConnectionState::{Active, Closed, Closing, Connecting, Open};
    match from {
        Connecting => vec![Open, Closing],
        Open => vec![Active, Closing],
        Active => vec![Active, Closing],
        Closing => vec![Closed],
        Closed => vec![],
    }
}

/// Current state plus checked transitions
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StateTracker {
    state: ConnectionState,
}

impl StateTracker {
    pub(crate) fn get(self) -> ConnectionState {
        self.state
    }

    /// Move to `to`, logging and ignoring illegal moves
    pub(crate) fn advance(&mut self, to: ConnectionState) {
        match validate_transition(self.state, to) {
            Ok(()) => self.state = to,
            Err(e) => tracing::error!("{}", e),
        }
    }
}
