use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Lifecycle of one generation session.
///
/// `Done`, `Errored` and `Superseded` are absorbing. `Superseded` is entered
/// when a regenerate on the same slot replaces the session before it
/// finalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Submitting,
    Waiting { elapsed: Duration, polls: u32 },
    Finalizing,
    Done,
    Errored { kind: ErrorKind },
    Superseded,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Errored { .. } | SessionState::Superseded
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Submitting => "submitting",
            SessionState::Waiting { .. } => "waiting",
            SessionState::Finalizing => "finalizing",
            SessionState::Done => "done",
            SessionState::Errored { .. } => "errored",
            SessionState::Superseded => "superseded",
        }
    }

    pub fn can_advance_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Submitting) => true,
            (Submitting, Waiting { .. }) => true,
            (Waiting { .. }, Waiting { .. }) => true,
            // Synchronous providers may resolve before the first poll result.
            (Submitting | Waiting { .. }, Finalizing) => true,
            (Finalizing, Done) => true,
            (Submitting | Waiting { .. } | Finalizing, Errored { .. }) => true,
            (Idle | Submitting | Waiting { .. } | Finalizing, Superseded) => true,
            _ => false,
        }
    }
}
