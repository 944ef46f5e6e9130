//! Session phase state machine
//!
//! Phase transitions:
//! ```text
//! INIT ──(first message)──→ NORMAL ──(socket lost)──→ RESTORING
//!   ↑                         ↑                           │
//!   │                         └────(first message)────────┘
//!   └──────────────── (full teardown from any phase) ──────┘
//! ```

use crate::error::PhaseError;

/// Connection health of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No message exchanged on the current socket generation yet
    #[default]
    Init,

    /// At least one message received, the link is proven live
    Normal,

    /// Socket dropped after `Normal`; reconnecting while keeping the queue
    Restoring,
}

impl SessionPhase {
    /// Validates a phase transition
    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, next) {
            (Init, Normal) => true,
            (Normal, Restoring) => true,
            (Restoring, Normal) => true,

            // Full teardown
            (_, Init) => true,

            (a, b) if a == &b => true,

            _ => false,
        }
    }

    /// Attempts to transition to a new phase
    pub fn transition_to(&mut self, next: SessionPhase) -> Result<(), PhaseError> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(PhaseError {
                from: *self,
                to: next,
            })
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, SessionPhase::Normal)
    }

    #[inline]
    pub fn is_restoring(&self) -> bool {
        matches!(self, SessionPhase::Restoring)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Init => write!(f, "Init"),
            SessionPhase::Normal => write!(f, "Normal"),
            SessionPhase::Restoring => write!(f, "Restoring"),
        }
    }
}
