//! Session types

use relaydesk_core::{RelayDeskError, User};
use std::fmt;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Result of restoring a persisted session at startup
///
/// Restoring never fails; a persisted session that could not be used is reported as
/// `Discarded` so the caller can log it.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Cached token and user were adopted
    Restored { user: User },
    /// Nothing (or only half a session) was persisted
    NoSession,
    /// The persisted session was unreadable and has been cleared
    Discarded { error: RelayDeskError },
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, RestoreOutcome::Restored { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            RestoreOutcome::Restored { user } => Some(user),
            _ => None,
        }
    }
}
