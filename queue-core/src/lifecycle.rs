//! Draft lifecycle state machine.
//!
//! A pure, side-effect-free state machine over [`SyncState`]. It takes an
//! event and produces the next state, or refuses the transition.
//!
//! ```text
//!   Pending ──AttemptStarted──► Syncing ──RemoteConfirmed──► Synced (terminal)
//!                                 │  ▲
//!                  RemoteFailed / │  │ AttemptStarted
//!                   Interrupted   ▼  │
//!                                Error
//! ```
//!
//! The caller (queue-client) persists the resulting state. Because every
//! transition out of `Syncing` requires an outcome event, a draft that is
//! syncing accepts no second attempt.

use queue_types::{Draft, RemoteId, SyncState, Timestamp};
use thiserror::Error;

/// Events in a draft's synchronization lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEvent {
    /// A sync attempt is starting.
    AttemptStarted,
    /// The remote API created the lead.
    RemoteConfirmed {
        /// Identifier the server assigned.
        remote_id: RemoteId,
    },
    /// The remote API (or the network) failed.
    RemoteFailed {
        /// Error message to record.
        message: String,
    },
    /// The process stopped while an attempt was in flight.
    Interrupted,
}

impl DraftEvent {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttemptStarted => "attempt-started",
            Self::RemoteConfirmed { .. } => "remote-confirmed",
            Self::RemoteFailed { .. } => "remote-failed",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Message recorded on drafts recovered from an interrupted attempt.
pub const INTERRUPTED_MESSAGE: &str = "sync interrupted before the server responded";

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not legal in the current state.
    #[error("invalid transition: {event} while {from}")]
    InvalidTransition {
        /// State the draft was in.
        from: &'static str,
        /// Event that was refused.
        event: &'static str,
    },
}

/// Compute the state that follows `state` on `event`.
///
/// This is a pure function. Transitions not in the lifecycle table are
/// refused; in particular nothing leaves `Synced`.
pub fn next_state(state: &SyncState, event: DraftEvent) -> Result<SyncState, TransitionError> {
    match (state, event) {
        // Errors are always retryable
        (SyncState::Pending | SyncState::Error { .. }, DraftEvent::AttemptStarted) => {
            Ok(SyncState::Syncing)
        }

        // From Syncing
        (SyncState::Syncing, DraftEvent::RemoteConfirmed { remote_id }) => {
            Ok(SyncState::Synced { remote_id })
        }
        (SyncState::Syncing, DraftEvent::RemoteFailed { message }) => {
            Ok(SyncState::Error { message })
        }
        (SyncState::Syncing, DraftEvent::Interrupted) => Ok(SyncState::Error {
            message: INTERRUPTED_MESSAGE.to_string(),
        }),

        (state, event) => Err(TransitionError::InvalidTransition {
            from: state.name(),
            event: event.name(),
        }),
    }
}

/// Apply `event` to a draft in place.
///
/// Bumps `attempts` when an attempt starts and stamps `updated_at`. On
/// error the draft is left untouched.
pub fn apply(draft: &mut Draft, event: DraftEvent, now: Timestamp) -> Result<(), TransitionError> {
    let starting = matches!(event, DraftEvent::AttemptStarted);
    draft.sync_state = next_state(&draft.sync_state, event)?;
    if starting {
        draft.attempts = draft.attempts.saturating_add(1);
    }
    draft.updated_at = now;
    Ok(())
}

/// Whether a draft's content (customer, items) may still be edited.
pub fn is_editable(state: &SyncState) -> bool {
    matches!(state, SyncState::Pending | SyncState::Error { .. })
}
