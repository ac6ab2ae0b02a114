//! Error types for queue-client.
//!
//! Remote failures are not errors here: they become draft state and a
//! [`SyncResult::Failed`](crate::SyncResult::Failed). Everything below is
//! surfaced to the caller.
//!
//! Errors are `Clone` because one attempt's outcome is handed to every
//! caller attached to it.

use std::path::PathBuf;

use queue_core::TransitionError;
use queue_types::{DraftId, ValidationError};
use thiserror::Error;

/// Draft persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The storage medium could not be read or written.
    #[error("storage unavailable: {reason}")]
    Unavailable {
        /// Underlying failure.
        reason: String,
    },

    /// The persisted payload could not be parsed.
    #[error("stored drafts are corrupt: {reason}")]
    Corrupt {
        /// Parser message.
        reason: String,
    },

    /// A draft could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Another process has the draft file open.
    #[error("draft file {} is in use by another process", path.display())]
    Locked {
        /// The collection file.
        path: PathBuf,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable {
            reason: err.to_string(),
        }
    }
}

/// Errors returned by queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Input rejected before persistence.
    #[error("invalid draft: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No draft with this id.
    #[error("draft not found: {id}")]
    NotFound {
        /// The missing draft.
        id: DraftId,
    },

    /// The draft has an attempt in flight (or is being edited).
    #[error("draft {id} is being synchronized")]
    DraftInFlight {
        /// The busy draft.
        id: DraftId,
    },

    /// The draft is synced and can no longer be edited.
    #[error("draft {id} is already synced")]
    AlreadySynced {
        /// The synced draft.
        id: DraftId,
    },

    /// Lifecycle refused a transition.
    #[error("lifecycle error: {0}")]
    Transition(#[from] TransitionError),

    /// The attempt ended without producing an outcome.
    #[error("sync attempt for {id} ended without an outcome")]
    Interrupted {
        /// The affected draft.
        id: DraftId,
    },
}
