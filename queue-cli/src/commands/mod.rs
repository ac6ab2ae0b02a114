//! CLI command implementations.

pub mod create;
pub mod delete;
pub mod list;
pub mod prune;
pub mod status;
pub mod sync;
pub mod watch;

use queue_client::{Draft, SyncResult, SyncState};

/// One-line summary of a draft's sync state.
pub fn describe_state(state: &SyncState) -> String {
    match state {
        SyncState::Pending => "pending".to_string(),
        SyncState::Syncing => "syncing".to_string(),
        SyncState::Synced { remote_id } => format!("synced ({})", remote_id),
        SyncState::Error { message } => format!("error: {}", message),
    }
}

/// One-line summary of a sync outcome.
pub fn describe_result(result: &SyncResult) -> String {
    match result {
        SyncResult::Synced { id, remote_id } => format!("{}  synced as {}", id, remote_id),
        SyncResult::Failed { id, error } => format!("{}  FAILED: {}", id, error),
    }
}

/// Sum of quantity * unit price over a draft's items.
pub fn draft_total(draft: &Draft) -> f64 {
    draft
        .items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum()
}
