//! Sync scheduling for the draft queue.
//!
//! Drafts are processed strictly in creation order. `created_at` alone is
//! not guaranteed unique for data loaded from disk, so the draft id breaks
//! ties and the order is total.

use queue_types::{Draft, DraftId, SyncState};

/// Sort drafts oldest first.
pub fn sort_by_creation(drafts: &mut [Draft]) {
    drafts.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
}

/// Ids of drafts eligible for a sync pass, oldest first.
///
/// Every draft not yet synced is eligible. A persisted `Syncing` state says
/// nothing about whether an attempt still owns the draft, so those are
/// included and the caller decides.
pub fn sync_order(drafts: &[Draft]) -> Vec<DraftId> {
    let mut eligible: Vec<&Draft> = drafts
        .iter()
        .filter(|d| !matches!(d.sync_state, SyncState::Synced { .. }))
        .collect();
    eligible.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    eligible.into_iter().map(|d| d.id).collect()
}

/// Number of drafts not yet confirmed by the server.
pub fn pending_count(drafts: &[Draft]) -> usize {
    drafts.iter().filter(|d| d.is_pending()).count()
}
