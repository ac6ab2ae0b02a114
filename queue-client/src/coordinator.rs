//! Sync coordinator.
//!
//! Drives drafts through the lifecycle against the remote API and writes
//! every transition through to the store.
//!
//! # Guarantees
//!
//! - **Single-flight**: each draft id has at most one claim. A sync call
//!   for an id that already has an attempt running attaches to it and gets
//!   the same outcome; no second request is sent.
//! - **One request at a time**: every remote call goes through one gate, so
//!   no two requests from this coordinator overlap.
//! - **Ordering**: `sync_all` walks eligible drafts oldest first, one after
//!   the other.
//! - **No implicit retries**: a failed attempt records the error and stops.
//! - **Not cancellable**: attempts run on their own task. Dropping the
//!   caller's future does not stop the attempt or its write-back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use queue_core::lifecycle::{self, DraftEvent};
use queue_core::sync_order;
use queue_types::{CreateLeadRequest, Draft, DraftId, RemoteId, SyncState, Timestamp};
use serde::Serialize;
use tokio::sync::watch;

use crate::api::LeadApi;
use crate::error::QueueError;
use crate::store::DraftStore;

/// Outcome of one draft's synchronization.
///
/// Remote failures are data: they land here, not in `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncResult {
    /// The server holds the lead.
    Synced {
        /// The draft.
        id: DraftId,
        /// Server-assigned identifier.
        #[serde(rename = "remoteId")]
        remote_id: RemoteId,
    },
    /// The attempt failed; the draft is in `Error` and can be retried.
    Failed {
        /// The draft.
        id: DraftId,
        /// What went wrong.
        error: String,
    },
}

impl SyncResult {
    /// Whether the draft is synced.
    pub fn is_ok(&self) -> bool {
        matches!(self, SyncResult::Synced { .. })
    }

    /// The draft this result is for.
    pub fn id(&self) -> DraftId {
        match self {
            SyncResult::Synced { id, .. } | SyncResult::Failed { id, .. } => *id,
        }
    }

    /// Remote identifier, if synced.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            SyncResult::Synced { remote_id, .. } => Some(remote_id),
            SyncResult::Failed { .. } => None,
        }
    }

    /// Error message, if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            SyncResult::Failed { error, .. } => Some(error),
            SyncResult::Synced { .. } => None,
        }
    }
}

type Outcome = Result<SyncResult, QueueError>;

/// What currently holds a draft id.
enum Claim {
    /// A sync attempt; waiters watch for its outcome.
    Sync(watch::Receiver<Option<Outcome>>),
    /// A delete or edit.
    Edit,
}

struct Inner<S, A> {
    store: S,
    api: A,
    claims: Mutex<HashMap<DraftId, Claim>>,
    /// Held for the duration of each remote call.
    network: tokio::sync::Mutex<()>,
    /// Bumped after every store write.
    revision: watch::Sender<u64>,
    prune_synced: bool,
}

impl<S, A> Inner<S, A> {
    fn lock_claims(&self) -> MutexGuard<'_, HashMap<DraftId, Claim>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

/// Coordinates draft synchronization.
///
/// Cheap to clone; clones share claims, the network gate and the store.
pub struct SyncCoordinator<S, A> {
    inner: Arc<Inner<S, A>>,
}

impl<S, A> Clone for SyncCoordinator<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> SyncCoordinator<S, A>
where
    S: DraftStore + 'static,
    A: LeadApi,
{
    /// Create a coordinator over a store and an API.
    pub fn new(store: S, api: A) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                store,
                api,
                claims: Mutex::new(HashMap::new()),
                network: tokio::sync::Mutex::new(()),
                revision,
                prune_synced: false,
            }),
        }
    }

    /// Remove drafts from the store as soon as they sync.
    ///
    /// Must be called before the coordinator is cloned.
    pub fn with_prune_synced(mut self, prune: bool) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.prune_synced = prune,
            None => tracing::warn!("prune_synced ignored: coordinator already shared"),
        }
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Receiver bumped after every write this coordinator makes.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Current write revision.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Tell subscribers the store changed.
    pub(crate) fn notify(&self) {
        self.inner.notify();
    }

    /// Persist a new or edited draft and notify subscribers.
    pub(crate) async fn write(&self, draft: &Draft) -> Result<(), QueueError> {
        self.inner.store.save(draft).await?;
        self.notify();
        Ok(())
    }

    /// Whether an attempt or edit currently holds this id.
    pub fn is_claimed(&self, id: &DraftId) -> bool {
        self.inner.lock_claims().contains_key(id)
    }

    /// Synchronize one draft.
    ///
    /// A synced draft returns its recorded remote id without a request. If
    /// an attempt for `id` is already running, this waits for its outcome
    /// instead of starting another.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such draft exists
    /// - `DraftInFlight` if the draft is being deleted or edited
    /// - `Storage` if a state write-back fails
    pub async fn sync_draft(&self, id: DraftId) -> Result<SyncResult, QueueError> {
        let mut outcome = self.claim_sync(id)?;
        let done = outcome
            .wait_for(Option::is_some)
            .await
            .map(|done| (*done).clone());
        match done {
            Ok(Some(result)) => result,
            // The attempt task went away without reporting
            _ => Err(QueueError::Interrupted { id }),
        }
    }

    /// Synchronize every draft not yet synced, oldest first.
    ///
    /// A draft with a running attempt is waited on, not resent. A draft
    /// persisted as `Syncing` with no attempt behind it (its write-back
    /// failed) is recovered and sent again. Drafts deleted or claimed by an
    /// edit while the pass runs are skipped. Remote failures do not stop
    /// the pass.
    ///
    /// # Errors
    ///
    /// Stops at the first storage error.
    pub async fn sync_all(&self) -> Result<Vec<SyncResult>, QueueError> {
        let drafts = self.inner.store.list().await?;
        let order = sync_order(&drafts);
        if order.is_empty() {
            tracing::debug!("Sync pass: nothing to do");
            return Ok(Vec::new());
        }

        tracing::info!("Sync pass starting for {} drafts", order.len());
        let mut results = Vec::with_capacity(order.len());
        for id in order {
            match self.sync_draft(id).await {
                Ok(result) => results.push(result),
                Err(QueueError::NotFound { .. } | QueueError::DraftInFlight { .. }) => {
                    tracing::debug!("Sync pass skipping {}", id);
                }
                Err(e) => return Err(e),
            }
        }

        let synced = results.iter().filter(|r| r.is_ok()).count();
        tracing::info!(
            "Sync pass finished: {} synced, {} failed",
            synced,
            results.len() - synced
        );
        Ok(results)
    }

    /// Turn drafts left in `Syncing` by an earlier process into errors.
    ///
    /// Drafts with a live claim are left alone. Returns how many were
    /// recovered.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store cannot be read or written.
    pub async fn recover_interrupted(&self) -> Result<usize, QueueError> {
        let mut recovered = 0;
        for mut draft in self.inner.store.list().await? {
            if !draft.is_syncing() || self.is_claimed(&draft.id) {
                continue;
            }
            lifecycle::apply(&mut draft, DraftEvent::Interrupted, Timestamp::now())?;
            self.inner.store.save(&draft).await?;
            tracing::warn!(
                "Draft {} was syncing when the queue stopped; marked as error",
                draft.id
            );
            recovered += 1;
        }
        if recovered > 0 {
            self.notify();
        }
        Ok(recovered)
    }

    /// Take an exclusive edit claim on `id`.
    ///
    /// # Errors
    ///
    /// Returns `DraftInFlight` if anything else holds the id.
    pub(crate) fn claim_edit(&self, id: DraftId) -> Result<EditClaim<S, A>, QueueError> {
        let mut claims = self.inner.lock_claims();
        if claims.contains_key(&id) {
            return Err(QueueError::DraftInFlight { id });
        }
        claims.insert(id, Claim::Edit);
        Ok(EditClaim {
            inner: Arc::clone(&self.inner),
            id,
        })
    }

    fn claim_sync(&self, id: DraftId) -> Result<watch::Receiver<Option<Outcome>>, QueueError> {
        let mut claims = self.inner.lock_claims();
        match claims.get(&id) {
            Some(Claim::Sync(outcome)) => {
                tracing::debug!("Attaching to in-flight attempt for {}", id);
                return Ok(outcome.clone());
            }
            Some(Claim::Edit) => return Err(QueueError::DraftInFlight { id }),
            None => {}
        }

        let (tx, rx) = watch::channel(None);
        claims.insert(id, Claim::Sync(rx.clone()));
        drop(claims);

        let mut guard = SyncClaim {
            inner: Arc::clone(&self.inner),
            id,
            armed: true,
        };
        tokio::spawn(async move {
            let outcome = attempt(&guard.inner, id).await;
            // Release before publishing so a follow-up call starts fresh
            guard.release();
            tx.send_replace(Some(outcome));
        });

        Ok(rx)
    }
}

/// One attempt: claim already held by the caller.
async fn attempt<S: DraftStore, A: LeadApi>(
    inner: &Inner<S, A>,
    id: DraftId,
) -> Result<SyncResult, QueueError> {
    let Some(mut draft) = inner.store.get(&id).await? else {
        return Err(QueueError::NotFound { id });
    };

    if let SyncState::Synced { remote_id } = &draft.sync_state {
        tracing::debug!("Draft {} already synced as {}", id, remote_id);
        return Ok(SyncResult::Synced {
            id,
            remote_id: remote_id.clone(),
        });
    }

    let response = {
        let _gate = inner.network.lock().await;

        if draft.is_syncing() {
            // The claim is ours, so whatever wrote this state is gone
            lifecycle::apply(&mut draft, DraftEvent::Interrupted, Timestamp::now())?;
        }
        lifecycle::apply(&mut draft, DraftEvent::AttemptStarted, Timestamp::now())?;
        inner.store.save(&draft).await?;
        inner.notify();

        tracing::debug!("Sending draft {} (attempt {})", id, draft.attempts);
        inner
            .api
            .create_lead(&CreateLeadRequest::from_draft(&draft))
            .await
    };

    let result = match response {
        Ok(remote_id) => {
            tracing::info!("Draft {} synced as {}", id, remote_id);
            lifecycle::apply(
                &mut draft,
                DraftEvent::RemoteConfirmed {
                    remote_id: remote_id.clone(),
                },
                Timestamp::now(),
            )?;
            SyncResult::Synced { id, remote_id }
        }
        Err(e) => {
            tracing::warn!(
                connectivity = e.is_connectivity(),
                "Draft {} failed to sync: {}",
                id,
                e
            );
            let message = e.to_string();
            lifecycle::apply(
                &mut draft,
                DraftEvent::RemoteFailed {
                    message: message.clone(),
                },
                Timestamp::now(),
            )?;
            SyncResult::Failed { id, error: message }
        }
    };

    if inner.prune_synced && result.is_ok() {
        inner.store.remove(&id).await?;
        tracing::debug!("Pruned synced draft {}", id);
    } else {
        inner.store.save(&draft).await?;
    }
    inner.notify();

    Ok(result)
}

/// Sync claim held by the attempt task.
///
/// Released explicitly on completion; dropped unreleased if the task is
/// aborted or panics, which wakes waiters with `Interrupted`.
struct SyncClaim<S, A> {
    inner: Arc<Inner<S, A>>,
    id: DraftId,
    armed: bool,
}

impl<S, A> SyncClaim<S, A> {
    fn release(&mut self) {
        if self.armed {
            self.armed = false;
            self.inner.lock_claims().remove(&self.id);
        }
    }
}

impl<S, A> Drop for SyncClaim<S, A> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Exclusive claim for deleting or editing a draft.
///
/// The id is released when this is dropped.
pub(crate) struct EditClaim<S, A> {
    inner: Arc<Inner<S, A>>,
    id: DraftId,
}

impl<S, A> Drop for EditClaim<S, A> {
    fn drop(&mut self) {
        self.inner.lock_claims().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockLeadApi, RemoteError};
    use crate::error::StorageError;
    use crate::store::MemoryDraftStore;
    use queue_types::{CustomerRef, DraftInput, LineItem};

    fn coordinator() -> (
        SyncCoordinator<MemoryDraftStore, MockLeadApi>,
        MemoryDraftStore,
        MockLeadApi,
    ) {
        let store = MemoryDraftStore::new();
        let api = MockLeadApi::new();
        (SyncCoordinator::new(store.clone(), api.clone()), store, api)
    }

    async fn seed(store: &MemoryDraftStore, created_at: u64) -> Draft {
        let draft = Draft::new(
            DraftInput::new(CustomerRef::named("Acme")).with_item(LineItem::new("X", 2, 10.0)),
            Timestamp::from_millis(created_at),
        );
        store.save(&draft).await.unwrap();
        draft
    }

    async fn stored(store: &MemoryDraftStore, id: DraftId) -> Draft {
        store.get(&id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn success_records_remote_id() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.queue_success("555");

        let result = coord.sync_draft(draft.id).await.unwrap();

        assert_eq!(result.remote_id().map(RemoteId::as_str), Some("555"));
        let after = stored(&store, draft.id).await;
        assert_eq!(after.remote_id().map(RemoteId::as_str), Some("555"));
        assert_eq!(after.attempts, 1);
        assert!(!coord.is_claimed(&draft.id));
    }

    #[tokio::test]
    async fn failure_is_data_not_error() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.queue_failure(RemoteError::Server {
            status: 500,
            message: "boom".into(),
        });

        let result = coord.sync_draft(draft.id).await.unwrap();

        assert!(!result.is_ok());
        assert_eq!(result.error(), Some("server error (500): boom"));
        let after = stored(&store, draft.id).await;
        assert_eq!(after.last_error(), Some("server error (500): boom"));
    }

    #[tokio::test]
    async fn synced_draft_is_not_resent() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.queue_success("555");
        coord.sync_draft(draft.id).await.unwrap();

        let again = coord.sync_draft(draft.id).await.unwrap();

        assert_eq!(again.remote_id().map(RemoteId::as_str), Some("555"));
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_draft_is_not_found() {
        let (coord, _store, api) = coordinator();
        let id = DraftId::new();

        let err = coord.sync_draft(id).await.unwrap_err();

        assert_eq!(err, QueueError::NotFound { id });
        assert_eq!(api.request_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_request() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.queue_success("555");

        let (a, b) = tokio::join!(coord.sync_draft(draft.id), coord.sync_draft(draft.id));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn retry_after_failure_sends_again() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.queue_failure(RemoteError::Timeout);
        api.queue_success("777");

        assert!(!coord.sync_draft(draft.id).await.unwrap().is_ok());
        assert!(coord.sync_draft(draft.id).await.unwrap().is_ok());

        assert_eq!(api.request_count(), 2);
        assert_eq!(stored(&store, draft.id).await.attempts, 2);
    }

    #[tokio::test]
    async fn sync_all_runs_oldest_first_and_skips_synced() {
        let (coord, store, api) = coordinator();
        let late = seed(&store, 20).await;
        let early = seed(&store, 10).await;
        let mut done = seed(&store, 5).await;
        done.sync_state = SyncState::Synced {
            remote_id: RemoteId::new("1"),
        };
        store.save(&done).await.unwrap();

        let results = coord.sync_all().await.unwrap();

        let order: Vec<DraftId> = api.requests().iter().map(|r| r.client_reference).collect();
        assert_eq!(order, vec![early.id, late.id]);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn sync_all_continues_past_failures() {
        let (coord, store, api) = coordinator();
        seed(&store, 1).await;
        seed(&store, 2).await;
        api.queue_failure(RemoteError::Network("reset".into()));

        let results = coord.sync_all().await.unwrap();

        assert!(!results[0].is_ok());
        assert!(results[1].is_ok());
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        store.fail_writes(Some("disk full"));

        let err = coord.sync_draft(draft.id).await.unwrap_err();

        assert!(matches!(
            err,
            QueueError::Storage(StorageError::Unavailable { .. })
        ));
        assert_eq!(api.request_count(), 0);
        assert!(!coord.is_claimed(&draft.id));
    }

    #[tokio::test]
    async fn edit_claim_blocks_sync() {
        let (coord, store, _api) = coordinator();
        let draft = seed(&store, 1).await;

        let claim = coord.claim_edit(draft.id).unwrap();
        let err = coord.sync_draft(draft.id).await.unwrap_err();
        assert_eq!(err, QueueError::DraftInFlight { id: draft.id });

        drop(claim);
        assert!(coord.sync_draft(draft.id).await.is_ok());
    }

    #[tokio::test]
    async fn in_flight_attempt_blocks_edit_claim() {
        let (coord, store, api) = coordinator();
        let draft = seed(&store, 1).await;
        api.pause();

        let pending = tokio::spawn({
            let coord = coord.clone();
            async move { coord.sync_draft(draft.id).await }
        });
        while api.request_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(stored(&store, draft.id).await.is_syncing());
        assert!(matches!(
            coord.claim_edit(draft.id),
            Err(QueueError::DraftInFlight { .. })
        ));

        api.resume();
        pending.await.unwrap().unwrap();
        assert!(coord.claim_edit(draft.id).is_ok());
    }

    #[tokio::test]
    async fn stale_syncing_state_is_recovered() {
        let (coord, store, api) = coordinator();
        let mut draft = seed(&store, 1).await;
        draft.sync_state = SyncState::Syncing;
        store.save(&draft).await.unwrap();

        assert_eq!(coord.recover_interrupted().await.unwrap(), 1);

        let after = stored(&store, draft.id).await;
        assert_eq!(after.last_error(), Some(lifecycle::INTERRUPTED_MESSAGE));
        assert_eq!(api.request_count(), 0);

        // Retryable
        assert!(coord.sync_draft(draft.id).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn prune_synced_removes_draft() {
        let store = MemoryDraftStore::new();
        let api = MockLeadApi::new();
        let coord = SyncCoordinator::new(store.clone(), api.clone()).with_prune_synced(true);
        let draft = seed(&store, 1).await;

        assert!(coord.sync_draft(draft.id).await.unwrap().is_ok());

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn writes_bump_revision() {
        let (coord, store, _api) = coordinator();
        let draft = seed(&store, 1).await;
        let rx = coord.subscribe_changes();

        coord.sync_draft(draft.id).await.unwrap();

        // Syncing, then Synced
        assert_eq!(*rx.borrow(), 2);
    }

    #[test]
    fn sync_result_serializes_with_status_tag() {
        let id = DraftId::new();
        let json = serde_json::to_value(SyncResult::Synced {
            id,
            remote_id: RemoteId::new("555"),
        })
        .unwrap();

        assert_eq!(json["status"], "synced");
        assert_eq!(json["remoteId"], "555");
    }
}
