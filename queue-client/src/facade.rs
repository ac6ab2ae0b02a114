//! The queue surface the application uses.
//!
//! [`QueueFacade`] owns a coordinator, a connectivity monitor and the
//! creation clock. It exposes the draft list, the pending count and the
//! offline flag, both on demand and as a [`QueueSnapshot`] that subscribers
//! are woken for whenever any of them change.
//!
//! # Example
//!
//! ```ignore
//! let queue = QueueFacade::open(store, api, monitor, &config.sync).await?;
//! let draft = queue.create_draft(input).await?;
//! let result = queue.sync_draft(draft.id).await?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use queue_core::lifecycle::{self, is_editable, DraftEvent};
use queue_core::{pending_count, validate_input, CreationClock};
use queue_types::{Draft, DraftId, DraftInput, SyncState, Timestamp};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::LeadApi;
use crate::config::SyncSettings;
use crate::connectivity::ConnectivityMonitor;
use crate::coordinator::{SyncCoordinator, SyncResult};
use crate::error::QueueError;
use crate::store::DraftStore;

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueSnapshot {
    /// All drafts, oldest first.
    pub drafts: Vec<Draft>,
    /// Drafts not yet synced.
    pub pending_count: usize,
    /// Debounced connectivity.
    pub is_offline: bool,
    /// Coordinator revision the draft list was read at.
    revision: u64,
}

impl QueueSnapshot {
    fn new(drafts: Vec<Draft>, is_offline: bool, revision: u64) -> Self {
        Self {
            pending_count: pending_count(&drafts),
            drafts,
            is_offline,
            revision,
        }
    }
}

/// Offline draft queue.
///
/// Background tasks (snapshot refresh, sync on reconnect) are aborted and
/// the monitor is stopped when the facade is dropped.
pub struct QueueFacade<S, A, M: ConnectivityMonitor> {
    coordinator: SyncCoordinator<S, A>,
    monitor: M,
    clock: Mutex<CreationClock>,
    snapshot: Arc<watch::Sender<QueueSnapshot>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, A, M> QueueFacade<S, A, M>
where
    S: DraftStore + 'static,
    A: LeadApi,
    M: ConnectivityMonitor,
{
    /// Open the queue.
    ///
    /// Recovers drafts left mid-sync by an earlier process, starts the
    /// monitor and the snapshot refresher, and, if enabled, syncs pending
    /// drafts on every offline to online transition. Must be called inside
    /// a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store cannot be read or the recovery
    /// write-back fails.
    pub async fn open(
        store: S,
        api: A,
        monitor: M,
        settings: &SyncSettings,
    ) -> Result<Self, QueueError> {
        let coordinator = SyncCoordinator::new(store, api).with_prune_synced(settings.prune_synced);

        let recovered = coordinator.recover_interrupted().await?;
        let drafts = coordinator.store().list().await?;
        let clock = match drafts.iter().map(|d| d.created_at).max() {
            Some(last) => CreationClock::resume_after(last),
            None => CreationClock::new(),
        };

        monitor.start();
        let initial = QueueSnapshot::new(drafts, monitor.is_offline(), coordinator.revision());
        tracing::info!(
            "Draft queue opened: {} drafts, {} pending, {} recovered",
            initial.drafts.len(),
            initial.pending_count,
            recovered
        );
        let (snapshot, _) = watch::channel(initial);

        let facade = Self {
            coordinator,
            monitor,
            clock: Mutex::new(clock),
            snapshot: Arc::new(snapshot),
            tasks: Mutex::new(Vec::new()),
        };
        facade.spawn_refresher();
        if settings.sync_on_reconnect {
            facade.spawn_auto_sync();
        }
        Ok(facade)
    }

    /// All drafts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store cannot be read.
    pub async fn drafts(&self) -> Result<Vec<Draft>, QueueError> {
        Ok(self.coordinator.store().list().await?)
    }

    /// One draft by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store cannot be read.
    pub async fn draft(&self, id: DraftId) -> Result<Option<Draft>, QueueError> {
        Ok(self.coordinator.store().get(&id).await?)
    }

    /// Number of drafts not in `Synced`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store cannot be read.
    pub async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(pending_count(&self.drafts().await?))
    }

    /// Debounced connectivity.
    pub fn is_offline(&self) -> bool {
        self.monitor.is_offline()
    }

    /// The connectivity monitor.
    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver woken on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot.subscribe()
    }

    /// Validate, stamp and persist a new draft in `Pending`.
    ///
    /// Works offline. Creation times are strictly increasing within a
    /// queue, so sync order always matches creation order.
    ///
    /// # Errors
    ///
    /// - `Validation` if the input is incomplete; nothing is stored
    /// - `Storage` if the draft cannot be persisted
    pub async fn create_draft(&self, input: DraftInput) -> Result<Draft, QueueError> {
        validate_input(&input)?;

        let created_at = self.lock_clock().stamp(Timestamp::now());
        let draft = Draft::new(input, created_at);
        self.coordinator.write(&draft).await?;

        tracing::info!("Draft {} created with {} items", draft.id, draft.items.len());
        self.refresh().await;
        Ok(draft)
    }

    /// Replace the customer and items of a draft that has not synced.
    ///
    /// # Errors
    ///
    /// - `Validation` if the input is incomplete
    /// - `NotFound` if no such draft exists
    /// - `DraftInFlight` if an attempt is running
    /// - `AlreadySynced` if the draft is synced
    /// - `Storage` on persistence failure
    pub async fn update_draft(&self, id: DraftId, input: DraftInput) -> Result<Draft, QueueError> {
        validate_input(&input)?;
        let _claim = self.coordinator.claim_edit(id)?;

        let mut draft = self
            .coordinator
            .store()
            .get(&id)
            .await?
            .ok_or(QueueError::NotFound { id })?;
        if draft.is_syncing() {
            // Holding the claim means no attempt owns this state
            lifecycle::apply(&mut draft, DraftEvent::Interrupted, Timestamp::now())?;
        }
        if !is_editable(&draft.sync_state) {
            return Err(QueueError::AlreadySynced { id });
        }

        draft.customer = input.customer;
        draft.items = input.items;
        draft.updated_at = Timestamp::now().max(draft.created_at);
        self.coordinator.write(&draft).await?;

        tracing::info!("Draft {} updated", id);
        self.refresh().await;
        Ok(draft)
    }

    /// Synchronize one draft.
    ///
    /// See [`SyncCoordinator::sync_draft`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `DraftInFlight` (edit or delete in progress) or
    /// `Storage`. Remote failures are returned as `SyncResult::Failed`.
    pub async fn sync_draft(&self, id: DraftId) -> Result<SyncResult, QueueError> {
        let result = self.coordinator.sync_draft(id).await;
        self.refresh().await;
        result
    }

    /// Synchronize every pending or failed draft, oldest first.
    ///
    /// # Errors
    ///
    /// Stops at the first storage error.
    pub async fn sync_all(&self) -> Result<Vec<SyncResult>, QueueError> {
        let results = self.coordinator.sync_all().await;
        self.refresh().await;
        results
    }

    /// Delete a draft.
    ///
    /// Rejected without touching the store while an attempt for the draft
    /// is in flight. A draft left in `Syncing` by an attempt that is no
    /// longer running can be deleted.
    ///
    /// # Errors
    ///
    /// - `DraftInFlight` if an attempt or edit holds the draft
    /// - `NotFound` if no such draft exists
    /// - `Storage` on persistence failure
    pub async fn delete_draft(&self, id: DraftId) -> Result<(), QueueError> {
        let _claim = self.coordinator.claim_edit(id)?;

        if !self.coordinator.store().remove(&id).await? {
            return Err(QueueError::NotFound { id });
        }
        self.coordinator.notify();

        tracing::info!("Draft {} deleted", id);
        self.refresh().await;
        Ok(())
    }

    /// Remove every synced draft from the store.
    ///
    /// Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub async fn prune_synced(&self) -> Result<usize, QueueError> {
        let store = self.coordinator.store();
        let mut removed = 0;
        for draft in store.list().await? {
            if !matches!(draft.sync_state, SyncState::Synced { .. }) {
                continue;
            }
            let Ok(_claim) = self.coordinator.claim_edit(draft.id) else {
                continue;
            };
            if store.remove(&draft.id).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            self.coordinator.notify();
            tracing::info!("Pruned {} synced drafts", removed);
            self.refresh().await;
        }
        Ok(removed)
    }

    /// Stop background work. Drafts and pending attempts are unaffected.
    pub fn shutdown(&self) {
        for handle in self.lock_tasks().drain(..) {
            handle.abort();
        }
        self.monitor.stop();
    }

    async fn refresh(&self) {
        refresh_drafts(&self.coordinator, &self.snapshot).await;
    }

    /// Keep the snapshot current for writes the facade did not make
    /// (reconnect syncs, attempts whose caller went away) and for
    /// connectivity changes.
    fn spawn_refresher(&self) {
        let coordinator = self.coordinator.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let mut changes = coordinator.subscribe_changes();
        let mut offline = self.monitor.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        changes.borrow_and_update();
                        refresh_drafts(&coordinator, &snapshot).await;
                    }
                    changed = offline.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let is_offline = *offline.borrow_and_update();
                        snapshot.send_if_modified(|snap| {
                            let changed = snap.is_offline != is_offline;
                            snap.is_offline = is_offline;
                            changed
                        });
                    }
                }
            }
        });
        self.lock_tasks().push(handle);
    }

    /// Run one sync pass on every offline to online transition.
    fn spawn_auto_sync(&self) {
        let coordinator = self.coordinator.clone();
        let mut offline = self.monitor.subscribe();
        // Read before spawning: a change published before the task first
        // runs must still count as a transition
        let mut was_offline = *offline.borrow_and_update();

        let handle = tokio::spawn(async move {
            while offline.changed().await.is_ok() {
                let is_offline = *offline.borrow_and_update();
                if was_offline && !is_offline {
                    tracing::info!("Connectivity restored, syncing pending drafts");
                    match coordinator.sync_all().await {
                        Ok(results) => {
                            let synced = results.iter().filter(|r| r.is_ok()).count();
                            tracing::debug!(
                                "Reconnect sync: {} of {} synced",
                                synced,
                                results.len()
                            );
                        }
                        Err(e) => tracing::warn!("Reconnect sync failed: {}", e),
                    }
                }
                was_offline = is_offline;
            }
        });
        self.lock_tasks().push(handle);
    }

    fn lock_clock(&self) -> MutexGuard<'_, CreationClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, A, M: ConnectivityMonitor> Drop for QueueFacade<S, A, M> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in tasks.drain(..) {
            handle.abort();
        }
        self.monitor.stop();
    }
}

/// Re-read the store and publish, unless a newer read already landed.
async fn refresh_drafts<S, A>(
    coordinator: &SyncCoordinator<S, A>,
    snapshot: &watch::Sender<QueueSnapshot>,
) where
    S: DraftStore + 'static,
    A: LeadApi,
{
    let revision = coordinator.revision();
    let drafts = match coordinator.store().list().await {
        Ok(drafts) => drafts,
        Err(e) => {
            tracing::warn!("Could not refresh draft snapshot: {}", e);
            return;
        }
    };

    snapshot.send_if_modified(|snap| {
        if revision < snap.revision {
            return false;
        }
        let next = QueueSnapshot::new(drafts, snap.is_offline, revision);
        let changed = *snap != next;
        *snap = next;
        changed
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockLeadApi, RemoteError};
    use crate::connectivity::ManualMonitor;
    use crate::store::MemoryDraftStore;
    use queue_types::{CustomerRef, LineItem, ValidationError};

    type TestQueue = QueueFacade<MemoryDraftStore, MockLeadApi, ManualMonitor>;

    fn manual_settings() -> SyncSettings {
        SyncSettings {
            sync_on_reconnect: false,
            prune_synced: false,
        }
    }

    async fn open(store: &MemoryDraftStore, api: &MockLeadApi, monitor: &ManualMonitor) -> TestQueue {
        QueueFacade::open(store.clone(), api.clone(), monitor.clone(), &manual_settings())
            .await
            .unwrap()
    }

    fn input() -> DraftInput {
        DraftInput::new(CustomerRef::named("Acme")).with_item(LineItem::new("X", 2, 10.0))
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let store = MemoryDraftStore::new();
        let queue = open(&store, &MockLeadApi::new(), &ManualMonitor::offline()).await;

        let err = queue
            .create_draft(DraftInput::new(CustomerRef::named("  ")))
            .await
            .unwrap_err();

        assert_eq!(err, QueueError::Validation(ValidationError::MissingCustomer));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn creation_times_strictly_increase() {
        let queue = open(
            &MemoryDraftStore::new(),
            &MockLeadApi::new(),
            &ManualMonitor::offline(),
        )
        .await;

        let a = queue.create_draft(input()).await.unwrap();
        let b = queue.create_draft(input()).await.unwrap();

        assert!(b.created_at > a.created_at);
    }

    #[tokio::test]
    async fn clock_resumes_after_stored_drafts() {
        let store = MemoryDraftStore::new();
        let future = Draft::new(input(), Timestamp::from_millis(u64::MAX / 2));
        store.save(&future).await.unwrap();
        let queue = open(&store, &MockLeadApi::new(), &ManualMonitor::offline()).await;

        let draft = queue.create_draft(input()).await.unwrap();

        assert!(draft.created_at > future.created_at);
    }

    #[tokio::test]
    async fn update_replaces_items() {
        let queue = open(
            &MemoryDraftStore::new(),
            &MockLeadApi::new(),
            &ManualMonitor::offline(),
        )
        .await;
        let draft = queue.create_draft(input()).await.unwrap();

        let updated = queue
            .update_draft(
                draft.id,
                DraftInput::new(CustomerRef::remote("c-1")).with_item(LineItem::new("Y", 1, 3.5)),
            )
            .await
            .unwrap();

        assert_eq!(updated.created_at, draft.created_at);
        assert_eq!(updated.items, vec![LineItem::new("Y", 1, 3.5)]);
        assert_eq!(updated.customer, CustomerRef::remote("c-1"));
    }

    #[tokio::test]
    async fn update_rejects_synced_draft() {
        let queue = open(
            &MemoryDraftStore::new(),
            &MockLeadApi::new(),
            &ManualMonitor::online(),
        )
        .await;
        let draft = queue.create_draft(input()).await.unwrap();
        queue.sync_draft(draft.id).await.unwrap();

        let err = queue.update_draft(draft.id, input()).await.unwrap_err();

        assert_eq!(err, QueueError::AlreadySynced { id: draft.id });
    }

    #[tokio::test]
    async fn update_keeps_failed_draft_retryable() {
        let api = MockLeadApi::new();
        let queue = open(&MemoryDraftStore::new(), &api, &ManualMonitor::online()).await;
        let draft = queue.create_draft(input()).await.unwrap();
        api.queue_failure(RemoteError::Rejected {
            status: 422,
            message: "unknown sku".into(),
        });
        queue.sync_draft(draft.id).await.unwrap();

        let fixed = queue.update_draft(draft.id, input()).await.unwrap();
        assert!(fixed.last_error().is_some());

        assert!(queue.sync_draft(draft.id).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn update_recovers_stale_syncing_draft() {
        let store = MemoryDraftStore::new();
        let queue = open(&store, &MockLeadApi::new(), &ManualMonitor::online()).await;
        let mut draft = queue.create_draft(input()).await.unwrap();
        // Written by an attempt whose write-back then failed
        draft.sync_state = SyncState::Syncing;
        store.save(&draft).await.unwrap();

        let updated = queue.update_draft(draft.id, input()).await.unwrap();

        assert_eq!(updated.last_error(), Some(lifecycle::INTERRUPTED_MESSAGE));
        assert!(queue.sync_draft(draft.id).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let queue = open(
            &MemoryDraftStore::new(),
            &MockLeadApi::new(),
            &ManualMonitor::offline(),
        )
        .await;
        let id = DraftId::new();

        assert_eq!(
            queue.delete_draft(id).await.unwrap_err(),
            QueueError::NotFound { id }
        );
    }

    #[tokio::test]
    async fn open_recovers_interrupted_drafts() {
        let store = MemoryDraftStore::new();
        let mut draft = Draft::new(input(), Timestamp::from_millis(1));
        draft.sync_state = SyncState::Syncing;
        store.save(&draft).await.unwrap();

        let queue = open(&store, &MockLeadApi::new(), &ManualMonitor::offline()).await;

        let recovered = queue.draft(draft.id).await.unwrap().unwrap();
        assert!(matches!(recovered.sync_state, SyncState::Error { .. }));
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn prune_removes_only_synced() {
        let queue = open(
            &MemoryDraftStore::new(),
            &MockLeadApi::new(),
            &ManualMonitor::online(),
        )
        .await;
        let synced = queue.create_draft(input()).await.unwrap();
        let pending = queue.create_draft(input()).await.unwrap();
        queue.sync_draft(synced.id).await.unwrap();

        assert_eq!(queue.prune_synced().await.unwrap(), 1);

        let ids: Vec<DraftId> = queue.drafts().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![pending.id]);
    }

    #[tokio::test]
    async fn snapshot_tracks_operations() {
        let monitor = ManualMonitor::offline();
        let queue = open(&MemoryDraftStore::new(), &MockLeadApi::new(), &monitor).await;
        assert!(queue.snapshot().is_offline);

        let draft = queue.create_draft(input()).await.unwrap();
        let snap = queue.snapshot();
        assert_eq!(snap.drafts, vec![draft]);
        assert_eq!(snap.pending_count, 1);
    }

    #[tokio::test]
    async fn reconnect_before_first_poll_still_syncs() {
        let store = MemoryDraftStore::new();
        store
            .save(&Draft::new(input(), Timestamp::from_millis(1)))
            .await
            .unwrap();
        let api = MockLeadApi::new();
        let monitor = ManualMonitor::offline();
        let settings = SyncSettings {
            sync_on_reconnect: true,
            prune_synced: false,
        };
        let queue = QueueFacade::open(store.clone(), api.clone(), monitor.clone(), &settings)
            .await
            .unwrap();

        // No await between open and the transition
        monitor.set_offline(false);

        let mut rx = queue.subscribe();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            rx.wait_for(|s| s.pending_count == 0),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn snapshot_follows_connectivity() {
        let monitor = ManualMonitor::offline();
        let queue = open(&MemoryDraftStore::new(), &MockLeadApi::new(), &monitor).await;
        let mut rx = queue.subscribe();

        monitor.set_offline(false);

        let snap = rx.wait_for(|s| !s.is_offline).await.unwrap().clone();
        assert!(!snap.is_offline);
        assert!(!queue.is_offline());
    }
}
