//! In-memory draft store for testing.
//!
//! Not persistent - all drafts are lost when the store is dropped. Clones
//! share the same collection, so a test can keep a handle for inspection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use queue_core::schedule::sort_by_creation;
use queue_types::{Draft, DraftId};

use super::DraftStore;
use crate::error::StorageError;

/// In-memory draft store.
#[derive(Debug, Default, Clone)]
pub struct MemoryDraftStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    drafts: HashMap<DraftId, Draft>,
    fail_writes: Option<String>,
    write_count: usize,
}

impl MemoryDraftStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drafts stored.
    pub fn len(&self) -> usize {
        self.lock().drafts.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().drafts.is_empty()
    }

    /// Number of successful `save`/`remove` writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// Make every write fail with `StorageError::Unavailable` until cleared.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.lock().fail_writes = reason.map(str::to_string);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(inner: &MemoryInner) -> Result<(), StorageError> {
        match &inner.fail_writes {
            Some(reason) => Err(StorageError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn list(&self) -> Result<Vec<Draft>, StorageError> {
        let mut drafts: Vec<Draft> = self.lock().drafts.values().cloned().collect();
        sort_by_creation(&mut drafts);
        Ok(drafts)
    }

    async fn get(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        Ok(self.lock().drafts.get(id).cloned())
    }

    async fn save(&self, draft: &Draft) -> Result<(), StorageError> {
        let mut inner = self.lock();
        Self::check_writable(&inner)?;
        inner.drafts.insert(draft.id, draft.clone());
        inner.write_count += 1;
        Ok(())
    }

    async fn remove(&self, id: &DraftId) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        Self::check_writable(&inner)?;
        let removed = inner.drafts.remove(id).is_some();
        if removed {
            inner.write_count += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_types::{CustomerRef, DraftInput, LineItem, Timestamp};

    fn make_draft(created_at: u64) -> Draft {
        Draft::new(
            DraftInput::new(CustomerRef::named("Acme")).with_item(LineItem::new("X", 1, 1.0)),
            Timestamp::from_millis(created_at),
        )
    }

    #[tokio::test]
    async fn save_then_get() {
        let store = MemoryDraftStore::new();
        let draft = make_draft(1);

        store.save(&draft).await.unwrap();

        assert_eq!(store.get(&draft.id).await.unwrap(), Some(draft));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = MemoryDraftStore::new();
        assert!(store.get(&DraftId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_by_id() {
        let store = MemoryDraftStore::new();
        let mut draft = make_draft(1);
        store.save(&draft).await.unwrap();

        draft.items.clear();
        store.save(&draft).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(&draft.id).await.unwrap().unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn list_is_oldest_first() {
        let store = MemoryDraftStore::new();
        let late = make_draft(20);
        let early = make_draft(10);
        store.save(&late).await.unwrap();
        store.save(&early).await.unwrap();

        let ids: Vec<DraftId> = store.list().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn returned_drafts_are_copies() {
        let store = MemoryDraftStore::new();
        let draft = make_draft(1);
        store.save(&draft).await.unwrap();

        let mut copy = store.get(&draft.id).await.unwrap().unwrap();
        copy.items.push(LineItem::new("Y", 5, 5.0));

        assert_eq!(store.get(&draft.id).await.unwrap().unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = MemoryDraftStore::new();
        let draft = make_draft(1);
        store.save(&draft).await.unwrap();

        assert!(store.remove(&draft.id).await.unwrap());
        assert!(!store.remove(&draft.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn forced_write_failure() {
        let store = MemoryDraftStore::new();
        store.fail_writes(Some("disk full"));

        let result = store.save(&make_draft(1)).await;
        assert!(matches!(result, Err(StorageError::Unavailable { .. })));
        assert!(store.is_empty());

        store.fail_writes(None);
        store.save(&make_draft(1)).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store1 = MemoryDraftStore::new();
        let store2 = store1.clone();

        store1.save(&make_draft(1)).await.unwrap();

        assert_eq!(store2.len(), 1);
    }
}
