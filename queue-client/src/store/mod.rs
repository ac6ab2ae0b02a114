//! Durable local persistence of drafts.
//!
//! # Design
//!
//! The store is a keyed collection of [`Draft`] records:
//! - `list()` returns every draft, oldest first
//! - `get()` looks one up by id
//! - `save()` inserts or replaces by id
//! - `remove()` deletes by id
//!
//! Returned drafts are owned copies. Mutating them has no effect on the
//! store until they are passed back to `save()`.
//!
//! Only the sync coordinator and the queue facade write to the store.

mod file;
mod memory;

pub use file::FileDraftStore;
pub use memory::MemoryDraftStore;

use async_trait::async_trait;
use queue_types::{Draft, DraftId};

use crate::error::StorageError;

/// Trait for draft storage backends.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// All drafts, ordered by creation time.
    async fn list(&self) -> Result<Vec<Draft>, StorageError>;

    /// The draft with this id, if any.
    async fn get(&self, id: &DraftId) -> Result<Option<Draft>, StorageError>;

    /// Insert the draft, or replace the stored draft with the same id.
    async fn save(&self, draft: &Draft) -> Result<(), StorageError>;

    /// Remove a draft.
    ///
    /// Returns `Ok(true)` if removed, `Ok(false)` if not found.
    async fn remove(&self, id: &DraftId) -> Result<bool, StorageError>;
}
