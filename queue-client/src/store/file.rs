//! JSON file draft store.
//!
//! The whole collection lives in one file as a JSON array of plain draft
//! records. Every mutation is a read-modify-write of that file, serialized
//! by an async lock, and lands atomically: the new collection is written to
//! a sibling temp file, fsynced, then renamed over the original.
//!
//! A file that cannot be parsed when the store is opened is moved aside to
//! `<path>.corrupt` and the store starts empty, with a warning. After that,
//! a parse failure is an error like any other.
//!
//! The async lock only covers one process. Across processes, an open store
//! holds an exclusive advisory lock on `<path>.lock` until it is dropped; a
//! second opener waits for it and gives up with `StorageError::Locked`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use queue_core::schedule::sort_by_creation;
use queue_types::{Draft, DraftId};
use tokio::io::AsyncWriteExt;

use super::DraftStore;
use crate::error::StorageError;

/// How long [`FileDraftStore::open`] waits for the file lock.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Draft store backed by a JSON file.
#[derive(Debug)]
pub struct FileDraftStore {
    /// Path to the collection file.
    path: PathBuf,
    /// Held for the store's lifetime; unlocked on close.
    _lock: std::fs::File,
    /// Serializes read-modify-write cycles.
    write_lock: tokio::sync::Mutex<()>,
    /// Set when a corrupt file was discarded on open.
    load_warning: Mutex<Option<String>>,
}

impl FileDraftStore {
    /// Open (or create) the store at `path`, waiting up to
    /// [`DEFAULT_LOCK_WAIT`] for another process to let go of it.
    ///
    /// # Errors
    ///
    /// See [`FileDraftStore::open_with_lock_wait`].
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_lock_wait(path, DEFAULT_LOCK_WAIT).await
    }

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// - `Locked` if another store still holds the file after `lock_wait`
    /// - `Unavailable` if the file or its directory cannot be accessed
    ///
    /// An unparseable file is not an error here.
    pub async fn open_with_lock_wait(
        path: &Path,
        lock_wait: Duration,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let lock = acquire_lock(path, lock_wait).await?;

        let store = Self {
            path: path.to_path_buf(),
            _lock: lock,
            write_lock: tokio::sync::Mutex::new(()),
            load_warning: Mutex::new(None),
        };

        match store.read_collection().await {
            Ok(drafts) => {
                tracing::debug!(path = %path.display(), count = drafts.len(), "Opened draft store");
            }
            Err(StorageError::Corrupt { reason }) => {
                let aside = store.corrupt_path();
                tokio::fs::rename(&store.path, &aside).await?;
                let warning = format!(
                    "discarded unreadable draft file (moved to {}): {}",
                    aside.display(),
                    reason
                );
                tracing::warn!(path = %path.display(), "{}", warning);
                *store
                    .load_warning
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(warning);
            }
            Err(e) => return Err(e),
        }

        Ok(store)
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Warning produced if a corrupt file was discarded on open.
    pub fn load_warning(&self) -> Option<String> {
        self.load_warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn corrupt_path(&self) -> PathBuf {
        sibling(&self.path, "corrupt")
    }

    async fn read_collection(&self) -> Result<Vec<Draft>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            reason: e.to_string(),
        })
    }

    async fn write_collection(&self, drafts: &[Draft]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(drafts)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp = sibling(&self.path, "tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn list(&self) -> Result<Vec<Draft>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.read_collection().await?;
        sort_by_creation(&mut drafts);
        Ok(drafts)
    }

    async fn get(&self, id: &DraftId) -> Result<Option<Draft>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let drafts = self.read_collection().await?;
        Ok(drafts.into_iter().find(|d| d.id == *id))
    }

    async fn save(&self, draft: &Draft) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.read_collection().await?;
        match drafts.iter_mut().find(|d| d.id == draft.id) {
            Some(existing) => *existing = draft.clone(),
            None => drafts.push(draft.clone()),
        }
        self.write_collection(&drafts).await
    }

    async fn remove(&self, id: &DraftId) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.read_collection().await?;
        let before = drafts.len();
        drafts.retain(|d| d.id != *id);
        if drafts.len() == before {
            return Ok(false);
        }
        self.write_collection(&drafts).await?;
        Ok(true)
    }
}

/// Take the exclusive lock beside `path`, retrying until `wait` runs out.
async fn acquire_lock(path: &Path, wait: Duration) -> Result<std::fs::File, StorageError> {
    use fs2::FileExt;

    let lock_path = sibling(path, "lock");
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .await?
        .into_std()
        .await;

    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {}
            Err(e) => return Err(e.into()),
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(path = %lock_path.display(), "Draft file locked, waiting");
        tokio::time::sleep(LOCK_RETRY).await;
    }
}

/// `drafts.json` -> `drafts.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
