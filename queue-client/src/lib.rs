//! # queue-client
//!
//! Offline lead-draft queue for leadq.
//!
//! This is the library applications use to capture leads while
//! disconnected and reconcile them with the server later.
//!
//! ## Features
//!
//! - **Durable drafts**: JSON file store with atomic writes and corrupt-file
//!   recovery
//! - **Single-flight sync**: at most one attempt per draft, one request at a
//!   time, oldest draft first
//! - **Debounced connectivity**: runtime signals plus API reachability probes
//! - **Pluggable seams**: store, API and monitor are traits with in-memory
//!   and mock implementations for tests
//! - **Pure State Machine**: uses queue-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use queue_client::{FileDraftStore, HttpLeadApi, ProbingMonitor, QueueConfig, QueueFacade};
//!
//! let config = QueueConfig::default();
//! let store = FileDraftStore::open(&config.storage_path_in(&data_dir)).await?;
//! let api = HttpLeadApi::new(&config.api)?;
//! let monitor = ProbingMonitor::new(api.clone(), &config.connectivity);
//! let queue = QueueFacade::open(store, api, monitor, &config.sync).await?;
//!
//! let draft = queue.create_draft(input).await?;
//! let results = queue.sync_all().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod facade;
pub mod store;

pub use api::{HttpLeadApi, LeadApi, MockLeadApi, RemoteError};
pub use config::{ApiConfig, ConfigError, ConnectivityConfig, QueueConfig, StorageConfig, SyncSettings};
pub use connectivity::{ConnectivityMonitor, ManualMonitor, ProbingMonitor};
pub use coordinator::{SyncCoordinator, SyncResult};
pub use error::{QueueError, StorageError};
pub use facade::{QueueFacade, QueueSnapshot};
pub use store::{DraftStore, FileDraftStore, MemoryDraftStore};

// Re-export the data types applications need
pub use queue_types::{
    CustomerRef, Draft, DraftId, DraftInput, LineItem, RemoteId, SyncState, Timestamp,
    ValidationError,
};
