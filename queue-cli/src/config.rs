//! Configuration management for leadq.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use queue_client::{
    FileDraftStore, HttpLeadApi, LeadApi, MockLeadApi, ProbingMonitor, QueueConfig, QueueFacade,
};

/// Config file looked up in the data directory.
pub const CONFIG_FILE: &str = "leadq.toml";

/// API handle shared by the coordinator and the monitor.
pub type Api = Arc<dyn LeadApi>;

/// The queue as the CLI opens it.
pub type Queue = QueueFacade<FileDraftStore, Api, ProbingMonitor<Api>>;

/// Everything a command needs to open the queue.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Data directory.
    pub data_dir: PathBuf,
    /// Loaded configuration.
    pub queue: QueueConfig,
    /// Use the mock API.
    pub mock: bool,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit config path must exist. Without one,
    /// `<data_dir>/leadq.toml` is used if present and defaults otherwise.
    pub fn load(data_dir: &Path, config_path: Option<&Path>, mock: bool) -> Result<Self> {
        let queue = match config_path {
            Some(path) => QueueConfig::from_file(path)?,
            None => {
                let default_path = data_dir.join(CONFIG_FILE);
                if default_path.exists() {
                    QueueConfig::from_file(&default_path)?
                } else {
                    QueueConfig::default()
                }
            }
        };

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            queue,
            mock,
        })
    }

    /// Path of the draft file.
    pub fn storage_path(&self) -> PathBuf {
        self.queue.storage_path_in(&self.data_dir)
    }

    /// Build the API client.
    pub fn api(&self) -> Result<Api> {
        if self.mock {
            return Ok(Arc::new(MockLeadApi::new()));
        }
        let api = HttpLeadApi::new(&self.queue.api).context("Failed to create HTTP client")?;
        Ok(Arc::new(api))
    }

    /// Open the queue.
    ///
    /// Syncing on reconnect is only wanted by long-running commands; a
    /// one-shot command would exit in the middle of the pass.
    pub async fn open(&self, sync_on_reconnect: bool) -> Result<Queue> {
        let store = FileDraftStore::open_with_lock_wait(
            &self.storage_path(),
            self.queue.storage.lock_wait(),
        )
        .await
        .context("Failed to open draft store")?;
        if let Some(warning) = store.load_warning() {
            eprintln!("warning: {}", warning);
        }

        let api = self.api()?;
        let monitor = ProbingMonitor::new(Arc::clone(&api), &self.queue.connectivity);

        let mut sync = self.queue.sync.clone();
        sync.sync_on_reconnect = sync_on_reconnect && sync.sync_on_reconnect;

        QueueFacade::open(store, api, monitor, &sync)
            .await
            .context("Failed to open draft queue")
    }
}
