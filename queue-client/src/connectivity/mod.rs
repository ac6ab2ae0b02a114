//! Connectivity monitoring.
//!
//! A monitor publishes one debounced boolean, `is_offline`. Nothing blocks
//! on it: the facade reads it, and subscribers are woken when it changes.
//!
//! Monitors are injected, never global. [`ProbingMonitor`] combines runtime
//! online/offline signals with periodic probes of the lead API;
//! [`ManualMonitor`] is flipped by hand and is what tests use.

mod manual;
mod probing;

pub use manual::ManualMonitor;
pub use probing::ProbingMonitor;

use tokio::sync::watch;

/// Source of the offline flag.
pub trait ConnectivityMonitor: Send + Sync + 'static {
    /// Current published value.
    fn is_offline(&self) -> bool;

    /// Receiver that observes every published change.
    fn subscribe(&self) -> watch::Receiver<bool>;

    /// Begin observing. Idempotent.
    fn start(&self) {}

    /// Stop observing. The last published value stays readable.
    fn stop(&self) {}
}

impl<T: ConnectivityMonitor + ?Sized> ConnectivityMonitor for std::sync::Arc<T> {
    fn is_offline(&self) -> bool {
        (**self).is_offline()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        (**self).subscribe()
    }

    fn start(&self) {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop()
    }
}

/// Publish `offline` if it differs from the current value.
///
/// Returns whether subscribers were notified.
pub(crate) fn publish(state: &watch::Sender<bool>, offline: bool) -> bool {
    let changed = state.send_if_modified(|current| {
        if *current == offline {
            return false;
        }
        *current = offline;
        true
    });
    if changed {
        tracing::info!(offline, "Connectivity changed");
    }
    changed
}
