//! Hand-driven connectivity monitor.

use std::sync::Arc;

use tokio::sync::watch;

use super::{publish, ConnectivityMonitor};

/// Monitor whose state is set explicitly.
///
/// Changes publish immediately, with no debounce. Clones share state.
#[derive(Debug, Clone)]
pub struct ManualMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ManualMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(offline: bool) -> Self {
        let (state, _) = watch::channel(offline);
        Self {
            state: Arc::new(state),
        }
    }

    /// Create a monitor that reports online.
    pub fn online() -> Self {
        Self::new(false)
    }

    /// Create a monitor that reports offline.
    pub fn offline() -> Self {
        Self::new(true)
    }

    /// Change the published state.
    pub fn set_offline(&self, offline: bool) {
        publish(&self.state, offline);
    }
}

impl ConnectivityMonitor for ManualMonitor {
    fn is_offline(&self) -> bool {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_offline_updates_value() {
        let monitor = ManualMonitor::online();
        assert!(!monitor.is_offline());

        monitor.set_offline(true);
        assert!(monitor.is_offline());
    }

    #[test]
    fn subscribers_see_changes_only() {
        let monitor = ManualMonitor::offline();
        let mut rx = monitor.subscribe();

        monitor.set_offline(true);
        assert!(!rx.has_changed().unwrap());

        monitor.set_offline(false);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn clones_share_state() {
        let a = ManualMonitor::online();
        let b = a.clone();

        b.set_offline(true);

        assert!(a.is_offline());
    }
}
