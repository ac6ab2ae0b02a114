//! Connectivity monitor backed by API probes.
//!
//! A background task combines two inputs:
//! - runtime signals fed in through [`ProbingMonitor::os_signal`]
//! - a probe of the lead API every `probe_interval`, plus one immediately
//!   whenever the runtime reports that the network came back
//!
//! The first probe after `start()` publishes directly. Every later change
//! goes through the debounce in [`queue_core::Connectivity`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use queue_core::{Connectivity, ConnectivitySignal};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{publish, ConnectivityMonitor};
use crate::api::LeadApi;
use crate::config::ConnectivityConfig;

/// Shortest probe period the monitor will use.
const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(10);

/// Monitor that probes the lead API.
///
/// Reports offline until the first probe completes.
pub struct ProbingMonitor<A> {
    shared: Arc<Shared<A>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<A> {
    api: A,
    probe_interval: Duration,
    debounce: Duration,
    /// Published offline flag.
    state: watch::Sender<bool>,
    /// Last runtime online signal.
    os_online: watch::Sender<bool>,
    /// Set once the first probe has been published.
    probed: watch::Sender<bool>,
}

impl<A: LeadApi> ProbingMonitor<A> {
    /// Create a stopped monitor.
    pub fn new(api: A, config: &ConnectivityConfig) -> Self {
        let (state, _) = watch::channel(true);
        let (os_online, _) = watch::channel(true);
        let (probed, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                api,
                probe_interval: config.probe_interval().max(MIN_PROBE_INTERVAL),
                debounce: config.debounce(),
                state,
                os_online,
                probed,
            }),
            task: Mutex::new(None),
        }
    }

    /// Feed a runtime online/offline event.
    pub fn os_signal(&self, online: bool) {
        self.shared.os_online.send_replace(online);
    }

    /// Wait until the first probe after `start()` has been published.
    ///
    /// Returns immediately if that already happened.
    pub async fn ready(&self) {
        let mut probed = self.shared.probed.subscribe();
        // The sender lives in `shared`, which outlives this call
        let _ = probed.wait_for(|done| *done).await;
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: LeadApi> ConnectivityMonitor for ProbingMonitor<A> {
    fn is_offline(&self) -> bool {
        *self.shared.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.state.subscribe()
    }

    /// Spawn the probe task. Must be called inside a Tokio runtime.
    fn start(&self) {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        tracing::debug!(
            interval_ms = self.shared.probe_interval.as_millis() as u64,
            "Starting connectivity monitor"
        );
        *task = Some(tokio::spawn(run(Arc::clone(&self.shared))));
    }

    fn stop(&self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
            tracing::debug!("Stopped connectivity monitor");
        }
    }
}

impl<A> Drop for ProbingMonitor<A> {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

async fn probe<A: LeadApi>(shared: &Shared<A>) -> bool {
    match shared.api.probe().await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Reachability probe failed");
            false
        }
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn run<A: LeadApi>(shared: Arc<Shared<A>>) {
    let mut os = shared.os_online.subscribe();
    let mut ticker = tokio::time::interval(shared.probe_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    let os_online = *os.borrow_and_update();
    let reachable = os_online && probe(&shared).await;
    let mut tracker = Connectivity::new(shared.debounce, !reachable);
    tracker.observe(ConnectivitySignal::Os { online: os_online }, now());
    publish(&shared.state, tracker.is_offline());
    shared.probed.send_replace(true);

    loop {
        let deadline = tracker.deadline().map(Instant::from_std);
        let settle_at = deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            _ = ticker.tick() => {
                let reachable = probe(&shared).await;
                if let Some(offline) =
                    tracker.observe(ConnectivitySignal::Probe { reachable }, now())
                {
                    publish(&shared.state, offline);
                }
            }
            changed = os.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *os.borrow_and_update();
                tracing::debug!(online, "Runtime connectivity signal");
                if let Some(offline) = tracker.observe(ConnectivitySignal::Os { online }, now()) {
                    publish(&shared.state, offline);
                }
                if online {
                    let reachable = probe(&shared).await;
                    if let Some(offline) =
                        tracker.observe(ConnectivitySignal::Probe { reachable }, now())
                    {
                        publish(&shared.state, offline);
                    }
                }
            }
            _ = tokio::time::sleep_until(settle_at), if deadline.is_some() => {
                if let Some(offline) = tracker.poll(now()) {
                    publish(&shared.state, offline);
                }
            }
        }
    }
}
