//! Debounced connectivity tracking.
//!
//! Two raw inputs decide whether the queue is offline:
//! - the runtime's online/offline signal
//! - the result of the last reachability probe against the remote API
//!
//! The device can report "online" while the API is unreachable, so the raw
//! status is offline unless both inputs say otherwise. A raw change is only
//! published once it has held for the debounce window; a flap that reverts
//! inside the window is dropped entirely.
//!
//! Time is passed in by the caller. This module never reads a clock.

use std::time::{Duration, Instant};

/// A raw connectivity observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivitySignal {
    /// Runtime connectivity event.
    Os {
        /// Whether the runtime reports a network.
        online: bool,
    },
    /// Outcome of a reachability probe.
    Probe {
        /// Whether the API answered.
        reachable: bool,
    },
}

/// Debounced offline flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    /// How long a raw change must hold before it is published.
    window: Duration,
    /// Last runtime signal.
    os_online: bool,
    /// Last probe outcome.
    api_reachable: bool,
    /// Value observers currently see.
    published_offline: bool,
    /// Raw value waiting out the window, and when it was first seen.
    candidate: Option<(bool, Instant)>,
}

impl Connectivity {
    /// Create a tracker with an initial published state.
    pub fn new(window: Duration, initially_offline: bool) -> Self {
        Self {
            window,
            os_online: !initially_offline,
            api_reachable: !initially_offline,
            published_offline: initially_offline,
            candidate: None,
        }
    }

    /// The published (debounced) offline flag.
    pub fn is_offline(&self) -> bool {
        self.published_offline
    }

    /// The undebounced offline flag.
    pub fn raw_offline(&self) -> bool {
        !(self.os_online && self.api_reachable)
    }

    /// When the pending change will settle, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.candidate.map(|(_, since)| since + self.window)
    }

    /// Record a raw signal.
    ///
    /// Returns `Some(offline)` if the published value changed.
    pub fn observe(&mut self, signal: ConnectivitySignal, now: Instant) -> Option<bool> {
        match signal {
            ConnectivitySignal::Os { online } => self.os_online = online,
            ConnectivitySignal::Probe { reachable } => self.api_reachable = reachable,
        }

        let raw = self.raw_offline();
        if raw == self.published_offline {
            // Flap reverted inside the window
            self.candidate = None;
        } else if !matches!(self.candidate, Some((value, _)) if value == raw) {
            self.candidate = Some((raw, now));
        }

        self.poll(now)
    }

    /// Publish the pending change if its window has elapsed.
    ///
    /// Returns `Some(offline)` if the published value changed.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        let (value, since) = self.candidate?;
        if now.saturating_duration_since(since) < self.window {
            return None;
        }
        self.candidate = None;
        self.published_offline = value;
        Some(value)
    }
}
