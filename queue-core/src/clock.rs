//! Creation timestamps for drafts.
//!
//! Wall-clock readings can repeat (coarse clocks, two drafts in the same
//! millisecond) or go backwards (clock adjustments). Sync order is derived
//! from `created_at`, so the clock hands out strictly increasing values.

use queue_types::Timestamp;

/// Issues strictly increasing creation timestamps.
#[derive(Debug, Clone, Default)]
pub struct CreationClock {
    /// Last timestamp handed out.
    last: Option<Timestamp>,
}

impl CreationClock {
    /// Create a clock with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that continues after an already-issued timestamp.
    ///
    /// Use this when resuming from persisted drafts.
    pub fn resume_after(last: Timestamp) -> Self {
        Self { last: Some(last) }
    }

    /// Stamp a new draft given the current wall-clock reading.
    ///
    /// Returns `now` unless that would not be after the previous stamp, in
    /// which case the previous stamp plus one millisecond is returned.
    pub fn stamp(&mut self, now: Timestamp) -> Timestamp {
        let next = match self.last {
            Some(last) if now <= last => last.next(),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}
