//! Identity and ordering types for leadq.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A locally generated identifier for a draft.
///
/// UUID v4 format, assigned once at creation and never changed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(uuid::Uuid);

impl DraftId {
    /// Create a new random DraftId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DraftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DraftId({})", self.0)
    }
}

/// Identifier the remote API assigned to a created lead.
///
/// Opaque to the queue: numeric ids are carried as their decimal string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wrap a remote identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteId({})", self.0)
    }
}

/// Milliseconds since the Unix epoch.
///
/// Drafts are synchronized in ascending `Timestamp` order, so the value
/// assigned at creation must never change afterwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a Timestamp from milliseconds since the epoch.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time.
    ///
    /// A clock set before 1970 reads as zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// The next representable instant (one millisecond later).
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_id_unique() {
        let id1 = DraftId::new();
        let id2 = DraftId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn draft_id_parses_its_display_form() {
        let id = DraftId::new();
        let parsed: DraftId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn draft_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<DraftId>().is_err());
    }

    #[test]
    fn draft_id_serializes_as_plain_string() {
        let id = DraftId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn remote_id_displays_raw_value() {
        let id = RemoteId::new("555");
        assert_eq!(id.to_string(), "555");
        assert_eq!(format!("{:?}", id), "RemoteId(555)");
    }

    #[test]
    fn timestamp_ordering() {
        let t1 = Timestamp::from_millis(10);
        let t2 = Timestamp::from_millis(20);
        assert!(t1 < t2);
        assert_eq!(t1.next(), Timestamp::from_millis(11));
    }

    #[test]
    fn timestamp_next_saturates() {
        let t = Timestamp::from_millis(u64::MAX);
        assert_eq!(t.next(), t);
    }

    #[test]
    fn timestamp_now_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(Timestamp::now() > Timestamp::from_millis(1_577_836_800_000));
    }
}
