//! Freshness markers — when was a fingerprint last successfully populated.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Secondary cache entry recording the last successful population of a
/// fingerprint, stored under `<fingerprint>:cache` as
/// `{"lastSave":<epoch-millis>}`.
///
/// Present if and only if a population has succeeded; an absent or
/// unparsable marker is treated as maximally stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessMarker {
    #[serde(rename = "lastSave")]
    last_save: u64,
}

impl FreshnessMarker {
    /// A marker stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self {
            last_save: epoch_millis(),
        }
    }

    /// A marker with an explicit timestamp.
    pub fn at(last_save: u64) -> Self {
        Self { last_save }
    }

    /// Epoch milliseconds of the last successful population.
    pub fn last_save(&self) -> u64 {
        self.last_save
    }

    /// Parses a stored marker; `None` for anything unreadable.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Serialized wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap() // single integer field, cannot fail
    }

    /// Returns `true` once `window` has elapsed between `last_save` and
    /// `now_millis`.
    pub fn is_stale(&self, window: Duration, now_millis: u64) -> bool {
        now_millis.saturating_sub(self.last_save) >= window.as_millis() as u64
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(FreshnessMarker::at(123).to_json(), r#"{"lastSave":123}"#);
    }

    #[test]
    fn parse_roundtrip() {
        let marker = FreshnessMarker::at(1_700_000_000_000);
        assert_eq!(FreshnessMarker::parse(&marker.to_json()), Some(marker));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(FreshnessMarker::parse("not a marker"), None);
        assert_eq!(FreshnessMarker::parse(r#"{"lastSave":"soon"}"#), None);
    }

    #[test]
    fn staleness_boundary() {
        let window = Duration::from_millis(60_000);
        let marker = FreshnessMarker::at(100_000);
        assert!(!marker.is_stale(window, 159_999));
        assert!(marker.is_stale(window, 160_000));
        assert!(marker.is_stale(window, 1_000_000));
    }

    #[test]
    fn clock_behind_marker_is_fresh() {
        let window = Duration::from_millis(60_000);
        let marker = FreshnessMarker::at(200_000);
        assert!(!marker.is_stale(window, 100_000));
    }
}
