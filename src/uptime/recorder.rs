//! Edge-triggered status-change recording.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{EventLogError, StatusEvent, StatusEventLog};

/// Writes a status-change event only when the observed status differs from
/// the last recorded one. Repeated observations of the same status produce
/// nothing.
pub struct StatusChangeRecorder {
    log: Arc<dyn StatusEventLog>,
}

impl StatusChangeRecorder {
    pub fn new(log: Arc<dyn StatusEventLog>) -> Self {
        Self { log }
    }

    /// Record one transition. Returns `true` when an event was appended,
    /// `false` for the `previous == new` no-op.
    ///
    /// The caller supplies a timestamp non-decreasing per server; the
    /// recorder never reorders. Readers sort defensively anyway because
    /// concurrent producers can interleave appends.
    pub fn record(
        &self,
        server_id: i64,
        previous: bool,
        new: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, EventLogError> {
        if previous == new {
            return Ok(false);
        }

        self.log.append(&StatusEvent {
            server_id,
            timestamp,
            previous_status: previous,
            new_status: new,
        })?;
        tracing::debug!(server_id, previous, new, "recorded status change");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uptime::testutil::MemoryLog;
    use chrono::TimeZone;

    #[test]
    fn test_no_event_when_status_unchanged() {
        let log = Arc::new(MemoryLog::new());
        let recorder = StatusChangeRecorder::new(log.clone());
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();

        assert!(!recorder.record(1, true, true, at).unwrap());
        assert!(!recorder.record(1, false, false, at).unwrap());

        let day_end = Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap();
        let day_start = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        assert!(log.range(1, day_start, day_end).unwrap().is_empty());
    }

    #[test]
    fn test_exactly_one_event_per_change() {
        let log = Arc::new(MemoryLog::new());
        let recorder = StatusChangeRecorder::new(log.clone());
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();

        assert!(recorder.record(1, false, true, at).unwrap());

        let day_start = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let day_end = Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap();
        let events = log.range(1, day_start, day_end).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].previous_status);
        assert!(events[0].new_status);
    }

    #[test]
    fn test_append_failure_propagates() {
        let recorder = StatusChangeRecorder::new(Arc::new(MemoryLog::failing()));
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        assert!(recorder.record(1, false, true, at).is_err());
    }
}
