//! Status-change recording and daily uptime computation.

mod calculator;
mod recorder;

pub use calculator::*;
pub use recorder::*;

use thiserror::Error;

use crate::db::EventLogError;

/// Errors surfaced by uptime computation.
#[derive(Error, Debug)]
pub enum UptimeError {
    /// The requested day could not be parsed or placed in the zone.
    #[error("invalid date: {0}")]
    InvalidDate(String),
    /// The event log could not be read. Never silently reported as zero
    /// uptime; an unreachable log and a quiet day are different answers.
    #[error("{0}")]
    LogUnavailable(#[from] EventLogError),
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use crate::db::{EventLogError, StatusEvent, StatusEventLog};

    /// In-memory event log for tests. Returns events in insertion order,
    /// deliberately unsorted, so callers exercise their defensive sort.
    pub struct MemoryLog {
        events: Mutex<Vec<StatusEvent>>,
        fail: bool,
    }

    impl MemoryLog {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        /// A log whose every call fails, standing in for an unreachable store.
        pub fn failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn push(&self, server_id: i64, timestamp: DateTime<Utc>, previous: bool, new: bool) {
            self.events.lock().unwrap().push(StatusEvent {
                server_id,
                timestamp,
                previous_status: previous,
                new_status: new,
            });
        }

        fn check(&self) -> Result<(), EventLogError> {
            if self.fail {
                Err(EventLogError::Unavailable("injected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl StatusEventLog for MemoryLog {
        fn append(&self, event: &StatusEvent) -> Result<(), EventLogError> {
            self.check()?;
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn latest_before(
            &self,
            server_id: i64,
            at: DateTime<Utc>,
        ) -> Result<Option<StatusEvent>, EventLogError> {
            self.check()?;
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|e| e.server_id == server_id && e.timestamp <= at)
                .max_by_key(|e| e.timestamp)
                .cloned())
        }

        fn range(
            &self,
            server_id: i64,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<StatusEvent>, EventLogError> {
            self.check()?;
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|e| e.server_id == server_id && e.timestamp >= start && e.timestamp < end)
                .cloned()
                .collect())
        }

        fn delete_for(&self, server_id: i64) -> Result<(), EventLogError> {
            self.check()?;
            self.events
                .lock()
                .unwrap()
                .retain(|e| e.server_id != server_id);
            Ok(())
        }
    }
}
