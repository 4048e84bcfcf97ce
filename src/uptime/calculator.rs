//! Daily uptime computation over the status event log.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::db::{StatusEvent, StatusEventLog};

use super::UptimeError;

/// Computes how long a server was online within one calendar day of the
/// configured zone.
///
/// Day boundaries are wall-clock midnights, so a day crossing a DST
/// transition spans 23 or 25 hours rather than a fixed 24. The computation
/// reads the event log directly and never touches the list cache: it is a
/// pure function of the event set and the clock.
pub struct UptimeCalculator {
    log: Arc<dyn StatusEventLog>,
    zone: Tz,
}

impl UptimeCalculator {
    pub fn new(log: Arc<dyn StatusEventLog>, zone: Tz) -> Self {
        Self { log, zone }
    }

    /// Online duration for a server on `date` (`YYYY-MM-DD`, interpreted in
    /// the calculator's zone).
    pub fn uptime_on(&self, server_id: i64, date: &str) -> Result<Duration, UptimeError> {
        self.uptime_on_at(server_id, date, Utc::now())
    }

    // `now` is injected so tests can pin the clock.
    fn uptime_on_at(
        &self,
        server_id: i64,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<Duration, UptimeError> {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| UptimeError::InvalidDate(format!("{}: {}", date, e)))?;
        let (day_start, day_end) = self.day_bounds(day)?;

        // A day that has not begun yet has no observable uptime
        if now <= day_start {
            return Ok(Duration::zero());
        }
        let effective_end = if day_end > now { now } else { day_end };

        let initial = self
            .log
            .latest_before(server_id, day_start)?
            .map(|e| e.new_status)
            // No prior history means never observed online
            .unwrap_or(false);

        let mut events = self.log.range(server_id, day_start, day_end)?;
        sort_defensively(&mut events, server_id);

        Ok(accumulate_online(initial, &events, day_start, effective_end))
    }

    fn day_bounds(&self, day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), UptimeError> {
        let next = day
            .succ_opt()
            .ok_or_else(|| UptimeError::InvalidDate(format!("{} has no next day", day)))?;
        let start = local_midnight(self.zone, day)
            .ok_or_else(|| UptimeError::InvalidDate(format!("{} in {}", day, self.zone)))?;
        let end = local_midnight(self.zone, next)
            .ok_or_else(|| UptimeError::InvalidDate(format!("{} in {}", next, self.zone)))?;
        Ok((start, end))
    }
}

/// Resolve a zone's local midnight to UTC.
///
/// A midnight skipped by a spring-forward jump resolves to the earliest
/// existing instant after it; an ambiguous fall-back midnight takes the
/// earlier of the two.
fn local_midnight(zone: Tz, day: NaiveDate) -> Option<DateTime<Utc>> {
    let naive = day.and_hms_opt(0, 0, 0)?;
    if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    // Skipped midnight: scan forward to the first wall-clock minute that
    // exists. DST jumps are at most a few hours.
    for minutes in 1..=180 {
        let shifted = naive + Duration::minutes(minutes);
        if let Some(dt) = zone.from_local_datetime(&shifted).earliest() {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Sort events by timestamp, flagging stores that returned them out of
/// order. Out-of-order arrival is corrected, never fatal.
fn sort_defensively(events: &mut [StatusEvent], server_id: i64) {
    let out_of_order = events.windows(2).any(|w| w[0].timestamp > w[1].timestamp);
    if out_of_order {
        tracing::warn!(server_id, "status events out of order on read; re-sorting");
    }
    events.sort_by_key(|e| e.timestamp);
}

/// Walk `[day_start, effective_end)` accumulating time spent online.
///
/// `events` must be sorted ascending. An event repeating the running status
/// is skipped, so malformed duplicates neither double count nor reset the
/// walk.
fn accumulate_online(
    initial: bool,
    events: &[StatusEvent],
    day_start: DateTime<Utc>,
    effective_end: DateTime<Utc>,
) -> Duration {
    let mut online = Duration::zero();
    let mut status = initial;
    let mut cursor = day_start;

    for event in events {
        if event.new_status == status {
            continue;
        }
        let at = event.timestamp.clamp(day_start, effective_end);
        if status {
            online = online + (at - cursor);
        }
        status = event.new_status;
        cursor = at;
    }

    if status && effective_end > cursor {
        online = online + (effective_end - cursor);
    }

    online
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uptime::testutil::MemoryLog;

    const SERVER: i64 = 1;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn calculator(zone: Tz) -> (Arc<MemoryLog>, UptimeCalculator) {
        let log = Arc::new(MemoryLog::new());
        let calc = UptimeCalculator::new(log.clone(), zone);
        (log, calc)
    }

    // All-UTC scenarios use a `now` far past the queried day.
    fn later() -> DateTime<Utc> {
        utc(2024, 6, 1, 0, 0)
    }

    #[test]
    fn test_online_morning_to_evening() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 10, 8, 0), false, true);
        log.push(SERVER, utc(2024, 5, 10, 18, 0), true, false);

        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::hours(10));
    }

    #[test]
    fn test_status_carried_forward_from_prior_day() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 9, 7, 0), false, true);

        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::hours(24));
    }

    #[test]
    fn test_no_history_means_offline() {
        let (_log, calc) = calculator(chrono_tz::UTC);
        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::zero());
    }

    #[test]
    fn test_duplicate_events_are_collapsed() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 10, 8, 0), false, true);
        // Malformed repeat: online -> online
        log.push(SERVER, utc(2024, 5, 10, 12, 0), true, true);
        log.push(SERVER, utc(2024, 5, 10, 18, 0), true, false);

        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::hours(10));
    }

    #[test]
    fn test_out_of_order_events_are_resorted() {
        let (log, calc) = calculator(chrono_tz::UTC);
        // Inserted in reverse; MemoryLog returns insertion order
        log.push(SERVER, utc(2024, 5, 10, 18, 0), true, false);
        log.push(SERVER, utc(2024, 5, 10, 8, 0), false, true);

        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::hours(10));
    }

    #[test]
    fn test_idempotent_on_unchanged_log() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 10, 3, 30), false, true);
        log.push(SERVER, utc(2024, 5, 10, 20, 15), true, false);

        let first = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        let second = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Duration::minutes(16 * 60 + 45));
    }

    #[test]
    fn test_current_day_truncates_at_now() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 9, 7, 0), false, true);

        // Six hours into the queried day
        let now = utc(2024, 5, 10, 6, 0);
        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", now).unwrap();
        assert_eq!(uptime, Duration::hours(6));
    }

    #[test]
    fn test_future_day_has_no_uptime() {
        let (log, calc) = calculator(chrono_tz::UTC);
        log.push(SERVER, utc(2024, 5, 9, 7, 0), false, true);

        let now = utc(2024, 5, 10, 12, 0);
        let uptime = calc.uptime_on_at(SERVER, "2024-05-11", now).unwrap();
        assert_eq!(uptime, Duration::zero());
    }

    #[test]
    fn test_dst_short_day() {
        // Europe/Berlin 2024-03-31 loses an hour: 23h of wall clock
        let (log, calc) = calculator(chrono_tz::Europe::Berlin);
        log.push(SERVER, utc(2024, 3, 1, 0, 0), false, true);

        let uptime = calc
            .uptime_on_at(SERVER, "2024-03-31", utc(2024, 4, 2, 0, 0))
            .unwrap();
        assert_eq!(uptime, Duration::hours(23));
    }

    #[test]
    fn test_dst_long_day() {
        // Europe/Berlin 2024-10-27 gains an hour: 25h of wall clock
        let (log, calc) = calculator(chrono_tz::Europe::Berlin);
        log.push(SERVER, utc(2024, 10, 1, 0, 0), false, true);

        let uptime = calc
            .uptime_on_at(SERVER, "2024-10-27", utc(2024, 11, 2, 0, 0))
            .unwrap();
        assert_eq!(uptime, Duration::hours(25));
    }

    #[test]
    fn test_event_exactly_at_day_start_counts_once() {
        let (log, calc) = calculator(chrono_tz::UTC);
        // Seen both as the initial status and as the first in-day event;
        // the collapse rule must not double count it.
        log.push(SERVER, utc(2024, 5, 10, 0, 0), false, true);
        log.push(SERVER, utc(2024, 5, 10, 12, 0), true, false);

        let uptime = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap();
        assert_eq!(uptime, Duration::hours(12));
    }

    #[test]
    fn test_invalid_date_is_a_client_error() {
        let (_log, calc) = calculator(chrono_tz::UTC);
        let err = calc.uptime_on_at(SERVER, "05/10/2024", later()).unwrap_err();
        assert!(matches!(err, UptimeError::InvalidDate(_)));
    }

    #[test]
    fn test_unreachable_log_is_an_error_not_zero() {
        let calc = UptimeCalculator::new(Arc::new(MemoryLog::failing()), chrono_tz::UTC);
        let err = calc.uptime_on_at(SERVER, "2024-05-10", later()).unwrap_err();
        assert!(matches!(err, UptimeError::LogUnavailable(_)));
    }
}
