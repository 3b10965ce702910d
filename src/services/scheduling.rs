use chrono::{Datelike, NaiveDate, NaiveTime};
use sqlx::SqlitePool;

use crate::db::models::HostAvailability;
use crate::db::{AvailabilityRepository, BookingRepository};
use crate::error::AppResult;

/// Availability resolution and slot generation.
///
/// A host's schedule is a list of availability records; each either recurs
/// weekly (`day_of_week`, 0 = Sunday … 6 = Saturday) or applies to one exact
/// calendar date. Date-specific records fully shadow recurring ones for that
/// date. Windows expand into fixed-increment "HH:MM" start labels; a start is
/// only emitted when the whole increment still fits inside the window.
pub struct SchedulingService;

impl SchedulingService {
    /// Bookable start times for a host on a date: resolved windows, expanded
    /// into labels, minus start times already taken by live bookings.
    pub async fn bookable_slots(
        pool: &SqlitePool,
        host_id: &str,
        date: NaiveDate,
        increment_minutes: u32,
    ) -> AppResult<Vec<String>> {
        let records = AvailabilityRepository::list_for_host(pool, host_id).await?;
        let booked = BookingRepository::booked_start_times(pool, host_id, date).await?;

        let mut slots = slots_for_date(&records, date, increment_minutes);
        slots.retain(|label| !booked.contains(label));
        Ok(slots)
    }
}

/// Filter a host's records down to the ones applicable on `date`.
///
/// Date-specific records take precedence: if any record matches the exact
/// date, only those apply; otherwise recurring records matching the date's
/// weekday do. A date with neither match is fully unavailable.
pub fn resolve_for_date(records: &[HostAvailability], date: NaiveDate) -> Vec<&HostAvailability> {
    let exact: Vec<&HostAvailability> =
        records.iter().filter(|r| r.date == Some(date)).collect();
    if !exact.is_empty() {
        return exact;
    }

    let weekday = date.weekday().num_days_from_sunday() as i64;
    records
        .iter()
        .filter(|r| r.date.is_none() && r.day_of_week == Some(weekday))
        .collect()
}

/// Expand one window into "HH:MM" labels every `increment_minutes`, keeping
/// only starts whose full increment fits before `end_time`. A window shorter
/// than one increment yields no labels; unparsable bounds yield no labels.
pub fn expand_window(start_time: &str, end_time: &str, increment_minutes: u32) -> Vec<String> {
    let (Some(start), Some(end)) = (parse_hhmm(start_time), parse_hhmm(end_time)) else {
        return Vec::new();
    };
    if increment_minutes == 0 || start >= end {
        return Vec::new();
    }

    let increment = increment_minutes * 60;
    let end_secs = end.signed_duration_since(NaiveTime::MIN).num_seconds() as u32;
    let mut cur = start.signed_duration_since(NaiveTime::MIN).num_seconds() as u32;

    let mut labels = Vec::new();
    while cur + increment <= end_secs {
        labels.push(format!("{:02}:{:02}", cur / 3600, (cur % 3600) / 60));
        cur += increment;
    }
    labels
}

/// All slot labels for `date`: applicable windows expanded, flattened,
/// sorted and de-duplicated (overlapping windows must not double-list a
/// start time).
pub fn slots_for_date(
    records: &[HostAvailability],
    date: NaiveDate,
    increment_minutes: u32,
) -> Vec<String> {
    let mut labels: Vec<String> = resolve_for_date(records, date)
        .into_iter()
        .flat_map(|r| expand_window(&r.start_time, &r.end_time, increment_minutes))
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Parse an "HH:MM" label. Rejects anything chrono cannot read as %H:%M.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, Utc};

    use super::*;

    fn record(
        day_of_week: Option<i64>,
        date: Option<NaiveDate>,
        start: &str,
        end: &str,
    ) -> HostAvailability {
        let now: NaiveDateTime = Utc::now().naive_utc();
        HostAvailability {
            id: "a".to_string(),
            host_id: "h".to_string(),
            day_of_week,
            date,
            start_time: start.to_string(),
            end_time: end.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expands_hour_window_into_quarter_hours() {
        assert_eq!(
            expand_window("09:00", "10:00", 15),
            vec!["09:00", "09:15", "09:30", "09:45"]
        );
    }

    #[test]
    fn emits_exactly_floor_window_over_increment_slots() {
        // 09:00-09:50 is 50 minutes: only 3 full 15-minute slots fit.
        assert_eq!(expand_window("09:00", "09:50", 15).len(), 3);
        assert_eq!(expand_window("09:00", "12:00", 30).len(), 6);
        assert_eq!(expand_window("00:00", "23:59", 60).len(), 23);
    }

    #[test]
    fn short_window_yields_no_slots() {
        assert_eq!(expand_window("09:00", "09:10", 15), Vec::<String>::new());
        assert_eq!(expand_window("09:00", "09:00", 15), Vec::<String>::new());
    }

    #[test]
    fn inverted_or_malformed_window_yields_no_slots() {
        assert!(expand_window("10:00", "09:00", 15).is_empty());
        assert!(expand_window("late", "10:00", 15).is_empty());
        assert!(expand_window("09:00", "10:00", 0).is_empty());
    }

    #[test]
    fn date_specific_records_shadow_recurring_ones() {
        // 2026-09-01 is a Tuesday (weekday 2).
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let records = vec![
            record(Some(2), None, "09:00", "12:00"),
            record(None, Some(date), "15:00", "16:00"),
        ];

        let slots = slots_for_date(&records, date, 15);
        assert_eq!(slots, vec!["15:00", "15:15", "15:30", "15:45"]);
    }

    #[test]
    fn falls_back_to_weekday_records() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let other_date = NaiveDate::from_ymd_opt(2026, 9, 8).unwrap();
        let records = vec![
            record(Some(2), None, "09:00", "10:00"),
            // Override applies to a different Tuesday, not this one.
            record(None, Some(other_date), "15:00", "16:00"),
        ];

        let slots = slots_for_date(&records, date, 15);
        assert_eq!(slots, vec!["09:00", "09:15", "09:30", "09:45"]);
    }

    #[test]
    fn unmatched_date_is_fully_unavailable() {
        // 2026-09-02 is a Wednesday; only a Tuesday record exists.
        let date = NaiveDate::from_ymd_opt(2026, 9, 2).unwrap();
        let records = vec![record(Some(2), None, "09:00", "12:00")];
        assert!(slots_for_date(&records, date, 15).is_empty());
    }

    #[test]
    fn overlapping_windows_are_flattened_sorted_and_deduped() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let records = vec![
            record(Some(2), None, "10:00", "11:00"),
            record(Some(2), None, "09:00", "10:30"),
        ];

        let slots = slots_for_date(&records, date, 15);
        assert_eq!(
            slots,
            vec!["09:00", "09:15", "09:30", "09:45", "10:00", "10:15", "10:30", "10:45"]
        );
    }
}
