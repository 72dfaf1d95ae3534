//! Timestamp helpers for SQLite text columns.
//!
//! Timestamps are stored as RFC 3339 UTC with fixed millisecond precision, so
//! comparing the stored strings lexically orders them chronologically.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};

use crate::db::error::DbError;

/// Current time truncated to what the database can hold.
///
/// Scheduling from this value means a due date read back from storage equals
/// the one returned to the caller.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Format a timestamp for storage.
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
pub fn from_db(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData(format!("bad timestamp {value:?}: {e}")))
}

/// Parse an optional stored timestamp.
pub fn from_db_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    value.as_deref().map(from_db).transpose()
}

/// Midnight UTC of the day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

/// The `days` calendar days ending with today, oldest first.
///
/// Stops early at the earliest representable date.
pub fn trailing_days(today: NaiveDate, days: usize) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = std::iter::successors(Some(today), NaiveDate::pred_opt)
        .take(days)
        .collect();
    dates.reverse();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_at_millisecond_precision() {
        let ts = now();
        assert_eq!(from_db(&to_db(ts)).unwrap(), ts);
    }

    #[test]
    fn stored_format_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert!(to_db(earlier) < to_db(later));
        assert_eq!(to_db(later), "2026-01-10T00:00:00.000Z");
    }

    #[test]
    fn garbage_is_invalid_data() {
        assert!(matches!(from_db("yesterday"), Err(DbError::InvalidData(_))));
    }

    #[test]
    fn start_of_day_is_midnight() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 17, 30, 0).unwrap();
        assert_eq!(to_db(start_of_day(ts)), "2026-03-04T00:00:00.000Z");
    }

    #[test]
    fn trailing_days_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let days = trailing_days(today, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                today,
            ]
        );
    }

    #[test]
    fn trailing_days_stops_at_min_date() {
        let start = NaiveDate::MIN.succ_opt().unwrap();
        assert_eq!(trailing_days(start, 1_000), vec![NaiveDate::MIN, start]);
        assert!(trailing_days(start, 0).is_empty());
    }
}
