use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, TaskdeckError};

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Monday through Sunday of the week containing `day`.
pub fn week_days(day: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(day);
    (0..7).map(|offset| start + Duration::days(offset)).collect()
}

pub fn same_week(a: NaiveDate, b: NaiveDate) -> bool {
    week_start(a) == week_start(b)
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// A day inside the calendar month before the one containing `day`.
pub fn previous_month(day: NaiveDate) -> NaiveDate {
    let first = day.with_day(1).unwrap_or(day);
    first - Duration::days(1)
}

pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| TaskdeckError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", input)))
}

/// "YYYY-MM-DD HH:MM" in local time.
pub fn parse_local_datetime(input: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M").map_err(|_| {
        TaskdeckError::Validation(format!("Invalid time '{}', expected YYYY-MM-DD HH:MM", input))
    })?;
    Ok(local_to_utc(naive))
}

/// Last second of `day` in local time, used as the instant a day-only due
/// date becomes overdue.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_hms_opt(23, 59, 59).unwrap_or_default();
    local_to_utc(naive)
}

fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Inside a DST gap: treat the wall-clock time as UTC.
        None => Utc.from_utc_datetime(&naive),
    }
}
