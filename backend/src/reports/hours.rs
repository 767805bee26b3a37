//! Hour arithmetic for time entries and weekly summaries.

use chrono::{Datelike, TimeZone};
use time::{Date, Month, OffsetDateTime};

/// Weekly hours beyond this are overtime.
pub const REGULAR_HOURS_PER_WEEK: f64 = 40.0;

/// Worked hours between clock-in and clock-out minus the lunch break,
/// floored at zero and rounded to two decimals.
pub fn worked_hours(clock_in: OffsetDateTime, clock_out: OffsetDateTime, lunch_minutes: i32) -> f64 {
    let minutes = (clock_out - clock_in).whole_seconds() as f64 / 60.0 - lunch_minutes as f64;
    round2(minutes.max(0.0) / 60.0)
}

/// Split a week's total into (regular, overtime).
pub fn split_overtime(total: f64) -> (f64, f64) {
    let total = total.max(0.0);
    let regular = total.min(REGULAR_HOURS_PER_WEEK);
    (round2(regular), round2(total - regular))
}

pub fn round2(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Monday of the week containing `date`.
pub fn week_start(date: Date) -> Date {
    date - time::Duration::days(date.weekday().number_days_from_monday() as i64)
}

/// Monday of the organization's current week, judged by its local date.
pub fn current_week_start(now: OffsetDateTime, timezone: &str) -> Date {
    week_start(local_work_date(now, timezone))
}

/// Calendar date of `instant` in the organization's timezone. Unknown
/// timezone names fall back to UTC.
pub fn local_work_date(instant: OffsetDateTime, timezone: &str) -> Date {
    let utc_date = instant.to_offset(time::UtcOffset::UTC).date();

    let tz: chrono_tz::Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone, "Unknown organization timezone, using UTC");
            return utc_date;
        }
    };

    let local = match tz.timestamp_opt(instant.unix_timestamp(), 0).single() {
        Some(dt) => dt.date_naive(),
        None => return utc_date,
    };

    Month::try_from(local.month() as u8)
        .ok()
        .and_then(|m| Date::from_calendar_date(local.year(), m, local.day() as u8).ok())
        .unwrap_or(utc_date)
}
