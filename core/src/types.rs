//! Shared primitive types used across the whole tracker.

use chrono::NaiveDate;

/// A stable, unique identifier for a (customer, network) row.
pub type CustomerId = String;

/// The idempotency key supplied by the session-processing collaborator.
/// One terminal-success session maps to exactly one session id, ever.
pub type SessionId = String;

/// A 1-based calendar month number. January = 1, December = 12.
pub type MonthNum = u32;

/// Bucket key for one calendar month, `"YYYY-MM"`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Split a `"YYYY-MM"` key into (year, month). Returns `None` for keys
/// that do not follow the bucket format; callers skip (and log) those.
pub fn split_month_key(key: &str) -> Option<(i32, MonthNum)> {
    let (year_part, month_part) = key.split_once('-')?;
    let year: i32 = year_part.parse().ok()?;
    let month: MonthNum = month_part.parse().ok()?;
    if year_part.len() != 4 || month_part.len() != 2 || !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}
