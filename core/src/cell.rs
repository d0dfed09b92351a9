//! Typed month-cell values.
//!
//! RULE: every stored cell decodes into `MonthCell` in exactly one place
//! (`MonthCell::decode`). Consumers pattern-match the enum; nobody
//! re-derives string-equality checks against raw cell text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display marker for a month with no entry.
pub const EMPTY_TOKEN: &str = "-";

/// The three fixed non-date status labels a month slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSentinel {
    NotStarted,
    NotRun,
    NoReport,
}

impl StatusSentinel {
    pub const ALL: [StatusSentinel; 3] = [Self::NotStarted, Self::NotRun, Self::NoReport];

    /// The exact label as stored and displayed. Sentinels are never
    /// translated or reformatted.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::NotRun => "Not Run",
            Self::NoReport => "No Report",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == raw)
    }
}

/// One month slot of a (customer, network) history.
///
/// `Malformed` carries legacy junk verbatim: historical data may contain
/// values that are neither dates nor sentinels, and they must remain
/// displayable. Decoding is total: no raw string fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MonthCell {
    Empty,
    Sentinel(StatusSentinel),
    Date(NaiveDate),
    Malformed(String),
}

impl MonthCell {
    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim();
        if matches!(trimmed, "" | "-" | "None" | "null") {
            return Self::Empty;
        }
        if let Some(sentinel) = StatusSentinel::parse(trimmed) {
            return Self::Sentinel(sentinel);
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Self::Date(date),
            Err(_) => Self::Malformed(raw.to_string()),
        }
    }

    /// The stored string form. Inverse of `decode` for well-formed cells;
    /// `Malformed` round-trips its original text untouched.
    pub fn encode(&self) -> String {
        match self {
            Self::Empty => EMPTY_TOKEN.to_string(),
            Self::Sentinel(s) => s.label().to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Malformed(raw) => raw.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// True for cells that carry information a range filter should keep a
    /// customer row for: concrete dates and (conservatively) malformed
    /// legacy values. Sentinels and empty slots are not data.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Date(_) | Self::Malformed(_))
    }
}

impl From<String> for MonthCell {
    fn from(raw: String) -> Self {
        Self::decode(&raw)
    }
}

impl From<MonthCell> for String {
    fn from(cell: MonthCell) -> Self {
        cell.encode()
    }
}
