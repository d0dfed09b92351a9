//! Display formatting: cells → short tokens, plus month-range narrowing.
//!
//! Every function here is total and read-only. A bad stored value never
//! fails a dashboard or export request; at worst the raw string is shown
//! verbatim and a warning is logged.

use crate::{
    aggregator::{MonthArray, MONTHS_PER_YEAR},
    cell::{MonthCell, EMPTY_TOKEN},
    types::MonthNum,
};
use serde::{Deserialize, Serialize};

/// How a concrete date renders. Both place the day first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStyle {
    /// "09/10", day/month numeric.
    #[default]
    DayMonthNumeric,
    /// "09 Oct", day and abbreviated month name.
    DayAbbrevMonth,
}

/// Render one cell as its display token.
///
/// Dates render from their own calendar month, not from whatever bucket
/// the merge placed them under, so a token always names the true month.
/// Sentinels pass through verbatim; malformed values pass through
/// verbatim with a warning, never dropped.
pub fn format_cell(cell: &MonthCell, style: TokenStyle) -> String {
    match cell {
        MonthCell::Empty => EMPTY_TOKEN.to_string(),
        MonthCell::Sentinel(s) => s.label().to_string(),
        MonthCell::Date(date) => match style {
            TokenStyle::DayMonthNumeric => date.format("%d/%m").to_string(),
            TokenStyle::DayAbbrevMonth => date.format("%d %b").to_string(),
        },
        MonthCell::Malformed(raw) => {
            log::warn!("displaying malformed cell value verbatim: '{raw}'");
            raw.clone()
        }
    }
}

/// `format_cell` applied slot-wise: the one path by which arrays become
/// display tokens, shared by dashboard and export.
pub fn render_array(array: &MonthArray, style: TokenStyle) -> [String; MONTHS_PER_YEAR] {
    std::array::from_fn(|i| format_cell(&array[i], style))
}

/// A fresh array with every slot outside `[start, end]` (inclusive,
/// 1-based) forced to `Empty`. The input is never mutated, so filtered
/// exports cannot corrupt a live view. Bounds are clamped to 1..=12; an
/// inverted range filters everything out.
pub fn apply_month_range_filter(array: &MonthArray, start: MonthNum, end: MonthNum) -> MonthArray {
    let (start, end) = (start.clamp(1, 12), end.clamp(1, 12));
    let mut filtered = array.clone();
    for month in 1..=MONTHS_PER_YEAR as MonthNum {
        if month < start || month > end {
            filtered.set_slot(month, MonthCell::Empty);
        }
    }
    filtered
}

/// True iff some slot in `[start, end]` carries data: a concrete date or
/// a malformed legacy value. Sentinels and empty slots do not count.
/// Callers use this to drop customer rows entirely from filtered views.
pub fn has_data_in_range(array: &MonthArray, start: MonthNum, end: MonthNum) -> bool {
    let (start, end) = (start.clamp(1, 12), end.clamp(1, 12));
    (start..=end).any(|month| array.slot(month).is_data())
}
