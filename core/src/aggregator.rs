//! Read-side folds: stored history rows → 12-slot month arrays.
//!
//! Everything here is pure. Arrays are produced fresh on every call and
//! never persisted or cached; a filtered or merged view never leaks back
//! into stored state.

use crate::{
    cell::MonthCell,
    store::HistoryRow,
    types::{split_month_key, MonthNum},
};

pub const MONTHS_PER_YEAR: usize = 12;

/// A derived, always-12-slot view of a year's months.
/// Index 0 = January, 11 = December.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthArray([MonthCell; MONTHS_PER_YEAR]);

impl MonthArray {
    pub fn blank() -> Self {
        Self(std::array::from_fn(|_| MonthCell::Empty))
    }

    /// Slot for a 1-based calendar month. Panics on 0 or >12; callers
    /// hold a `MonthNum` that has already been range-checked.
    pub fn slot(&self, month: MonthNum) -> &MonthCell {
        &self.0[month as usize - 1]
    }

    pub fn set_slot(&mut self, month: MonthNum, cell: MonthCell) {
        self.0[month as usize - 1] = cell;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MonthCell> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[MonthCell] {
        &self.0
    }
}

impl Default for MonthArray {
    fn default() -> Self {
        Self::blank()
    }
}

impl std::ops::Index<usize> for MonthArray {
    type Output = MonthCell;

    fn index(&self, index: usize) -> &MonthCell {
        &self.0[index]
    }
}

/// Project one row's sparse map onto 12 slots. Output length is always
/// 12 no matter how sparse the input is; absent months stay `Empty`.
///
/// Keys from different years land in the same slot; collisions resolve
/// with the same precedence as the customer merge (latest date wins).
pub fn network_array(row: &HistoryRow) -> MonthArray {
    let mut array = MonthArray::blank();
    fold_row(&mut array, row);
    array
}

/// Merge all of one customer's network rows into a single 12-slot view.
///
/// Per-month precedence across rows:
///   1. the latest concrete date,
///   2. else the first sentinel encountered,
///   3. else the first malformed legacy value encountered,
///   4. else `Empty`.
/// Rows are sorted by (network_name, customer_id) before folding so
/// "first encountered" is reproducible regardless of input order.
pub fn customer_array(rows: &[HistoryRow]) -> MonthArray {
    let mut sorted: Vec<&HistoryRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        a.network_name
            .cmp(&b.network_name)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });

    let mut array = MonthArray::blank();
    for row in sorted {
        fold_row(&mut array, row);
    }
    array
}

/// Combined counter for one customer: the sum of each row's stored
/// (authoritative) counter. Never recomputed by counting array entries;
/// the map only ever holds one entry per month, so that would undercount.
pub fn total_runs(rows: &[HistoryRow]) -> i64 {
    rows.iter().map(|r| r.total_runs).sum()
}

fn fold_row(array: &mut MonthArray, row: &HistoryRow) {
    for (key, cell) in &row.history {
        let Some((_, month)) = split_month_key(key) else {
            log::warn!(
                "customer {}: skipping malformed month key '{key}'",
                row.customer_id
            );
            continue;
        };
        merge_slot(array, month, cell);
    }
}

fn merge_slot(array: &mut MonthArray, month: MonthNum, incoming: &MonthCell) {
    let current = array.slot(month);
    let replace = match (current, incoming) {
        (_, MonthCell::Empty) => false,
        (MonthCell::Empty, _) => true,
        // A later date supersedes; anything else loses to a date already there.
        (MonthCell::Date(cur), MonthCell::Date(new)) => new > cur,
        (MonthCell::Date(_), _) => false,
        (_, MonthCell::Date(_)) => true,
        // First sentinel sticks; a label beats junk.
        (MonthCell::Sentinel(_), _) => false,
        (MonthCell::Malformed(_), MonthCell::Sentinel(_)) => true,
        (MonthCell::Malformed(_), MonthCell::Malformed(_)) => false,
    };
    if replace {
        array.set_slot(month, incoming.clone());
    }
}
