//! The write path: fold run-completion events into monthly history.
//!
//! Two quantities live on every history row and they are never computed
//! from each other:
//!   - `total_runs`    = authoritative event count (run_event rows)
//!   - `history`       = latest-per-month display cache
//! A month with five runs holds one map entry but contributes five to the
//! counter.
//!
//! Execution: each `record_completion` runs inside one store transaction,
//! so concurrent completions for the same row serialize and the
//! read-compare-write on the month slot cannot race.

use crate::{
    cell::{MonthCell, StatusSentinel},
    error::{TrackError, TrackResult},
    event::RunEvent,
    store::HealthStore,
    types::{month_key, CustomerId, MonthNum},
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub struct HistoryReconciler {
    store: HealthStore,
}

/// What one `record_completion` call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// False when the session id had been seen before (replay).
    pub newly_recorded: bool,
    /// True when the month slot changed (new entry, sentinel replaced,
    /// or a later date superseding an earlier one).
    pub month_updated: bool,
    /// The counter after this call; always the authoritative count.
    pub total_runs: i64,
}

/// One counter fix applied by `audit_counters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterCorrection {
    pub customer_id: CustomerId,
    pub stored: i64,
    pub actual: i64,
}

impl HistoryReconciler {
    pub fn new(store: HealthStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &HealthStore {
        &self.store
    }

    /// Apply one terminal-success event to its (customer, network) row.
    ///
    /// Idempotent: replaying the same session id changes nothing; an
    /// older date never regresses a month slot. The stored counter is
    /// recomputed from the event log on every call, drift is logged and
    /// overwritten rather than propagated.
    pub fn record_completion(&self, event: &RunEvent) -> TrackResult<CompletionOutcome> {
        let date = parse_event_date(&event.completed_on)?;

        let txn = self.store.begin()?;
        let mut row = self.store.history_row(&event.customer_id)?;
        let newly_recorded =
            self.store
                .record_run_event(&event.session_id, &event.customer_id, date)?;

        let month_updated = apply_latest_wins(&mut row.history, &month_key(date), date);

        let actual = self.store.run_count(&event.customer_id)?;
        let expected_prior = actual - i64::from(newly_recorded);
        if row.total_runs != expected_prior {
            log::warn!(
                "customer {}: stored total_runs {} != authoritative {}; correcting",
                event.customer_id,
                row.total_runs,
                actual
            );
        }
        row.total_runs = actual;

        self.store.save_history_row(&row)?;
        txn.commit()?;

        log::debug!(
            "customer {} session {} on {date}: recorded={newly_recorded} month_updated={month_updated} total_runs={actual}",
            event.customer_id,
            event.session_id,
        );

        Ok(CompletionOutcome {
            newly_recorded,
            month_updated,
            total_runs: actual,
        })
    }

    /// Seed a status label for a month that has no run yet.
    ///
    /// A concrete date is never downgraded to a label; seeding over an
    /// existing sentinel or a malformed legacy value is allowed. Returns
    /// whether the slot was written.
    pub fn mark_month_status(
        &self,
        customer_id: &CustomerId,
        year: i32,
        month: MonthNum,
        sentinel: StatusSentinel,
    ) -> TrackResult<bool> {
        let first_of_month =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| TrackError::InvalidEvent {
                reason: format!("invalid month {year}-{month:02}"),
            })?;
        let key = month_key(first_of_month);

        let txn = self.store.begin()?;
        let mut row = self.store.history_row(customer_id)?;

        if matches!(row.history.get(&key), Some(MonthCell::Date(_))) {
            return Ok(false); // txn drops, nothing written
        }
        row.history.insert(key, MonthCell::Sentinel(sentinel));
        self.store.save_history_row(&row)?;
        txn.commit()?;
        Ok(true)
    }

    /// Recompute every active row's counter from the event log, fixing
    /// and logging any drift. Idempotent; returns the corrections made.
    ///
    /// With the write-time recompute in `record_completion` this should
    /// never find anything; it exists for databases that predate it.
    pub fn audit_counters(&self) -> TrackResult<Vec<CounterCorrection>> {
        let mut corrections = Vec::new();
        for mut row in self.store.all_history_rows()? {
            let actual = self.store.run_count(&row.customer_id)?;
            if row.total_runs == actual {
                continue;
            }
            log::warn!(
                "audit: customer {} stored total_runs {} != authoritative {}; fixed",
                row.customer_id,
                row.total_runs,
                actual
            );
            corrections.push(CounterCorrection {
                customer_id: row.customer_id.clone(),
                stored: row.total_runs,
                actual,
            });
            row.total_runs = actual;
            self.store.save_history_row(&row)?;
        }
        Ok(corrections)
    }
}

/// Set `history[key] = date` iff the slot is empty, a sentinel, malformed,
/// or a strictly earlier date. A month records its most recent run.
fn apply_latest_wins(
    history: &mut BTreeMap<String, MonthCell>,
    key: &str,
    date: NaiveDate,
) -> bool {
    match history.get(key) {
        Some(MonthCell::Date(existing)) if *existing >= date => false,
        _ => {
            history.insert(key.to_string(), MonthCell::Date(date));
            true
        }
    }
}

/// Parse an event timestamp. Accepts a bare ISO date or an ISO datetime
/// (time-of-day is ignored for bucketing). Missing or unparseable input
/// is rejected, never guessed.
fn parse_event_date(raw: &str) -> TrackResult<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackError::InvalidEvent {
            reason: "missing completion timestamp".to_string(),
        });
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    match chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => Ok(dt.date()),
        Err(e) => Err(TrackError::InvalidEvent {
            reason: format!("unparseable completion timestamp '{trimmed}': {e}"),
        }),
    }
}
