//! Write-path tests for the history reconciler.
//!
//! Tests cover: idempotent replay, latest-wins month slots, counter
//! independence from the sparse map, timestamp rejection, sentinel
//! seeding, and counter-drift repair.

use chrono::NaiveDate;
use healthtrack_core::{
    HealthStore, HistoryReconciler, MonthCell, RunEvent, StatusSentinel, TrackError,
};

fn reconciler() -> HistoryReconciler {
    let store = HealthStore::in_memory().expect("open in-memory store");
    store.migrate().expect("migrate");
    HistoryReconciler::new(store)
}

fn register(r: &HistoryReconciler, name: &str, network: &str) -> String {
    r.store()
        .register_customer(name, network, date(2025, 1, 1))
        .expect("register customer")
        .customer_id
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn single_completion_round_trip() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    let outcome = r
        .record_completion(&RunEvent::new("HC-1", id.clone(), "2025-10-08"))
        .unwrap();
    assert!(outcome.newly_recorded);
    assert!(outcome.month_updated);
    assert_eq!(outcome.total_runs, 1);

    let row = r.store().history_row(&id).unwrap();
    assert_eq!(row.total_runs, 1);
    assert_eq!(row.history.len(), 1, "exactly one month entry expected");
    assert_eq!(
        row.history.get("2025-10"),
        Some(&MonthCell::Date(date(2025, 10, 8)))
    );
}

#[test]
fn replayed_session_changes_nothing() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");
    let event = RunEvent::new("HC-1", id.clone(), "2025-10-08");

    r.record_completion(&event).unwrap();
    let replay = r.record_completion(&event).unwrap();

    assert!(!replay.newly_recorded, "replay must not count as a new run");
    assert!(!replay.month_updated);
    assert_eq!(replay.total_runs, 1);

    let row = r.store().history_row(&id).unwrap();
    assert_eq!(row.total_runs, 1);
    assert_eq!(row.history.len(), 1);
}

/// Two runs in the same month: the map keeps one (latest) entry but the
/// counter counts both. The single most important invariant here.
#[test]
fn same_month_second_session_bumps_counter_not_map() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-10-03"))
        .unwrap();
    r.record_completion(&RunEvent::new("HC-2", id.clone(), "2025-10-25"))
        .unwrap();

    let row = r.store().history_row(&id).unwrap();
    assert_eq!(
        row.history.get("2025-10"),
        Some(&MonthCell::Date(date(2025, 10, 25)))
    );
    assert_eq!(row.history.len(), 1);
    assert_eq!(row.total_runs, 2, "counter must reflect both sessions");

    // The event log keeps both facts even though the map shows one.
    assert_eq!(
        r.store().run_dates(&id).unwrap(),
        vec!["2025-10-03".to_string(), "2025-10-25".to_string()]
    );
}

#[test]
fn latest_wins_regardless_of_arrival_order() {
    let r = reconciler();
    let forward = register(&r, "Acme", "North");
    let reverse = register(&r, "Acme", "South");

    r.record_completion(&RunEvent::new("F-1", forward.clone(), "2025-03-05"))
        .unwrap();
    r.record_completion(&RunEvent::new("F-2", forward.clone(), "2025-03-20"))
        .unwrap();

    r.record_completion(&RunEvent::new("R-1", reverse.clone(), "2025-03-20"))
        .unwrap();
    let out = r
        .record_completion(&RunEvent::new("R-2", reverse.clone(), "2025-03-05"))
        .unwrap();
    assert!(
        !out.month_updated,
        "an older date must not regress the slot"
    );

    for id in [&forward, &reverse] {
        let row = r.store().history_row(id).unwrap();
        assert_eq!(
            row.history.get("2025-03"),
            Some(&MonthCell::Date(date(2025, 3, 20))),
            "final state must be order-independent"
        );
        assert_eq!(row.total_runs, 2);
    }
}

#[test]
fn missing_or_unparseable_timestamp_rejected() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    for bad in ["", "   ", "10/03/2025", "2025-13-40"] {
        let err = r
            .record_completion(&RunEvent::new("HC-bad", id.clone(), bad))
            .unwrap_err();
        assert!(
            matches!(err, TrackError::InvalidEvent { .. }),
            "expected InvalidEvent for '{bad}', got {err:?}"
        );
    }

    // Nothing may have been persisted by the rejected calls.
    assert_eq!(r.store().run_count(&id).unwrap(), 0);
    assert!(r.store().history_row(&id).unwrap().history.is_empty());
}

#[test]
fn datetime_timestamps_bucket_by_calendar_date() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-07-04T09:30:00"))
        .unwrap();

    let row = r.store().history_row(&id).unwrap();
    assert_eq!(
        row.history.get("2025-07"),
        Some(&MonthCell::Date(date(2025, 7, 4)))
    );
}

#[test]
fn seeded_sentinel_is_replaced_by_a_run() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    let written = r
        .mark_month_status(&id, 2025, 6, StatusSentinel::NotStarted)
        .unwrap();
    assert!(written);

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-06-14"))
        .unwrap();

    let row = r.store().history_row(&id).unwrap();
    assert_eq!(
        row.history.get("2025-06"),
        Some(&MonthCell::Date(date(2025, 6, 14)))
    );
}

#[test]
fn date_is_never_downgraded_to_sentinel() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-06-14"))
        .unwrap();
    let written = r
        .mark_month_status(&id, 2025, 6, StatusSentinel::NoReport)
        .unwrap();

    assert!(!written, "a concrete date must survive sentinel seeding");
    let row = r.store().history_row(&id).unwrap();
    assert_eq!(
        row.history.get("2025-06"),
        Some(&MonthCell::Date(date(2025, 6, 14)))
    );
}

#[test]
fn invalid_month_rejected_by_sentinel_seeding() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    let err = r
        .mark_month_status(&id, 2025, 13, StatusSentinel::NotRun)
        .unwrap_err();
    assert!(matches!(err, TrackError::InvalidEvent { .. }));
}

#[test]
fn stale_counter_corrected_on_next_write() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-10-03"))
        .unwrap();

    // Tamper with the stored counter behind the reconciler's back.
    let mut row = r.store().history_row(&id).unwrap();
    row.total_runs = 99;
    r.store().save_history_row(&row).unwrap();

    let outcome = r
        .record_completion(&RunEvent::new("HC-2", id.clone(), "2025-10-25"))
        .unwrap();
    assert_eq!(
        outcome.total_runs, 2,
        "authoritative count must overwrite the drifted counter"
    );
    assert_eq!(r.store().history_row(&id).unwrap().total_runs, 2);
}

#[test]
fn audit_repairs_tampered_counters_and_is_idempotent() {
    let r = reconciler();
    let id = register(&r, "Acme", "North");

    r.record_completion(&RunEvent::new("HC-1", id.clone(), "2025-10-03"))
        .unwrap();
    r.record_completion(&RunEvent::new("HC-2", id.clone(), "2025-10-25"))
        .unwrap();

    let mut row = r.store().history_row(&id).unwrap();
    row.total_runs = 0;
    r.store().save_history_row(&row).unwrap();

    let corrections = r.audit_counters().unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].customer_id, id);
    assert_eq!(corrections[0].stored, 0);
    assert_eq!(corrections[0].actual, 2);
    assert_eq!(r.store().history_row(&id).unwrap().total_runs, 2);

    let second = r.audit_counters().unwrap();
    assert!(second.is_empty(), "a clean database needs no corrections");
}

#[test]
fn unknown_customer_rejected() {
    let r = reconciler();

    let err = r
        .record_completion(&RunEvent::new("HC-1", "no-such-id", "2025-10-08"))
        .unwrap_err();
    assert!(matches!(err, TrackError::CustomerNotFound { .. }));
    assert_eq!(r.store().run_count(&"no-such-id".to_string()).unwrap(), 0);
}
