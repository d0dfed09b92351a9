//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database.
//! Reconciler, aggregator and report code call store methods; they never
//! execute SQL directly.

use crate::{
    error::TrackResult,
    types::{CustomerId, SessionId},
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction};

mod customer;
mod history;

pub use customer::CustomerRecord;
pub use history::HistoryRow;

pub struct HealthStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl HealthStore {
    pub fn open(path: &str) -> TrackResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TrackResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> TrackResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TrackResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Start a transaction on the store's connection. Statements issued
    /// through this store while the guard is live join the transaction;
    /// dropping the guard without `commit()` rolls everything back.
    pub fn begin(&self) -> TrackResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // ── Run-event log ──────────────────────────────────────────

    /// Append a terminal-success event. `session_id` is the idempotency
    /// key: a replayed event is ignored. Returns whether a new row was
    /// actually inserted.
    pub fn record_run_event(
        &self,
        session_id: &SessionId,
        customer_id: &CustomerId,
        completed_on: NaiveDate,
    ) -> TrackResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO run_event (session_id, customer_id, completed_on)
             VALUES (?1, ?2, ?3)",
            params![
                session_id,
                customer_id,
                completed_on.format("%Y-%m-%d").to_string()
            ],
        )?;
        Ok(inserted == 1)
    }

    /// The authoritative run count for one (customer, network).
    /// This, never the monthly map, is what total_runs must equal.
    pub fn run_count(&self, customer_id: &CustomerId) -> TrackResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM run_event WHERE customer_id = ?1",
                params![customer_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Completion dates logged for one customer, oldest first.
    /// Used by the audit path and tests.
    pub fn run_dates(&self, customer_id: &CustomerId) -> TrackResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_on FROM run_event
             WHERE customer_id = ?1
             ORDER BY completed_on ASC, session_id ASC",
        )?;
        let dates = stmt
            .query_map(params![customer_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }
}
