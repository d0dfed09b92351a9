use super::HealthStore;
use crate::{
    cell::MonthCell,
    error::{TrackError, TrackResult},
    types::CustomerId,
};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

/// One monthly-history row as loaded from the store, joined with the
/// owning registry row's network name for deterministic aggregation.
///
/// `history` keys are `"YYYY-MM"` bucket keys. A month with five runs
/// still holds exactly one entry (the latest), which is why
/// `total_runs` is carried separately and never counted off this map.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub customer_id: CustomerId,
    pub network_name: String,
    pub total_runs: i64,
    pub history: BTreeMap<String, MonthCell>,
}

fn decode_history(raw: &str) -> Result<BTreeMap<String, MonthCell>, serde_json::Error> {
    serde_json::from_str(raw)
}

impl HealthStore {
    // ── Monthly history ───────────────────────────────────────────

    /// Insert the empty history row for a freshly registered customer.
    pub(super) fn create_history_row(&self, customer_id: &CustomerId) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO monthly_history (customer_id, total_runs, history_json)
             VALUES (?1, 0, '{}')",
            params![customer_id],
        )?;
        Ok(())
    }

    pub fn history_row(&self, customer_id: &CustomerId) -> TrackResult<HistoryRow> {
        let found = self
            .conn
            .query_row(
                "SELECT h.customer_id, c.network_name, h.total_runs, h.history_json
                 FROM monthly_history h
                 JOIN customer c ON c.customer_id = h.customer_id
                 WHERE h.customer_id = ?1",
                params![customer_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let (customer_id, network_name, total_runs, history_json) =
            found.ok_or_else(|| TrackError::CustomerNotFound {
                id: customer_id.clone(),
            })?;

        Ok(HistoryRow {
            customer_id,
            network_name,
            total_runs,
            history: decode_history(&history_json)?,
        })
    }

    /// All history rows for one display name, active networks only,
    /// ordered by (network_name, customer_id).
    pub fn history_rows_for_name(&self, name: &str) -> TrackResult<Vec<HistoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.customer_id, c.network_name, h.total_runs, h.history_json
             FROM monthly_history h
             JOIN customer c ON c.customer_id = h.customer_id
             WHERE c.name = ?1 AND c.status = 'active'
             ORDER BY c.network_name ASC, c.customer_id ASC",
        )?;
        let raw_rows = stmt
            .query_map(params![name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|(customer_id, network_name, total_runs, history_json)| {
                Ok(HistoryRow {
                    customer_id,
                    network_name,
                    total_runs,
                    history: decode_history(&history_json)?,
                })
            })
            .collect()
    }

    /// Every active history row. Used by the counter audit.
    pub fn all_history_rows(&self) -> TrackResult<Vec<HistoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.customer_id, c.network_name, h.total_runs, h.history_json
             FROM monthly_history h
             JOIN customer c ON c.customer_id = h.customer_id
             WHERE c.status = 'active'
             ORDER BY c.name ASC, c.network_name ASC, c.customer_id ASC",
        )?;
        let raw_rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|(customer_id, network_name, total_runs, history_json)| {
                Ok(HistoryRow {
                    customer_id,
                    network_name,
                    total_runs,
                    history: decode_history(&history_json)?,
                })
            })
            .collect()
    }

    /// Write back a row's counter and map. Only the reconciler and the
    /// audit call this; readers never do.
    pub fn save_history_row(&self, row: &HistoryRow) -> TrackResult<()> {
        let history_json = serde_json::to_string(&row.history)?;
        let changed = self.conn.execute(
            "UPDATE monthly_history SET total_runs = ?1, history_json = ?2
             WHERE customer_id = ?3",
            params![row.total_runs, history_json, &row.customer_id],
        )?;
        if changed == 0 {
            return Err(TrackError::CustomerNotFound {
                id: row.customer_id.clone(),
            });
        }
        Ok(())
    }
}
