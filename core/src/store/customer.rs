use super::HealthStore;
use crate::{
    error::{TrackError, TrackResult},
    types::CustomerId,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One registry row. A customer with three networks has three of these,
/// all sharing the same `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub name: String,
    pub network_name: String,
    pub status: String,
    pub created_on: NaiveDate,
}

fn customer_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomerRecord> {
    let created_raw: String = row.get(4)?;
    Ok(CustomerRecord {
        customer_id: row.get(0)?,
        name: row.get(1)?,
        network_name: row.get(2)?,
        status: row.get(3)?,
        created_on: NaiveDate::parse_from_str(&created_raw, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

impl HealthStore {
    // ── Customer registry ─────────────────────────────────────────

    /// Register a (name, network) pair and its empty history row.
    /// Rejects a pair that already exists among active rows.
    pub fn register_customer(
        &self,
        name: &str,
        network_name: &str,
        created_on: NaiveDate,
    ) -> TrackResult<CustomerRecord> {
        if self.find_customer(name, network_name)?.is_some() {
            return Err(TrackError::DuplicateCustomer {
                name: name.to_string(),
                network: network_name.to_string(),
            });
        }

        let record = CustomerRecord {
            customer_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            network_name: network_name.to_string(),
            status: "active".to_string(),
            created_on,
        };

        let txn = self.begin()?;
        self.conn.execute(
            "INSERT INTO customer (customer_id, name, network_name, status, created_on)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &record.customer_id,
                &record.name,
                &record.network_name,
                &record.status,
                record.created_on.format("%Y-%m-%d").to_string(),
            ],
        )?;
        self.create_history_row(&record.customer_id)?;
        txn.commit()?;

        log::debug!(
            "registered customer '{}' network '{}' ({})",
            record.name,
            record.network_name,
            record.customer_id
        );
        Ok(record)
    }

    pub fn customer(&self, customer_id: &CustomerId) -> TrackResult<CustomerRecord> {
        self.conn
            .query_row(
                "SELECT customer_id, name, network_name, status, created_on
                 FROM customer WHERE customer_id = ?1",
                params![customer_id],
                customer_row_mapper,
            )
            .optional()?
            .ok_or_else(|| TrackError::CustomerNotFound {
                id: customer_id.clone(),
            })
    }

    /// Active row for an exact (name, network) pair, if any.
    pub fn find_customer(
        &self,
        name: &str,
        network_name: &str,
    ) -> TrackResult<Option<CustomerRecord>> {
        self.conn
            .query_row(
                "SELECT customer_id, name, network_name, status, created_on
                 FROM customer
                 WHERE name = ?1 AND network_name = ?2 AND status = 'active'",
                params![name, network_name],
                customer_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All active rows sharing one display name, ordered by network name
    /// (then id) so downstream folds are reproducible.
    pub fn customers_by_name(&self, name: &str) -> TrackResult<Vec<CustomerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, name, network_name, status, created_on
             FROM customer
             WHERE name = ?1 AND status = 'active'
             ORDER BY network_name ASC, customer_id ASC",
        )?;
        let rows = stmt.query_map(params![name], customer_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Distinct active display names, alphabetical. One dashboard row each.
    pub fn active_display_names(&self) -> TrackResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT name FROM customer
             WHERE status = 'active'
             ORDER BY name ASC",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Soft delete: the row keeps its history but disappears from every
    /// active-only query, and the (name, network) pair becomes free again.
    pub fn soft_delete_customer(&self, customer_id: &CustomerId) -> TrackResult<()> {
        let changed = self.conn.execute(
            "UPDATE customer SET status = 'deleted'
             WHERE customer_id = ?1 AND status = 'active'",
            params![customer_id],
        )?;
        if changed == 0 {
            return Err(TrackError::CustomerNotFound {
                id: customer_id.clone(),
            });
        }
        log::debug!("soft-deleted customer {customer_id}");
        Ok(())
    }
}
