//! The shared dashboard/export read path.
//!
//! RULE: the dashboard renderer and the export layer both go through
//! `ReportBuilder`; neither re-implements aggregation or formatting, so
//! the two surfaces cannot drift apart. For the same stored state and the
//! same (or no) filter, their rows are identical by construction.

use crate::{
    aggregator,
    config::DisplayConfig,
    error::TrackResult,
    formatter::{self, TokenStyle},
    store::HealthStore,
    types::MonthNum,
};
use serde::{Deserialize, Serialize};

/// Inclusive 1-based month window, e.g. 9..=10 for Sept–Oct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: MonthNum,
    pub end: MonthNum,
}

impl MonthRange {
    pub fn new(start: MonthNum, end: MonthNum) -> Self {
        Self { start, end }
    }
}

/// One merged row of the customer dashboard: all networks folded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub name: String,
    pub networks: Vec<String>,
    pub total_runs: i64,
    pub months: [String; 12],
}

/// One unmerged per-network row, for the drill-down view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRow {
    pub name: String,
    pub network_name: String,
    pub total_runs: i64,
    pub months: [String; 12],
}

pub struct ReportBuilder {
    store: HealthStore,
    config: DisplayConfig,
}

impl ReportBuilder {
    pub fn new(store: HealthStore, config: DisplayConfig) -> Self {
        Self { store, config }
    }

    fn style(&self) -> TokenStyle {
        self.config.token_style
    }

    /// One merged row per distinct active display name, alphabetical.
    /// With a range, slots outside it are blanked and (when configured)
    /// customers with no data inside it are dropped.
    pub fn dashboard(&self, range: Option<MonthRange>) -> TrackResult<Vec<DashboardRow>> {
        let mut out = Vec::new();
        for name in self.store.active_display_names()? {
            let rows = self.store.history_rows_for_name(&name)?;
            let mut array = aggregator::customer_array(&rows);

            if let Some(r) = range {
                array = formatter::apply_month_range_filter(&array, r.start, r.end);
                if self.config.drop_empty_rows
                    && !formatter::has_data_in_range(&array, r.start, r.end)
                {
                    continue;
                }
            }

            out.push(DashboardRow {
                networks: rows.iter().map(|r| r.network_name.clone()).collect(),
                total_runs: aggregator::total_runs(&rows),
                months: formatter::render_array(&array, self.style()),
                name,
            });
        }
        Ok(out)
    }

    /// Per-network rows for one display name, ordered by network name.
    pub fn network_rows(
        &self,
        name: &str,
        range: Option<MonthRange>,
    ) -> TrackResult<Vec<NetworkRow>> {
        let mut out = Vec::new();
        for row in self.store.history_rows_for_name(name)? {
            let mut array = aggregator::network_array(&row);

            if let Some(r) = range {
                array = formatter::apply_month_range_filter(&array, r.start, r.end);
                if self.config.drop_empty_rows
                    && !formatter::has_data_in_range(&array, r.start, r.end)
                {
                    continue;
                }
            }

            out.push(NetworkRow {
                name: name.to_string(),
                network_name: row.network_name.clone(),
                total_runs: row.total_runs,
                months: formatter::render_array(&array, self.style()),
            });
        }
        Ok(out)
    }

    /// The export surface is the dashboard surface. Spreadsheet/CSV
    /// writers consume these rows as-is.
    pub fn export(&self, range: Option<MonthRange>) -> TrackResult<Vec<DashboardRow>> {
        self.dashboard(range)
    }
}
