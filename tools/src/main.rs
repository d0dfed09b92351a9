//! hct-runner: headless importer and dashboard printer for the
//! health-check tracker.
//!
//! Usage:
//!   hct-runner --db runs.db --events completions.jsonl
//!   hct-runner --db runs.db --months 9-10 --style abbrev
//!   hct-runner --db runs.db --audit
//!
//! Each line of the events file is one terminal-success fact:
//!   {"customer":"Acme","network":"North","session_id":"HC-123","completed_on":"2025-10-08"}
//! Unknown (customer, network) pairs are registered on first sight.

use anyhow::Result;
use healthtrack_core::{
    config::DisplayConfig, formatter::TokenStyle, HealthStore, HistoryReconciler, MonthRange,
    ReportBuilder, RunEvent, TrackError,
};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(serde::Deserialize)]
struct EventLine {
    customer: String,
    network: String,
    session_id: String,
    completed_on: String,
}

#[derive(Default)]
struct ImportTally {
    applied: u64,
    replayed: u64,
    rejected: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = string_arg(&args, "--db").unwrap_or_else(|| ":memory:".to_string());
    let events_path = string_arg(&args, "--events");
    let config_path = string_arg(&args, "--config");
    let months = string_arg(&args, "--months");
    let style = string_arg(&args, "--style");
    let audit = args.iter().any(|a| a == "--audit");

    // For :memory: use SQLite shared-memory URI so the reconciler store
    // and the report store both see the same in-memory database.
    let db_effective: String = if db == ":memory:" {
        format!("file:hctrun_{}?mode=memory&cache=shared", unix_seconds())
    } else {
        db.clone()
    };
    let store = HealthStore::open(&db_effective)?;
    store.migrate()?;

    let mut config = match &config_path {
        Some(p) => DisplayConfig::load(p)?,
        None => DisplayConfig::default(),
    };
    if let Some(style) = style.as_deref() {
        config.token_style = parse_style(style)?;
    }
    let range = months.as_deref().map(parse_month_range).transpose()?;

    let report = ReportBuilder::new(store.reopen()?, config);
    let reconciler = HistoryReconciler::new(store);

    if let Some(path) = events_path {
        let tally = import_events(&reconciler, &path)?;
        println!("=== IMPORT ===");
        println!("  file:     {path}");
        println!("  applied:  {}", tally.applied);
        println!("  replayed: {}", tally.replayed);
        println!("  rejected: {}", tally.rejected);
        println!();
    }

    if audit {
        let corrections = reconciler.audit_counters()?;
        println!("=== COUNTER AUDIT ===");
        if corrections.is_empty() {
            println!("  all counters match the event log");
        } else {
            for c in &corrections {
                println!(
                    "  {}: total_runs {} -> {}",
                    c.customer_id, c.stored, c.actual
                );
            }
        }
        println!();
    }

    print_dashboard(&report, range)?;
    Ok(())
}

fn import_events(reconciler: &HistoryReconciler, path: &str) -> Result<ImportTally> {
    let reader = BufReader::new(File::open(path)?);
    let mut tally = ImportTally::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: EventLine = match serde_json::from_str(&line) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("line {}: unparseable event skipped: {e}", line_no + 1);
                tally.rejected += 1;
                continue;
            }
        };

        let store = reconciler.store();
        let customer = match store.find_customer(&parsed.customer, &parsed.network)? {
            Some(c) => c,
            None => {
                let created = chrono::Local::now().date_naive();
                store.register_customer(&parsed.customer, &parsed.network, created)?
            }
        };

        let event = RunEvent::new(parsed.session_id, customer.customer_id, parsed.completed_on);
        match reconciler.record_completion(&event) {
            Ok(outcome) if outcome.newly_recorded => tally.applied += 1,
            Ok(_) => tally.replayed += 1,
            Err(TrackError::InvalidEvent { reason }) => {
                log::warn!("line {}: rejected: {reason}", line_no + 1);
                tally.rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(tally)
}

fn print_dashboard(report: &ReportBuilder, range: Option<MonthRange>) -> Result<()> {
    const MONTH_NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let rows = report.dashboard(range)?;
    println!("=== DASHBOARD ===");
    if let Some(r) = range {
        println!(
            "  (months {}-{})",
            MONTH_NAMES[r.start.clamp(1, 12) as usize - 1],
            MONTH_NAMES[r.end.clamp(1, 12) as usize - 1]
        );
    }
    if rows.is_empty() {
        println!("  (no customers)");
        return Ok(());
    }

    for row in &rows {
        println!(
            "  {} [{}]  runs={}",
            row.name,
            row.networks.join(", "),
            row.total_runs
        );
        let cells: Vec<String> = row
            .months
            .iter()
            .zip(MONTH_NAMES)
            .map(|(token, month)| format!("{month} {token}"))
            .collect();
        println!("    {}", cells.join(" | "));
    }
    Ok(())
}

fn parse_month_range(raw: &str) -> Result<MonthRange> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("--months expects START-END, e.g. 9-10"))?;
    Ok(MonthRange::new(start.trim().parse()?, end.trim().parse()?))
}

fn parse_style(raw: &str) -> Result<TokenStyle> {
    match raw {
        "numeric" => Ok(TokenStyle::DayMonthNumeric),
        "abbrev" => Ok(TokenStyle::DayAbbrevMonth),
        other => Err(anyhow::anyhow!(
            "--style expects 'numeric' or 'abbrev', got '{other}'"
        )),
    }
}

fn string_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
