//! Table overviews and the end-of-run report.
//!
//! [`describe_table`] gives a per-column overview (type and non-null count)
//! that the pipeline logs for each input and for the merged table.
//! [`RunReport`] wraps a [`RunSummary`] with run metadata for the `--json`
//! output, and [`format_summary`] renders the human-readable version.

use crate::config::PrepConfig;
use crate::types::{DatabaseOutcome, RunSummary};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::info;

// ============================================================================
// Table overviews
// ============================================================================

/// One column of a table overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    pub non_null: usize,
}

/// Name, type and non-null count of every column, in column order.
pub fn describe_table(df: &DataFrame) -> Vec<ColumnOverview> {
    df.get_columns()
        .iter()
        .map(|column| ColumnOverview {
            name: column.name().to_string(),
            dtype: column.dtype().to_string(),
            non_null: column.len() - column.null_count(),
        })
        .collect()
}

/// Log the overview of `df` at info level.
pub fn log_overview(label: &str, df: &DataFrame) {
    info!("{}: {} rows x {} columns", label, df.height(), df.width());
    for column in describe_table(df) {
        info!(
            "  {:<24} {:<10} {} non-null",
            column.name, column.dtype, column.non_null
        );
    }
}

// ============================================================================
// Run report
// ============================================================================

/// Machine-readable report of a run, printed with `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Local time the report was generated
    pub generated_at: String,
    pub inputs: Vec<String>,
    pub dry_run: bool,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(config: &PrepConfig, summary: RunSummary) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            inputs: [
                &config.inputs.employees,
                &config.inputs.salaries,
                &config.inputs.pensions,
            ]
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
            dry_run: config.dry_run,
            summary,
        }
    }
}

/// Multi-line, human-readable summary of a run.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Payroll preparation complete in {} ms", summary.duration_ms);
    for stats in &summary.cleaning {
        let _ = writeln!(
            out,
            "  {:<10} {} -> {} rows ({} duplicates, {} defaults, {} invalid dates)",
            stats.table.display_name(),
            stats.rows_before,
            stats.rows_after,
            stats.duplicates_removed,
            stats.defaults_filled,
            stats.invalid_dates
        );
    }
    let _ = writeln!(out, "  exchange rate: {}", summary.exchange_rate);
    let _ = writeln!(
        out,
        "  merged: {} rows x {} columns",
        summary.merged_rows, summary.merged_columns
    );

    let outliers = &summary.outliers;
    match (outliers.lower_bound, outliers.upper_bound) {
        (Some(lower), Some(upper)) => {
            let _ = writeln!(
                out,
                "  {} outliers: {} cleared outside [{:.2}, {:.2}], {} imputed",
                outliers.column, outliers.outliers_cleared, lower, upper, outliers.values_imputed
            );
        }
        _ => {
            let _ = writeln!(out, "  {} outliers: no values", outliers.column);
        }
    }

    let _ = writeln!(out, "  database: {}", summary.database);
    match &summary.backup_path {
        Some(path) => {
            let _ = writeln!(out, "  backup: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "  backup: not written");
        }
    }

    out
}

/// Whether the run finished with every side effect applied.
pub fn fully_persisted(summary: &RunSummary) -> bool {
    matches!(summary.database, DatabaseOutcome::Inserted { .. }) && summary.backup_path.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableKind;
    use crate::types::{CleaningStats, ExchangeRate, OutlierReport};
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            cleaning: vec![CleaningStats::new(TableKind::Employees, 3)],
            exchange_rate: ExchangeRate::fallback(),
            merged_rows: 4,
            merged_columns: 10,
            outliers: OutlierReport {
                lower_bound: Some(8.0),
                upper_bound: Some(16.0),
                outliers_cleared: 1,
                values_imputed: 1,
                ..OutlierReport::empty("salary")
            },
            database: DatabaseOutcome::Skipped {
                reason: "no database configured".to_string(),
            },
            backup_path: Some(PathBuf::from("out.csv")),
            duration_ms: 12,
        }
    }

    #[test]
    fn test_describe_table() {
        let df = df![
            "employee_id" => [Some(1_i64), Some(2), None],
            "email" => [Some("a@x.io"), None, None],
        ]
        .unwrap();

        let overview = describe_table(&df);

        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].name, "employee_id");
        assert_eq!(overview[0].dtype, "i64");
        assert_eq!(overview[0].non_null, 2);
        assert_eq!(overview[1].dtype, "str");
        assert_eq!(overview[1].non_null, 1);
    }

    #[test]
    fn test_format_summary() {
        let text = format_summary(&summary());

        assert!(text.contains("exchange rate: 1 (fallback)"));
        assert!(text.contains("merged: 4 rows x 10 columns"));
        assert!(text.contains("1 cleared outside [8.00, 16.00]"));
        assert!(text.contains("database: skipped (no database configured)"));
        assert!(text.contains("backup: out.csv"));
    }

    #[test]
    fn test_run_report_serializes_summary() {
        let report = RunReport::new(&PrepConfig::default(), summary());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["inputs"][0], "hr_data.csv");
        assert_eq!(json["summary"]["merged_rows"], 4);
        assert_eq!(json["summary"]["database"]["status"], "skipped");
        assert!(!fully_persisted(&report.summary));
    }
}
