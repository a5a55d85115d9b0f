//! Result types shared by the pipeline stages.
//!
//! Every type here is `Serialize` so a run can be reported as JSON.

use crate::schema::TableKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What cleaning did to one input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub table: TableKind,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Null cells replaced with a fixed default.
    pub defaults_filled: usize,
    /// Non-null date cells that could not be parsed and became null.
    pub invalid_dates: usize,
    pub duplicates_removed: usize,
}

impl CleaningStats {
    pub fn new(table: TableKind, rows_before: usize) -> Self {
        Self {
            table,
            rows_before,
            rows_after: rows_before,
            defaults_filled: 0,
            invalid_dates: 0,
            duplicates_removed: 0,
        }
    }
}

/// Where the exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Returned by the rate provider.
    Fetched,
    /// The provider failed and the neutral rate 1.0 was used.
    Fallback,
}

/// GBP to target-currency conversion factor used for `salary_usd`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub value: f64,
    pub source: RateSource,
}

impl ExchangeRate {
    /// Rate used when the provider fails.
    pub const FALLBACK_VALUE: f64 = 1.0;

    pub fn fetched(value: f64) -> Self {
        Self {
            value,
            source: RateSource::Fetched,
        }
    }

    pub fn fallback() -> Self {
        Self {
            value: Self::FALLBACK_VALUE,
            source: RateSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            RateSource::Fetched => write!(f, "{}", self.value),
            RateSource::Fallback => write!(f, "{} (fallback)", self.value),
        }
    }
}

/// Result of the IQR outlier pass over one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// Median of the values left after clearing outliers.
    pub median: Option<f64>,
    pub outliers_cleared: usize,
    /// Nulls (original and cleared) replaced with the median.
    pub values_imputed: usize,
}

impl OutlierReport {
    pub fn empty(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            q1: None,
            q3: None,
            lower_bound: None,
            upper_bound: None,
            median: None,
            outliers_cleared: 0,
            values_imputed: 0,
        }
    }
}

/// Outcome of the database append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatabaseOutcome {
    Inserted { rows: usize },
    Failed { message: String },
    Skipped { reason: String },
}

impl fmt::Display for DatabaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted { rows } => write!(f, "inserted {} rows", rows),
            Self::Failed { message } => write!(f, "failed: {}", message),
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
        }
    }
}

/// Everything a run produced, apart from the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub cleaning: Vec<CleaningStats>,
    pub exchange_rate: ExchangeRate,
    pub merged_rows: usize,
    pub merged_columns: usize,
    pub outliers: OutlierReport,
    pub database: DatabaseOutcome,
    /// `None` in dry-run mode.
    pub backup_path: Option<PathBuf>,
    pub duration_ms: u64,
}
