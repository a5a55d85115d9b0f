//! Payroll Preparation Library
//!
//! Batch preparation of HR, salary and pension datasets for payroll
//! reporting, built on Polars.
//!
//! # Overview
//!
//! One run goes through a fixed sequence of stages:
//!
//! - **Loading**: three CSV inputs with required-column checks
//! - **Exchange Rate**: GBP conversion rate from a [`rates::RateProvider`], 1.0 on failure
//! - **Cleaning**: default filling, lenient date parsing, name/email normalization,
//!   keep-last de-duplication
//! - **Merging**: left joins on `employee_id` and the derived `salary_usd` column
//! - **Outlier Correction**: IQR clearing and median imputation of `salary`
//! - **Persistence**: append to a database table (failures tolerated) and a CSV backup
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use payroll_prep::{Pipeline, PrepConfig};
//! use payroll_prep::config::DatabaseConfig;
//!
//! let config = PrepConfig::builder()
//!     .employees_path("data/hr_data.csv")
//!     .salaries_path("data/salary_data.csv")
//!     .pensions_path("data/pension_data.csv")
//!     .output_path("out/cleaned_merged_data.csv")
//!     .database(DatabaseConfig::from_env()?)
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("{} rows, rate {}", output.summary.merged_rows, output.summary.exchange_rate);
//! ```
//!
//! # Features
//!
//! - `db` (default): the PostgreSQL [`sink::TableSink`] via sqlx. Without
//!   it the database insert is skipped.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod merger;
pub mod pipeline;
pub mod rates;
pub mod reporting;
pub mod schema;
pub mod sink;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::TableCleaner;
pub use config::{
    ConfigValidationError, DatabaseConfig, InputPaths, PrepConfig, PrepConfigBuilder,
    RateServiceConfig,
};
pub use error::{PrepError, Result};
pub use loader::{InputTables, TableLoader};
pub use merger::TableMerger;
pub use pipeline::{
    ClosureProgressReporter, IqrOutlierCorrector, Pipeline, PipelineBuilder, PipelineOutput,
    PipelineStage, ProgressReporter, ProgressUpdate,
};
pub use rates::{FixedRateProvider, HttpRateProvider, RateProvider, resolve_exchange_rate};
pub use reporting::{ColumnOverview, RunReport, describe_table, format_summary};
pub use schema::TableKind;
pub use sink::{TableSink, write_backup};
pub use types::{
    CleaningStats, DatabaseOutcome, ExchangeRate, OutlierReport, RateSource, RunSummary,
};
