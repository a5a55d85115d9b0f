//! Persisting the merged table.
//!
//! Two independent outputs:
//! - a [`TableSink`] append (the reporting database), which may fail without
//!   stopping the run
//! - the CSV backup written by [`write_backup`], whose failure is fatal

mod backup;
#[cfg(feature = "db")]
mod postgres;

pub use backup::write_backup;
#[cfg(feature = "db")]
pub use postgres::PostgresSink;

use anyhow::Result;
use polars::prelude::DataFrame;

/// Destination table that merged rows are appended to.
///
/// Implementations must be `Send + Sync`. Errors are returned, not logged;
/// the pipeline records them in the run summary and carries on.
pub trait TableSink: Send + Sync {
    /// Append every row of `df`; returns the number of rows written.
    fn append(&self, df: &DataFrame) -> Result<usize>;

    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Human-readable destination, without credentials.
    fn target(&self) -> String;
}
