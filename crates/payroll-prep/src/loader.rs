//! Loading of the three CSV inputs.
//!
//! Reads are order preserving: row `i` of the table is line `i + 1` of the
//! file. A missing file, unparsable CSV or missing required column aborts
//! the run.

use crate::config::InputPaths;
use crate::error::{PrepError, Result};
use crate::schema::TableKind;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// The three raw input tables.
#[derive(Debug, Clone)]
pub struct InputTables {
    pub employees: DataFrame,
    pub salaries: DataFrame,
    pub pensions: DataFrame,
}

/// Loads input CSV files into DataFrames.
pub struct TableLoader;

impl TableLoader {
    /// Load all three inputs.
    pub fn load_all(paths: &InputPaths) -> Result<InputTables> {
        Ok(InputTables {
            employees: Self::load(&paths.employees, TableKind::Employees)?,
            salaries: Self::load(&paths.salaries, TableKind::Salaries)?,
            pensions: Self::load(&paths.pensions, TableKind::Pensions)?,
        })
    }

    /// Load one input file and check it has the columns `kind` requires.
    pub fn load(path: &Path, kind: TableKind) -> Result<DataFrame> {
        if !path.is_file() {
            return Err(PrepError::InputFile {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        let df = read_csv(path).map_err(|e| PrepError::InputFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::check_required_columns(&df, kind)?;

        info!(
            "Loaded {} from {} ({} rows x {} columns)",
            kind,
            path.display(),
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// Fail with [`PrepError::MissingColumns`] unless every required column exists.
    pub fn check_required_columns(df: &DataFrame, kind: TableKind) -> Result<()> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<String> = kind
            .required_columns()
            .iter()
            .filter(|required| !present.iter().any(|p| p == *required))
            .map(|s| s.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            debug!("{} columns present: {:?}", kind, present);
            Err(PrepError::MissingColumns {
                table: kind.to_string(),
                columns: missing,
            })
        }
    }
}

/// Read a CSV file with a header row, `"` quoting and full-file schema
/// inference so late rows cannot contradict an early guess. A row with
/// more fields than the header is an error.
fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_truncate_ragged_lines(false),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}
