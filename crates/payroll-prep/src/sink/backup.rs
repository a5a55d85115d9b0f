//! CSV backup of the merged table.

use crate::error::{PrepError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `df` as CSV with a header row, replacing any existing file.
///
/// Missing parent directories are created.
pub fn write_backup(df: &mut DataFrame, path: &Path) -> Result<PathBuf> {
    let backup_error = |reason: String| PrepError::Backup {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| backup_error(e.to_string()))?;
    }

    let mut file = File::create(path).map_err(|e| backup_error(e.to_string()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .map_err(|e| backup_error(e.to_string()))?;

    info!("Backup written to {} ({} rows)", path.display(), df.height());
    Ok(path.to_path_buf())
}
