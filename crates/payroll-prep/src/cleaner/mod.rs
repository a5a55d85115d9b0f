//! Per-table cleaning.
//!
//! Each input table goes through the same fixed sequence:
//! 1. Fill missing values with the table's defaults
//! 2. Parse date columns leniently (invalid dates become null)
//! 3. Normalize text (employee table only)
//! 4. Drop duplicates by the table's uniqueness key, keeping the last row

mod dates;
mod text;

pub use dates::{CANONICAL_DATE_FORMAT, parse_lenient_date};
pub use text::{normalize_email, title_case};

use crate::schema::{self, TableKind};
use crate::types::CleaningStats;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, map_string_values, series_to_f64};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info};

/// Cleans the three input tables.
pub struct TableCleaner;

impl TableCleaner {
    /// Clean the HR table: default email and phone, normalize `join_date`,
    /// title-case names, lowercase emails, unique by email.
    pub fn clean_employees(&self, df: DataFrame) -> Result<(DataFrame, CleaningStats)> {
        let kind = TableKind::Employees;
        let mut stats = CleaningStats::new(kind, df.height());
        let mut df = df;

        stats.defaults_filled += fill_text(&mut df, schema::EMAIL, schema::DEFAULT_EMAIL)?;
        stats.defaults_filled +=
            fill_text(&mut df, schema::PHONE_NUMBER, schema::DEFAULT_PHONE_NUMBER)?;

        stats.invalid_dates += normalize_dates(&mut df, kind)?;

        map_text(&mut df, schema::NAME, title_case)?;
        map_text(&mut df, schema::EMAIL, normalize_email)?;

        let df = drop_duplicates(df, kind, &mut stats)?;
        log_stats(&stats);
        Ok((df, stats))
    }

    /// Clean the salary table: default salary, normalize `payment_date`,
    /// unique by (employee, date).
    pub fn clean_salaries(&self, df: DataFrame) -> Result<(DataFrame, CleaningStats)> {
        self.clean_payments(df, TableKind::Salaries, schema::SALARY, schema::DEFAULT_SALARY)
    }

    /// Clean the pension table: default amount, normalize `payment_date`,
    /// unique by (employee, date).
    pub fn clean_pensions(&self, df: DataFrame) -> Result<(DataFrame, CleaningStats)> {
        self.clean_payments(
            df,
            TableKind::Pensions,
            schema::PENSION_AMOUNT,
            schema::DEFAULT_PENSION_AMOUNT,
        )
    }

    fn clean_payments(
        &self,
        df: DataFrame,
        kind: TableKind,
        amount_column: &str,
        default_amount: f64,
    ) -> Result<(DataFrame, CleaningStats)> {
        let mut stats = CleaningStats::new(kind, df.height());
        let mut df = df;

        stats.defaults_filled += fill_amount(&mut df, amount_column, default_amount)?;
        stats.invalid_dates += normalize_dates(&mut df, kind)?;

        let df = drop_duplicates(df, kind, &mut stats)?;
        log_stats(&stats);
        Ok((df, stats))
    }
}

/// Replace nulls in a text column; returns how many were filled.
fn fill_text(df: &mut DataFrame, column: &str, default: &str) -> Result<usize> {
    let series = df
        .column(column)
        .with_context(|| format!("column '{}' not found", column))?
        .as_materialized_series()
        .clone();
    let missing = series.null_count();
    let filled = fill_string_nulls(&series, default)?;
    df.replace(column, filled)?;
    Ok(missing)
}

/// Cast an amount column to Float64 and replace nulls. Values that are not
/// numbers count as missing.
fn fill_amount(df: &mut DataFrame, column: &str, default: f64) -> Result<usize> {
    let series = df
        .column(column)
        .with_context(|| format!("column '{}' not found", column))?
        .as_materialized_series()
        .clone();
    let missing = series_to_f64(&series)?.iter().filter(|v| v.is_none()).count();
    let filled = fill_numeric_nulls(&series, default)?;
    df.replace(column, filled)?;
    Ok(missing)
}

fn normalize_dates(df: &mut DataFrame, kind: TableKind) -> Result<usize> {
    let mut invalid_total = 0;
    for column in kind.date_columns() {
        let series = df
            .column(column)
            .with_context(|| format!("column '{}' not found", column))?
            .as_materialized_series()
            .clone();
        let (normalized, invalid) = dates::normalize_date_series(&series)?;
        if invalid > 0 {
            debug!("{}: {} unparseable values in '{}'", kind, invalid, column);
        }
        df.replace(column, normalized)?;
        invalid_total += invalid;
    }
    Ok(invalid_total)
}

fn map_text(df: &mut DataFrame, column: &str, f: fn(&str) -> String) -> Result<()> {
    let series = df
        .column(column)
        .with_context(|| format!("column '{}' not found", column))?
        .as_materialized_series()
        .clone();
    let mapped = map_string_values(&series, |v| Some(f(v)))?;
    df.replace(column, mapped)?;
    Ok(())
}

fn drop_duplicates(
    df: DataFrame,
    kind: TableKind,
    stats: &mut CleaningStats,
) -> Result<DataFrame> {
    let subset: Vec<String> = kind
        .uniqueness_key()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let df = df.unique_stable(
        Some(&subset),
        UniqueKeepStrategy::Last,
        None,
    )?;
    stats.rows_after = df.height();
    stats.duplicates_removed = stats.rows_before - stats.rows_after;
    Ok(df)
}

fn log_stats(stats: &CleaningStats) {
    info!(
        "Cleaned {}: {} -> {} rows ({} duplicates removed, {} defaults filled, {} invalid dates)",
        stats.table,
        stats.rows_before,
        stats.rows_after,
        stats.duplicates_removed,
        stats.defaults_filled,
        stats.invalid_dates
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    // =========================================================================
    // Employees
    // =========================================================================

    #[test]
    fn test_clean_employees_fills_and_normalizes() {
        let df = df![
            "employee_id" => [1_i64, 2],
            "name" => [Some("jane DOE"), None],
            "email" => [Some("Jane@Example.com"), None],
            "phone_number" => [None, Some("555-0101")],
            "join_date" => [Some("03/15/2021"), Some("bogus")],
        ]
        .unwrap();

        let (cleaned, stats) = TableCleaner.clean_employees(df).unwrap();

        assert_eq!(
            strings(&cleaned, "name"),
            vec![Some("Jane Doe".to_string()), None]
        );
        assert_eq!(
            strings(&cleaned, "email"),
            vec![
                Some("jane@example.com".to_string()),
                Some("unknown@example.com".to_string())
            ]
        );
        assert_eq!(
            strings(&cleaned, "phone_number"),
            vec![
                Some("000-000-0000".to_string()),
                Some("555-0101".to_string())
            ]
        );
        assert_eq!(
            strings(&cleaned, "join_date"),
            vec![Some("2021-03-15".to_string()), None]
        );
        assert_eq!(stats.defaults_filled, 2);
        assert_eq!(stats.invalid_dates, 1);
        assert_eq!(stats.duplicates_removed, 0);
    }

    #[test]
    fn test_clean_employees_last_email_wins_after_lowercasing() {
        let df = df![
            "employee_id" => [1_i64, 2, 3],
            "name" => ["a one", "b two", "a again"],
            "email" => ["A@X.IO", "b@x.io", "a@x.io"],
            "phone_number" => ["1", "2", "3"],
            "join_date" => ["2020-01-01", "2020-01-02", "2020-01-03"],
        ]
        .unwrap();

        let (cleaned, stats) = TableCleaner.clean_employees(df).unwrap();

        assert_eq!(cleaned.height(), 2);
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(
            strings(&cleaned, "name"),
            vec![Some("B Two".to_string()), Some("A Again".to_string())]
        );
    }

    #[test]
    fn test_clean_employees_numeric_phone_becomes_text() {
        let df = df![
            "employee_id" => [1_i64],
            "name" => ["x"],
            "email" => ["x@x.io"],
            "phone_number" => [5550100_i64],
            "join_date" => ["2020-01-01"],
        ]
        .unwrap();

        let (cleaned, _) = TableCleaner.clean_employees(df).unwrap();
        assert_eq!(
            cleaned.column("phone_number").unwrap().dtype(),
            &DataType::String
        );
    }

    // =========================================================================
    // Payments
    // =========================================================================

    #[test]
    fn test_clean_salaries_defaults_and_dedup() {
        let df = df![
            "employee_id" => [1_i64, 1, 2],
            "payment_date" => ["2024-01-31", "01/31/2024", "2024-01-31"],
            "salary" => [Some(100_i64), Some(150), None],
        ]
        .unwrap();

        let (cleaned, stats) = TableCleaner.clean_salaries(df).unwrap();

        // Both employee-1 rows normalize to the same date; the later one wins.
        assert_eq!(floats(&cleaned, "salary"), vec![Some(150.0), Some(0.0)]);
        assert_eq!(stats.rows_before, 3);
        assert_eq!(stats.rows_after, 2);
        assert_eq!(stats.defaults_filled, 1);
    }

    #[test]
    fn test_clean_pensions_missing_amount_column() {
        let df = df![
            "employee_id" => [1_i64],
            "payment_date" => ["2024-01-31"],
        ]
        .unwrap();

        assert!(TableCleaner.clean_pensions(df).is_err());
    }

    #[test]
    fn test_clean_pensions_amount_is_float() {
        let df = df![
            "employee_id" => [1_i64, 2],
            "payment_date" => ["2024-01-31", "2024-01-31"],
            "pension_amount" => [Some(25_i64), None],
        ]
        .unwrap();

        let (cleaned, _) = TableCleaner.clean_pensions(df).unwrap();
        assert_eq!(floats(&cleaned, "pension_amount"), vec![Some(25.0), Some(0.0)]);
    }

    #[test]
    fn test_clean_pensions_last_payment_wins() {
        let df = df![
            "employee_id" => [1_i64, 2, 1, 1],
            "payment_date" => ["2024-01-31", "2024-01-31", "2024-02-29", "31 Jan 2024"],
            "pension_amount" => [10.0, 20.0, 11.0, 12.0],
        ]
        .unwrap();

        let (cleaned, stats) = TableCleaner.clean_pensions(df).unwrap();

        // Survivors keep their input positions.
        assert_eq!(
            floats(&cleaned, "pension_amount"),
            vec![Some(20.0), Some(11.0), Some(12.0)]
        );
        assert_eq!(
            strings(&cleaned, "payment_date"),
            vec![
                Some("2024-01-31".to_string()),
                Some("2024-02-29".to_string()),
                Some("2024-01-31".to_string()),
            ]
        );
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn test_invalid_payment_dates_count_as_one_key() {
        let df = df![
            "employee_id" => [7_i64, 7, 8],
            "payment_date" => ["not a date", "", "2024-01-31"],
            "salary" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let (cleaned, stats) = TableCleaner.clean_salaries(df).unwrap();

        assert_eq!(stats.invalid_dates, 2);
        assert_eq!(floats(&cleaned, "salary"), vec![Some(2.0), Some(3.0)]);
    }
}
