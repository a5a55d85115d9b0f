//! Joining the cleaned tables into one payroll table.
//!
//! The employee table is the base of two successive left joins on
//! `employee_id`: salaries first, then pensions. Every employee row survives;
//! an employee with several payments appears once per payment combination.
//! Output rows follow employee order, then salary order, then pension order.

use crate::schema::{self, TableKind};
use crate::types::ExchangeRate;
use crate::utils::series_to_f64;
use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use tracing::{debug, info};

/// Joins employees with their salary and pension payments.
pub struct TableMerger;

impl TableMerger {
    /// Left-join salaries and pensions onto employees and derive
    /// `salary_usd = salary * exchange_rate`.
    pub fn merge(
        employees: &DataFrame,
        salaries: &DataFrame,
        pensions: &DataFrame,
        exchange_rate: ExchangeRate,
    ) -> Result<DataFrame> {
        let salaries = prepare_right(
            salaries,
            employees,
            TableKind::Salaries,
            schema::SALARY_PAYMENT_DATE,
            schema::SALARY,
        )?;
        let merged = left_join(employees, &salaries, schema::EMPLOYEE_ID)
            .context("joining salaries")?;
        debug!(
            "After salary join: {} rows x {} columns",
            merged.height(),
            merged.width()
        );

        let pensions = prepare_right(
            pensions,
            &merged,
            TableKind::Pensions,
            schema::PENSION_PAYMENT_DATE,
            schema::PENSION_AMOUNT,
        )?;
        let mut merged = left_join(&merged, &pensions, schema::EMPLOYEE_ID)
            .context("joining pensions")?;

        let salary_usd = derive_salary_usd(&merged, exchange_rate.value)?;
        merged.with_column(salary_usd)?;

        info!(
            "Merged {} employees into {} rows x {} columns (rate {})",
            employees.height(),
            merged.height(),
            merged.width(),
            exchange_rate
        );
        Ok(merged)
    }
}

/// Rename `payment_date`, suffix colliding columns and put the right-hand
/// columns in merged order: key, date, amount, extras.
fn prepare_right(
    right: &DataFrame,
    left: &DataFrame,
    kind: TableKind,
    date_name: &str,
    amount_name: &str,
) -> Result<DataFrame> {
    let mut right = right.clone();
    right
        .rename(schema::PAYMENT_DATE, date_name.into())
        .with_context(|| format!("{} table has no '{}' column", kind, schema::PAYMENT_DATE))?;

    let suffix = match kind {
        TableKind::Salaries => "_salary",
        TableKind::Pensions => "_pension",
        TableKind::Employees => "_employee",
    };

    let extras: Vec<String> = right
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| name != schema::EMPLOYEE_ID && name != date_name && name != amount_name)
        .collect();

    let mut ordered = vec![
        schema::EMPLOYEE_ID.to_string(),
        date_name.to_string(),
        amount_name.to_string(),
    ];
    for extra in extras {
        if left.column(&extra).is_ok() {
            let renamed = format!("{}{}", extra, suffix);
            debug!("Renaming colliding {} column '{}' to '{}'", kind, extra, renamed);
            right.rename(&extra, renamed.as_str().into())?;
            ordered.push(renamed);
        } else {
            ordered.push(extra);
        }
    }

    Ok(right.select(ordered)?)
}

/// Temporary text join key, dropped before returning.
const JOIN_KEY: &str = "__join_key";

/// Order-preserving left join on the text rendering of `key`.
///
/// Null keys never match. Columns of `right` other than `key` are appended
/// to `left`'s columns.
fn left_join(left: &DataFrame, right: &DataFrame, key: &str) -> Result<DataFrame> {
    let mut left_keyed = left.clone();
    left_keyed.with_column(text_key(left, key).context("left table")?)?;

    let mut right_keyed = right.drop(key)?;
    right_keyed.with_column(text_key(right, key).context("right table")?)?;

    let args = JoinArgs {
        maintain_order: MaintainOrderJoin::LeftRight,
        ..JoinArgs::new(JoinType::Left)
    };
    let joined = left_keyed
        .lazy()
        .join(right_keyed.lazy(), [col(JOIN_KEY)], [col(JOIN_KEY)], args)
        .collect()?;

    Ok(joined.drop(JOIN_KEY)?)
}

fn text_key(df: &DataFrame, key: &str) -> Result<Series> {
    let column = df
        .column(key)
        .map_err(|_| anyhow!("no '{}' column", key))?;
    Ok(column
        .as_materialized_series()
        .cast(&DataType::String)?
        .with_name(JOIN_KEY.into()))
}

fn derive_salary_usd(df: &DataFrame, rate: f64) -> Result<Series> {
    let salary = df
        .column(schema::SALARY)
        .map_err(|_| anyhow!("merged table has no '{}' column", schema::SALARY))?
        .as_materialized_series();

    let converted: Vec<Option<f64>> = series_to_f64(salary)?
        .into_iter()
        .map(|v| v.map(|s| s * rate))
        .collect();
    Ok(Series::new(schema::SALARY_USD.into(), converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn employees() -> DataFrame {
        df![
            "employee_id" => [1_i64, 2],
            "name" => ["Ann Lee", "Bob Roy"],
            "email" => ["ann@x.io", "bob@x.io"],
            "phone_number" => ["555-0100", "555-0101"],
            "join_date" => ["2020-01-01", "2021-06-30"],
        ]
        .unwrap()
    }

    fn salaries() -> DataFrame {
        df![
            "employee_id" => [1_i64, 1],
            "payment_date" => ["2024-01-31", "2024-02-29"],
            "salary" => [100.0, 110.0],
        ]
        .unwrap()
    }

    fn pensions() -> DataFrame {
        df![
            "employee_id" => [1_i64],
            "payment_date" => ["2024-01-31"],
            "pension_amount" => [5.0],
        ]
        .unwrap()
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

    #[test]
    fn test_merge_cardinality_and_order() {
        let merged =
            TableMerger::merge(&employees(), &salaries(), &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();

        // Employee 1: 2 salaries x 1 pension; employee 2 unmatched.
        assert_eq!(merged.height(), 3);
        assert_eq!(floats(&merged, "salary"), vec![Some(100.0), Some(110.0), None]);
        assert_eq!(floats(&merged, "pension_amount"), vec![Some(5.0), Some(5.0), None]);
    }

    #[test]
    fn test_merge_column_order() {
        let merged =
            TableMerger::merge(&employees(), &salaries(), &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();

        let names: Vec<String> = merged
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "employee_id",
                "name",
                "email",
                "phone_number",
                "join_date",
                "salary_payment_date",
                "salary",
                "pension_payment_date",
                "pension_amount",
                "salary_usd",
            ]
        );
    }

    #[test]
    fn test_salary_usd_uses_rate() {
        let merged =
            TableMerger::merge(&employees(), &salaries(), &pensions(), ExchangeRate::fetched(2.0))
                .unwrap();

        assert_eq!(
            floats(&merged, "salary_usd"),
            vec![Some(200.0), Some(220.0), None]
        );
    }

    #[test]
    fn test_merge_with_empty_payment_tables() {
        let empty_salaries = salaries().head(Some(0));
        let empty_pensions = pensions().head(Some(0));

        let merged = TableMerger::merge(
            &employees(),
            &empty_salaries,
            &empty_pensions,
            ExchangeRate::fallback(),
        )
        .unwrap();

        assert_eq!(merged.height(), 2);
        assert_eq!(merged.column("salary").unwrap().null_count(), 2);
        assert_eq!(merged.column("salary_usd").unwrap().null_count(), 2);
    }

    #[test]
    fn test_keys_match_across_types() {
        let salaries = df![
            "employee_id" => ["2"],
            "payment_date" => ["2024-01-31"],
            "salary" => [300.0],
        ]
        .unwrap();

        let merged =
            TableMerger::merge(&employees(), &salaries, &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();
        assert_eq!(floats(&merged, "salary"), vec![None, Some(300.0)]);
    }

    #[test]
    fn test_null_keys_never_match() {
        let employees = df![
            "employee_id" => [None::<i64>],
            "name" => ["Nobody"],
            "email" => ["n@x.io"],
            "phone_number" => ["0"],
            "join_date" => ["2020-01-01"],
        ]
        .unwrap();
        let salaries = df![
            "employee_id" => [None::<i64>],
            "payment_date" => ["2024-01-31"],
            "salary" => [1.0],
        ]
        .unwrap();

        let merged =
            TableMerger::merge(&employees, &salaries, &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();
        assert_eq!(merged.height(), 1);
        assert_eq!(floats(&merged, "salary"), vec![None]);
    }

    #[test]
    fn test_colliding_columns_get_suffix() {
        let salaries = df![
            "employee_id" => [1_i64],
            "name" => ["payroll name"],
            "payment_date" => ["2024-01-31"],
            "salary" => [100.0],
            "currency" => ["GBP"],
        ]
        .unwrap();

        let merged =
            TableMerger::merge(&employees(), &salaries, &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();
        let names: Vec<String> = merged
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            &names[5..9],
            &["salary_payment_date", "salary", "name_salary", "currency"]
        );
    }

    #[test]
    fn test_join_follows_employee_then_payment_order() {
        let employees = df![
            "employee_id" => [Some(3_i64), None, Some(1), Some(9)],
            "name" => ["C", "Nobody", "A", "Z"],
            "email" => ["c@x.io", "n@x.io", "a@x.io", "z@x.io"],
            "phone_number" => ["3", "0", "1", "9"],
            "join_date" => ["2020-01-03", "2020-01-02", "2020-01-01", "2020-01-09"],
        ]
        .unwrap();
        let salaries = df![
            "employee_id" => [1_i64, 3, 1],
            "payment_date" => ["2024-01-31", "2024-01-31", "2024-02-29"],
            "salary" => [10.0, 30.0, 11.0],
        ]
        .unwrap();

        let merged =
            TableMerger::merge(&employees, &salaries, &pensions(), ExchangeRate::fetched(1.0))
                .unwrap();

        let ids: Vec<Option<i64>> = merged
            .column("employee_id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(3), None, Some(1), Some(1), Some(9)]);
        assert_eq!(
            floats(&merged, "salary"),
            vec![Some(30.0), None, Some(10.0), Some(11.0), None]
        );
        assert_eq!(
            floats(&merged, "pension_amount"),
            vec![None, None, Some(5.0), Some(5.0), None]
        );
        assert!(merged.column("__join_key").is_err());
    }
}
