//! PostgreSQL table sink.
//!
//! Rows are appended to an existing table inside one transaction using
//! multi-row parameterized INSERTs. The connection pool lives only for the
//! duration of [`TableSink::append`].
//!
//! The table name is emitted unquoted, so Postgres folds it to lower case
//! the same way it does for `CREATE TABLE EMPLOYEES (...)`. Date columns are
//! bound as text with a `::date` cast and must be `DATE` or text columns.

use super::TableSink;
use crate::config::{DatabaseConfig, is_valid_table_name};
use crate::schema;
use crate::utils::{series_to_f64, series_to_strings};
use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, info};

/// Postgres caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Appends the merged table to a PostgreSQL table.
pub struct PostgresSink {
    config: DatabaseConfig,
}

impl PostgresSink {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.service)
    }
}

impl TableSink for PostgresSink {
    fn append(&self, df: &DataFrame) -> Result<usize> {
        if df.height() == 0 {
            debug!("Nothing to insert into {}", self.config.table);
            return Ok(0);
        }

        if !is_valid_table_name(&self.config.table) {
            return Err(anyhow!("Invalid table name '{}'", self.config.table));
        }
        let columns = SqlColumn::from_frame(df)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start database runtime")?;

        runtime.block_on(async {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
                .connect_with(self.connect_options())
                .await
                .map_err(|e| anyhow!("Failed to connect to {}: {}", self.target(), e))?;

            let result = insert_rows(&pool, &self.config.table, &columns, df.height()).await;
            pool.close().await;
            result
        })
    }

    fn name(&self) -> &str {
        "postgres"
    }

    fn target(&self) -> String {
        self.config.display_target()
    }
}

async fn insert_rows(
    pool: &PgPool,
    table: &str,
    columns: &[SqlColumn],
    rows: usize,
) -> Result<usize> {
    let header = insert_header(table, columns);
    let rows_per_statement = rows_per_statement(columns.len());

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;

    let mut start = 0;
    while start < rows {
        let end = (start + rows_per_statement).min(rows);
        insert_statement(&header, columns, start..end)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!("Insert of rows {}..{} failed: {}", start, end, e))?;
        debug!("Inserted rows {}..{} into {}", start, end, table);
        start = end;
    }

    tx.commit()
        .await
        .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;

    info!("Appended {} rows to {}", rows, table);
    Ok(rows)
}

/// `INSERT INTO table ("col", ...) `. `table` must already be a valid identifier.
fn insert_header(table: &str, columns: &[SqlColumn]) -> String {
    format!(
        "INSERT INTO {} ({}) ",
        table,
        columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// One multi-row INSERT for `rows`.
fn insert_statement(
    header: &str,
    columns: &[SqlColumn],
    rows: Range<usize>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(header);
    builder.push_values(rows, |mut row_builder, row| {
        for column in columns {
            match &column.values {
                SqlValues::Int(values) => {
                    row_builder.push_bind(values[row]);
                }
                SqlValues::Float(values) => {
                    row_builder.push_bind(values[row]);
                }
                SqlValues::Bool(values) => {
                    row_builder.push_bind(values[row]);
                }
                SqlValues::Text(values) => {
                    row_builder.push_bind(values[row].clone());
                }
                SqlValues::Date(values) => {
                    row_builder
                        .push_bind(values[row].clone())
                        .push_unseparated("::date");
                }
            }
        }
    });
    builder
}

/// Rows per INSERT so that `rows * columns` stays under the bind limit.
fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_date_column(name: &str) -> bool {
    [
        schema::JOIN_DATE,
        schema::SALARY_PAYMENT_DATE,
        schema::PENSION_PAYMENT_DATE,
    ]
    .contains(&name)
}

/// A column's values in the Rust type they are bound as.
enum SqlValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    /// `YYYY-MM-DD` text, cast to `date` in the statement
    Date(Vec<Option<String>>),
}

struct SqlColumn {
    name: String,
    values: SqlValues,
}

impl SqlColumn {
    fn from_frame(df: &DataFrame) -> Result<Vec<Self>> {
        df.get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let values = match series.dtype() {
                    DataType::Int8
                    | DataType::Int16
                    | DataType::Int32
                    | DataType::Int64
                    | DataType::UInt8
                    | DataType::UInt16
                    | DataType::UInt32 => {
                        let cast = series.cast(&DataType::Int64)?;
                        SqlValues::Int(cast.i64()?.into_iter().collect())
                    }
                    DataType::Float32 | DataType::Float64 | DataType::UInt64 => {
                        SqlValues::Float(series_to_f64(series)?)
                    }
                    DataType::Boolean => SqlValues::Bool(series.bool()?.into_iter().collect()),
                    _ if is_date_column(series.name()) => {
                        SqlValues::Date(series_to_strings(series)?)
                    }
                    _ => SqlValues::Text(series_to_strings(series)?),
                };
                Ok(Self {
                    name: series.name().to_string(),
                    values,
                })
            })
            .collect()
    }
}
