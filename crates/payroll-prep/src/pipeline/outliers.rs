//! Outlier correction for the salary column.
//!
//! A single static IQR pass: values outside the Tukey fences are cleared,
//! then every missing value is imputed with the median of what is left.

use crate::types::OutlierReport;
use crate::utils::{
    fill_numeric_nulls, is_numeric_dtype, percentile_linear, series_to_f64, sorted_present,
};
use anyhow::{Result, anyhow, bail};
use polars::prelude::*;
use tracing::{debug, info};

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Clears values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` and fills the gaps
/// with the median.
pub struct IqrOutlierCorrector;

impl IqrOutlierCorrector {
    /// Correct `column` in place. The column ends up as Float64.
    ///
    /// Quartiles use linear interpolation between order statistics. The
    /// median is taken over the values left after clearing. An all-null
    /// column is left untouched.
    pub fn correct(df: &mut DataFrame, column: &str) -> Result<OutlierReport> {
        let series = df
            .column(column)
            .map_err(|_| anyhow!("column '{}' not found", column))?
            .as_materialized_series()
            .clone();
        if !is_numeric_dtype(series.dtype()) {
            bail!("column '{}' is {}, expected a numeric type", column, series.dtype());
        }
        let mut values = series_to_f64(&series)?;
        let mut report = OutlierReport::empty(column);

        let sorted = sorted_present(&values);
        let (Some(q1), Some(q3)) = (
            percentile_linear(&sorted, 0.25),
            percentile_linear(&sorted, 0.75),
        ) else {
            debug!("'{}' has no values, skipping outlier correction", column);
            return Ok(report);
        };

        let iqr = q3 - q1;
        let lower = q1 - IQR_MULTIPLIER * iqr;
        let upper = q3 + IQR_MULTIPLIER * iqr;
        report.q1 = Some(q1);
        report.q3 = Some(q3);
        report.lower_bound = Some(lower);
        report.upper_bound = Some(upper);

        for value in values.iter_mut() {
            if let Some(v) = *value
                && (v < lower || v > upper)
            {
                *value = None;
                report.outliers_cleared += 1;
            }
        }

        let mut cleared = Series::new(series.name().clone(), values);
        report.median = cleared.median();

        if let Some(median) = report.median {
            report.values_imputed = cleared.null_count();
            cleared = fill_numeric_nulls(&cleared, median)?;
        }

        df.replace(column, cleared)?;

        info!(
            "Outliers in '{}': bounds [{:.2}, {:.2}], {} cleared, {} imputed with median {:?}",
            column, lower, upper, report.outliers_cleared, report.values_imputed, report.median
        );
        Ok(report)
    }
}
