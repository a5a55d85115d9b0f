//! Shared utilities for the payroll preparation pipeline.
//!
//! Series helpers used by the cleaner, the merger and the outlier corrector.
//! All helpers keep row order and represent absent values as nulls.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Render every value of a Series as text, keeping nulls.
///
/// Numbers are rendered by Polars' cast, so `1_i64` becomes `"1"`.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let as_text = series.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Read a numeric Series as `f64` values, keeping nulls.
///
/// Values that cannot be cast become null.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let as_float = series.cast(&DataType::Float64)?;
    Ok(as_float.f64()?.into_iter().collect())
}

/// Apply `f` to every non-null string value. `f` returning `None` yields null.
pub fn map_string_values<F>(series: &Series, f: F) -> PolarsResult<Series>
where
    F: Fn(&str) -> Option<String>,
{
    let as_text = series.cast(&DataType::String)?;
    let mapped: Vec<Option<String>> = as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(&f))
        .collect();
    Ok(Series::new(series.name().clone(), mapped))
}

/// Fill null values in a Series with a string, producing a String Series.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_text = series.cast(&DataType::String)?;
    let filled: Vec<Option<String>> = as_text
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a Series with a number, producing a Float64 Series.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<Option<f64>> = series_to_f64(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Percentile of ascending-sorted values using linear interpolation.
///
/// The position is `q * (n - 1)`; the result interpolates between the two
/// neighbouring order statistics. Returns `None` for an empty slice.
pub fn percentile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sorted copy of the non-null, non-NaN values.
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    present.sort_by(f64::total_cmp);
    present
}

// =============================================================================
// Tests
// =============================================================================
