//! Lenient date parsing.
//!
//! Dates arrive in whatever format the source system exported. Each value is
//! tried against a fixed list of formats; the first match wins and is
//! rendered as `YYYY-MM-DD`. Anything unparseable becomes null.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Canonical output format.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-only formats, tried in order. Slash and dash dates are month-first.
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d-%b-%Y",
];

/// Date-time formats; the time of day is discarded.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a single value leniently.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // Compact YYYYMMDD; chrono's %Y would swallow every digit.
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value[0..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc2822(value) {
        return Some(datetime.date_naive());
    }

    None
}

/// Normalize a date column to `YYYY-MM-DD` strings.
///
/// Returns the new Series and the number of non-null values that failed to
/// parse.
pub(crate) fn normalize_date_series(series: &Series) -> Result<(Series, usize)> {
    let as_text = series.cast(&DataType::String)?;
    let mut invalid = 0;
    let mut normalized: Vec<Option<String>> = Vec::with_capacity(as_text.len());

    for opt_val in as_text.str()?.into_iter() {
        match opt_val {
            Some(val) => match parse_lenient_date(val) {
                Some(date) => normalized.push(Some(date.format(CANONICAL_DATE_FORMAT).to_string())),
                None => {
                    invalid += 1;
                    normalized.push(None);
                }
            },
            None => normalized.push(None),
        }
    }

    Ok((Series::new(series.name().clone(), normalized), invalid))
}
