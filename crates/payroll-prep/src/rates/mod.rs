//! GBP exchange rate lookup.
//!
//! - [`RateProvider`] - the trait seam the pipeline depends on
//! - [`HttpRateProvider`] - live lookup against an exchange rate service
//! - [`FixedRateProvider`] - a rate supplied up front
//!
//! [`resolve_exchange_rate`] is the only entry point the pipeline uses. It
//! never fails: a provider error becomes the neutral rate 1.0.

mod http;
mod provider;

pub use http::{HttpRateProvider, parse_rate_response};
pub use provider::{FixedRateProvider, RateProvider};

use crate::error::PrepError;
use crate::types::ExchangeRate;
use anyhow::{Result, anyhow};
use tracing::{info, warn};

/// Ask `provider` for the rate, falling back to 1.0 on any error.
pub fn resolve_exchange_rate(provider: &dyn RateProvider) -> ExchangeRate {
    match provider.fetch_rate() {
        Ok(rate) => {
            info!("Exchange rate from {} provider: {}", provider.name(), rate);
            ExchangeRate::fetched(rate)
        }
        Err(e) => {
            let err = PrepError::RateFetch(format!("{:#}", e));
            warn!(
                "{} ({} provider), using {}",
                err,
                provider.name(),
                ExchangeRate::FALLBACK_VALUE
            );
            ExchangeRate::fallback()
        }
    }
}

fn validate_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(anyhow!("Invalid exchange rate: {}", rate))
    }
}
