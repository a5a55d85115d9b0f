//! Exchange rate provider trait.
//!
//! The pipeline only needs one number: how many units of the target currency
//! one GBP buys. [`RateProvider`] hides where that number comes from, so the
//! pipeline can run against the live service, a fixed rate from the command
//! line, or a test double.

use anyhow::Result;

/// Source of the GBP conversion rate.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a pipeline holding one can move
/// across threads.
///
/// # Error Handling
///
/// Any failure is returned as an error. The pipeline never sees it directly:
/// [`resolve_exchange_rate`](super::resolve_exchange_rate) turns it into the
/// fallback rate.
pub trait RateProvider: Send + Sync {
    /// Fetch the current rate. Must be finite and positive on success.
    fn fetch_rate(&self) -> Result<f64>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Returns a rate fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateProvider {
    rate: f64,
}

impl FixedRateProvider {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl RateProvider for FixedRateProvider {
    fn fetch_rate(&self) -> Result<f64> {
        super::validate_rate(self.rate)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rate_provider() {
        let provider = FixedRateProvider::new(1.25);
        assert_eq!(provider.fetch_rate().unwrap(), 1.25);
        assert_eq!(provider.name(), "fixed");
    }

    #[test]
    fn test_fixed_rate_provider_rejects_invalid_rate() {
        assert!(FixedRateProvider::new(0.0).fetch_rate().is_err());
        assert!(FixedRateProvider::new(f64::NAN).fetch_rate().is_err());
    }
}
