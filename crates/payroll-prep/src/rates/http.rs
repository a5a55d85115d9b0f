//! HTTP exchange rate provider.
//!
//! Calls an exchangerate-api style endpoint (`GET .../latest/GBP`) whose
//! body carries a `rates` map keyed by currency code.

use super::RateProvider;
use crate::config::RateServiceConfig;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<HashMap<String, f64>>,
}

/// Fetches the rate over HTTP with a bounded timeout.
///
/// # Example
///
/// ```rust,ignore
/// use payroll_prep::config::RateServiceConfig;
/// use payroll_prep::rates::{HttpRateProvider, RateProvider};
///
/// let provider = HttpRateProvider::new(RateServiceConfig::default())?;
/// let rate = provider.fetch_rate()?;
/// ```
pub struct HttpRateProvider {
    config: RateServiceConfig,
    client: Client,
}

impl HttpRateProvider {
    /// Create a provider for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: RateServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { config, client })
    }
}

impl RateProvider for HttpRateProvider {
    fn fetch_rate(&self) -> Result<f64> {
        debug!("Requesting exchange rate from {}", self.config.endpoint);

        let response = self.client.get(&self.config.endpoint).send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Rate service returned {} for {}",
                response.status(),
                self.config.endpoint
            ));
        }

        let body = response.text()?;
        parse_rate_response(&body, &self.config.currency)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract `rates[currency]` from a response body.
pub fn parse_rate_response(body: &str, currency: &str) -> Result<f64> {
    let parsed: RatesResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Malformed rate response: {}", e))?;

    let rate = parsed
        .rates
        .as_ref()
        .and_then(|rates| rates.get(currency))
        .copied()
        .ok_or_else(|| anyhow!("Rate response has no '{}' entry", currency))?;

    super::validate_rate(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_response() {
        let body = r#"{"base":"GBP","rates":{"EUR":1.17,"USD":1.27}}"#;
        assert_eq!(parse_rate_response(body, "USD").unwrap(), 1.27);
        assert_eq!(parse_rate_response(body, "EUR").unwrap(), 1.17);
    }

    #[test]
    fn test_parse_rate_response_missing_currency() {
        let body = r#"{"rates":{"EUR":1.17}}"#;
        let err = parse_rate_response(body, "USD").unwrap_err();
        assert!(err.to_string().contains("USD"));
    }

    #[test]
    fn test_parse_rate_response_malformed() {
        assert!(parse_rate_response("<html>", "USD").is_err());
        assert!(parse_rate_response(r#"{"result":"error"}"#, "USD").is_err());
        assert!(parse_rate_response(r#"{"rates":{"USD":"1.2"}}"#, "USD").is_err());
    }

    #[test]
    fn test_parse_rate_response_rejects_non_positive() {
        assert!(parse_rate_response(r#"{"rates":{"USD":0}}"#, "USD").is_err());
        assert!(parse_rate_response(r#"{"rates":{"USD":-1.3}}"#, "USD").is_err());
    }

    #[test]
    fn test_unreachable_endpoint_is_error() {
        let config = RateServiceConfig {
            endpoint: "http://127.0.0.1:1/latest/GBP".to_string(),
            timeout_secs: 2,
            ..RateServiceConfig::default()
        };
        let provider = HttpRateProvider::new(config).unwrap();
        assert!(provider.fetch_rate().is_err());
    }
}
