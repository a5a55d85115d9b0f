//! Configuration types for the payroll preparation pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! Everything the pipeline needs is carried in [`PrepConfig`] and passed to
//! the pipeline explicitly; nothing is read from the process environment
//! after startup.

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default exchange rate endpoint (GBP base rates).
pub const DEFAULT_RATE_ENDPOINT: &str = "https://api.exchangerate-api.com/v4/latest/GBP";

/// Default currency read from the `rates` map.
pub const DEFAULT_TARGET_CURRENCY: &str = "USD";

/// Default timeout for the exchange rate request in seconds.
pub const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;

/// Default database table receiving the merged rows.
pub const DEFAULT_TABLE: &str = "EMPLOYEES";

/// Locations of the three input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPaths {
    /// HR records. Default: "hr_data.csv"
    pub employees: PathBuf,
    /// Salary payments. Default: "salary_data.csv"
    pub salaries: PathBuf,
    /// Pension payments. Default: "pension_data.csv"
    pub pensions: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            employees: PathBuf::from("hr_data.csv"),
            salaries: PathBuf::from("salary_data.csv"),
            pensions: PathBuf::from("pension_data.csv"),
        }
    }
}

/// Settings for the exchange rate service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateServiceConfig {
    /// URL returning `{"rates": {...}}` for GBP.
    pub endpoint: String,
    /// Currency code looked up in `rates`.
    pub currency: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RateServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RATE_ENDPOINT.to_string(),
            currency: DEFAULT_TARGET_CURRENCY.to_string(),
            timeout_secs: DEFAULT_RATE_TIMEOUT_SECS,
        }
    }
}

/// Connection settings for the target database.
///
/// The password is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Database (service) name.
    pub service: String,
    /// Table the merged rows are appended to.
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 5432,
            service: "payroll".to_string(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service", &self.service)
            .field("table", &self.table)
            .finish()
    }
}

impl DatabaseConfig {
    /// Environment variables read by [`DatabaseConfig::from_env`].
    pub const ENV_USER: &'static str = "DB_USER";
    pub const ENV_PASSWORD: &'static str = "DB_PASSWORD";
    pub const ENV_HOST: &'static str = "DB_HOST";
    pub const ENV_PORT: &'static str = "DB_PORT";
    pub const ENV_SERVICE: &'static str = "DB_SERVICE";
    pub const ENV_TABLE: &'static str = "DB_TABLE";

    /// Read the connection settings from the process environment,
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> std::result::Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup(Self::ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigValidationError::InvalidPort(raw))?,
            None => defaults.port,
        };

        let config = Self {
            user: lookup(Self::ENV_USER).unwrap_or(defaults.user),
            password: lookup(Self::ENV_PASSWORD).unwrap_or(defaults.password),
            host: lookup(Self::ENV_HOST).unwrap_or(defaults.host),
            port,
            service: lookup(Self::ENV_SERVICE).unwrap_or(defaults.service),
            table: lookup(Self::ENV_TABLE).unwrap_or(defaults.table),
        };
        config.validate()?;
        Ok(config)
    }

    /// `user@host:port/service`, safe for logs.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{} (table {})",
            self.user, self.host, self.port, self.service, self.table
        )
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.host.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("database.host".to_string()));
        }
        if self.service.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField(
                "database.service".to_string(),
            ));
        }
        if !is_valid_table_name(&self.table) {
            return Err(ConfigValidationError::InvalidTableName(self.table.clone()));
        }
        Ok(())
    }
}

/// Accepts `name` or `schema.name` made of ASCII letters, digits and `_`,
/// not starting with a digit.
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Configuration for the payroll preparation pipeline.
///
/// Use [`PrepConfig::builder()`] to create a configuration with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use payroll_prep::config::PrepConfig;
///
/// let config = PrepConfig::builder()
///     .employees_path("data/hr_data.csv")
///     .output_path("out/cleaned_merged_data.csv")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Input file locations.
    #[serde(default)]
    pub inputs: InputPaths,

    /// CSV backup of the merged table. Overwritten each run.
    /// Default: "cleaned_merged_data.csv"
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Exchange rate service settings.
    #[serde(default)]
    pub rate_service: RateServiceConfig,

    /// Target database. `None` skips the database insert.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Run every transform but skip the database insert and the backup.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("cleaned_merged_data.csv")
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            output_path: default_output_path(),
            rate_service: RateServiceConfig::default(),
            database: None,
            dry_run: false,
        }
    }
}

impl PrepConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PrepConfigBuilder {
        PrepConfigBuilder::default()
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PrepError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: PrepConfig = serde_json::from_str(&raw)
            .map_err(|e| PrepError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let paths = [
            ("inputs.employees", &self.inputs.employees),
            ("inputs.salaries", &self.inputs.salaries),
            ("inputs.pensions", &self.inputs.pensions),
            ("output_path", &self.output_path),
        ];
        for (field, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigValidationError::EmptyField(field.to_string()));
            }
        }

        for input in [
            &self.inputs.employees,
            &self.inputs.salaries,
            &self.inputs.pensions,
        ] {
            if input == &self.output_path {
                return Err(ConfigValidationError::OutputOverwritesInput(input.clone()));
            }
        }

        if self.rate_service.endpoint.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField(
                "rate_service.endpoint".to_string(),
            ));
        }
        if self.rate_service.currency.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField(
                "rate_service.currency".to_string(),
            ));
        }
        if self.rate_service.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                self.rate_service.timeout_secs,
            ));
        }

        if let Some(database) = &self.database {
            database.validate()?;
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("'{0}' must not be empty")]
    EmptyField(String),

    #[error("Invalid timeout: {0} (must be at least 1 second)")]
    InvalidTimeout(u64),

    #[error("Invalid database port: '{0}'")]
    InvalidPort(String),

    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),

    #[error("Output path {} would overwrite an input file", .0.display())]
    OutputOverwritesInput(PathBuf),
}

impl From<ConfigValidationError> for PrepError {
    fn from(err: ConfigValidationError) -> Self {
        PrepError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PrepConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PrepConfigBuilder {
    employees_path: Option<PathBuf>,
    salaries_path: Option<PathBuf>,
    pensions_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    rate_endpoint: Option<String>,
    rate_currency: Option<String>,
    rate_timeout_secs: Option<u64>,
    database: Option<DatabaseConfig>,
    dry_run: Option<bool>,
}

impl PrepConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON).
    pub fn from_config(config: PrepConfig) -> Self {
        Self {
            employees_path: Some(config.inputs.employees),
            salaries_path: Some(config.inputs.salaries),
            pensions_path: Some(config.inputs.pensions),
            output_path: Some(config.output_path),
            rate_endpoint: Some(config.rate_service.endpoint),
            rate_currency: Some(config.rate_service.currency),
            rate_timeout_secs: Some(config.rate_service.timeout_secs),
            database: config.database,
            dry_run: Some(config.dry_run),
        }
    }

    /// Set the HR records file.
    pub fn employees_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.employees_path = Some(path.into());
        self
    }

    /// Set the salary payments file.
    pub fn salaries_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.salaries_path = Some(path.into());
        self
    }

    /// Set the pension payments file.
    pub fn pensions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pensions_path = Some(path.into());
        self
    }

    /// Set the backup file written after the merge.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the exchange rate endpoint.
    pub fn rate_endpoint(mut self, url: impl Into<String>) -> Self {
        self.rate_endpoint = Some(url.into());
        self
    }

    /// Set the currency looked up in the rate response.
    pub fn rate_currency(mut self, currency: impl Into<String>) -> Self {
        self.rate_currency = Some(currency.into());
        self
    }

    /// Set the exchange rate request timeout in seconds.
    pub fn rate_timeout_secs(mut self, secs: u64) -> Self {
        self.rate_timeout_secs = Some(secs);
        self
    }

    /// Set the target database.
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Disable the database insert.
    pub fn without_database(mut self) -> Self {
        self.database = None;
        self
    }

    /// Enable or disable dry-run mode.
    ///
    /// In dry-run mode every transform runs but neither the database insert
    /// nor the backup write happens.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PrepConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PrepConfig, ConfigValidationError> {
        let inputs = InputPaths::default();
        let rates = RateServiceConfig::default();
        let config = PrepConfig {
            inputs: InputPaths {
                employees: self.employees_path.unwrap_or(inputs.employees),
                salaries: self.salaries_path.unwrap_or(inputs.salaries),
                pensions: self.pensions_path.unwrap_or(inputs.pensions),
            },
            output_path: self.output_path.unwrap_or_else(default_output_path),
            rate_service: RateServiceConfig {
                endpoint: self.rate_endpoint.unwrap_or(rates.endpoint),
                currency: self.rate_currency.unwrap_or(rates.currency),
                timeout_secs: self.rate_timeout_secs.unwrap_or(rates.timeout_secs),
            },
            database: self.database,
            dry_run: self.dry_run.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
