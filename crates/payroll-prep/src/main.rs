//! CLI entry point for the payroll preparation pipeline.

use clap::Parser;
use dotenv::dotenv;
use payroll_prep::reporting::fully_persisted;
use payroll_prep::{
    DatabaseConfig, FixedRateProvider, Pipeline, PrepConfig, PrepConfigBuilder, PrepError,
    RunReport, format_summary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Clean, merge and persist HR, salary and pension data",
    long_about = "Loads HR, salary and pension CSV files, cleans and merges them, converts \
                  salaries from GBP, corrects salary outliers, appends the result to a \
                  database table and writes a CSV backup.\n\n\
                  ENVIRONMENT VARIABLES (also read from .env):\n  \
                  DB_USER, DB_PASSWORD, DB_HOST, DB_PORT, DB_SERVICE, DB_TABLE\n\n\
                  EXAMPLES:\n  \
                  # Default file names in the current directory\n  \
                  payroll-prep\n\n  \
                  # Explicit inputs, fixed rate, no database\n  \
                  payroll-prep --hr in/hr.csv --salary in/salary.csv --pension in/pension.csv \
                  --rate 1.27 --skip-db\n\n  \
                  # Preview only\n  \
                  payroll-prep --dry-run --json"
)]
struct Args {
    /// HR records CSV
    #[arg(long)]
    hr: Option<PathBuf>,

    /// Salary payments CSV
    #[arg(long)]
    salary: Option<PathBuf>,

    /// Pension payments CSV
    #[arg(long)]
    pension: Option<PathBuf>,

    /// Backup file for the merged table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file; path flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use this GBP rate instead of calling the rate service
    #[arg(long)]
    rate: Option<f64>,

    /// Exchange rate service URL
    #[arg(long)]
    rate_url: Option<String>,

    /// Exchange rate request timeout in seconds
    #[arg(long)]
    rate_timeout: Option<u64>,

    /// Do not append to the database
    #[arg(long)]
    skip_db: bool,

    /// Run every transform but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the summary)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of the human-readable summary
    ///
    /// Disables all logs; stdout holds only the JSON report (or error).
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// With `--json` no subscriber is installed so stdout carries only JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if args.json {
                match serde_json::to_string_pretty(&e) {
                    Ok(json) => println!("{}", json),
                    Err(_) => eprintln!("Error: {}", e),
                }
            } else {
                error!("Payroll preparation failed: {}", e);
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &Args) -> payroll_prep::Result<()> {
    let config = resolve_config(args)?;
    let pipeline = build_pipeline(args, config)?;

    info!("{}", "=".repeat(60));
    info!("Starting payroll preparation...");
    info!("{}", "=".repeat(60));

    let output = pipeline.run()?;

    if args.json {
        let report = RunReport::new(pipeline.config(), output.summary);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if !pipeline.config().dry_run && !fully_persisted(&output.summary) {
            warn!("Run finished without a database insert: {}", output.summary.database);
        }
        print!("{}", format_summary(&output.summary));
    }
    Ok(())
}

/// Merge the config file (if any), the environment and the CLI flags.
fn resolve_config(args: &Args) -> payroll_prep::Result<PrepConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PrepConfig::from_json_file(path)?
        }
        None => PrepConfig::default(),
    };
    let file_database = base.database.clone();

    let mut builder = PrepConfigBuilder::from_config(base).dry_run(args.dry_run);

    if let Some(path) = &args.hr {
        builder = builder.employees_path(path);
    }
    if let Some(path) = &args.salary {
        builder = builder.salaries_path(path);
    }
    if let Some(path) = &args.pension {
        builder = builder.pensions_path(path);
    }
    if let Some(path) = &args.output {
        builder = builder.output_path(path);
    }
    if let Some(url) = &args.rate_url {
        builder = builder.rate_endpoint(url);
    }
    if let Some(secs) = args.rate_timeout {
        builder = builder.rate_timeout_secs(secs);
    }

    builder = if args.skip_db {
        info!("Database insert disabled (--skip-db)");
        builder.without_database()
    } else {
        builder.database(database_config(file_database)?)
    };

    Ok(builder.build()?)
}

/// Database settings from the config file, else from the environment.
/// An empty password in the file is taken from `DB_PASSWORD`.
fn database_config(from_file: Option<DatabaseConfig>) -> payroll_prep::Result<DatabaseConfig> {
    match from_file {
        Some(mut database) => {
            if database.password.is_empty()
                && let Ok(password) = std::env::var(DatabaseConfig::ENV_PASSWORD)
            {
                database.password = password;
            }
            Ok(database)
        }
        None => Ok(DatabaseConfig::from_env()?),
    }
}

fn build_pipeline(args: &Args, config: PrepConfig) -> payroll_prep::Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if let Some(rate) = args.rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PrepError::InvalidConfig(format!(
                "--rate must be a positive number, got {}",
                rate
            )));
        }
        info!("Using fixed exchange rate {}", rate);
        builder = builder.rate_provider(Arc::new(FixedRateProvider::new(rate)));
    }

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    builder.build().map_err(|e: PrepError| e.with_context("building pipeline"))
}
