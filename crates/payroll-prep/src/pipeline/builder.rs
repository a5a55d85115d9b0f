//! Main payroll pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, rate lookup, cleaning, merge, outlier correction
//! and persistence.

use crate::cleaner::TableCleaner;
use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::loader::{InputTables, TableLoader};
use crate::merger::TableMerger;
use crate::pipeline::outliers::IqrOutlierCorrector;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::rates::{HttpRateProvider, RateProvider, resolve_exchange_rate};
use crate::reporting::log_overview;
use crate::schema::{self, TableKind};
use crate::sink::{TableSink, write_backup};
use crate::types::{CleaningStats, DatabaseOutcome, RunSummary};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The merged table together with the run summary.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub data: DataFrame,
    pub summary: RunSummary,
}

/// The payroll preparation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use payroll_prep::{Pipeline, PrepConfig};
/// use payroll_prep::rates::FixedRateProvider;
/// use std::sync::Arc;
///
/// let output = Pipeline::builder()
///     .config(PrepConfig::builder().output_path("out/merged.csv").build()?)
///     .rate_provider(Arc::new(FixedRateProvider::new(1.27)))
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: PrepConfig,
    rate_provider: Arc<dyn RateProvider>,
    table_sink: Option<Arc<dyn TableSink>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: TableCleaner,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Load the configured input files and process them.
    pub fn run(&self) -> Result<PipelineOutput> {
        let start_time = Instant::now();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            "Loading input files...",
        ));

        let inputs = match TableLoader::load_all(&self.config.inputs) {
            Ok(inputs) => inputs,
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                return Err(e);
            }
        };

        let mut output = self.process(inputs)?;
        output.summary.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(output)
    }

    /// Process already-loaded input tables.
    pub fn process(&self, inputs: InputTables) -> Result<PipelineOutput> {
        match self.process_internal(inputs) {
            Ok(output) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Prepared {} rows",
                    output.summary.merged_rows
                )));
                Ok(output)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, inputs: InputTables) -> Result<PipelineOutput> {
        let start_time = Instant::now();

        for (kind, df) in [
            (TableKind::Employees, &inputs.employees),
            (TableKind::Salaries, &inputs.salaries),
            (TableKind::Pensions, &inputs.pensions),
        ] {
            TableLoader::check_required_columns(df, kind)?;
            log_overview(kind.display_name(), df);
        }
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            1.0,
            "Inputs loaded",
        ));

        // Step 1: Exchange rate
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FetchingRate,
            0.0,
            format!("Fetching exchange rate via {}...", self.rate_provider.name()),
        ));
        let exchange_rate = resolve_exchange_rate(self.rate_provider.as_ref());
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FetchingRate,
            1.0,
            format!("Exchange rate: {}", exchange_rate),
        ));

        // Step 2: Cleaning
        info!("Cleaning input tables...");
        let InputTables {
            employees,
            salaries,
            pensions,
        } = inputs;
        let (employees, employee_stats) =
            self.clean_table(TableKind::Employees, employees, 1)?;
        let (salaries, salary_stats) = self.clean_table(TableKind::Salaries, salaries, 2)?;
        let (pensions, pension_stats) = self.clean_table(TableKind::Pensions, pensions, 3)?;

        // Step 3: Merge
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Merging,
            0.0,
            "Merging tables...",
        ));
        let mut merged = TableMerger::merge(&employees, &salaries, &pensions, exchange_rate)
            .map_err(|e| PrepError::MergeFailed(format!("{:#}", e)))?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Merging,
            1.0,
            format!("Merged into {} rows", merged.height()),
        ));

        // Step 4: Outliers
        self.report_progress(ProgressUpdate::new(
            PipelineStage::OutlierCorrection,
            0.0,
            "Correcting salary outliers...",
        ));
        let outliers = IqrOutlierCorrector::correct(&mut merged, schema::SALARY)
            .map_err(|e| PrepError::CleaningFailed(format!("outlier correction: {:#}", e)))?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::OutlierCorrection,
            1.0,
            format!("{} outliers cleared", outliers.outliers_cleared),
        ));
        log_overview("merged", &merged);

        // Step 5: Persist
        let (database, backup_path) = if self.config.dry_run {
            info!("Dry run: skipping database insert and backup");
            (
                DatabaseOutcome::Skipped {
                    reason: "dry run".to_string(),
                },
                None,
            )
        } else {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::Persisting,
                0.0,
                "Appending to database...",
            ));
            let database = self.append_to_database(&merged);

            self.report_progress(ProgressUpdate::new(
                PipelineStage::Persisting,
                0.5,
                "Writing backup...",
            ));
            let path = write_backup(&mut merged, &self.config.output_path)?;
            (database, Some(path))
        };

        let summary = RunSummary {
            cleaning: vec![employee_stats, salary_stats, pension_stats],
            exchange_rate,
            merged_rows: merged.height(),
            merged_columns: merged.width(),
            outliers,
            database,
            backup_path,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        Ok(PipelineOutput {
            data: merged,
            summary,
        })
    }

    fn clean_table(
        &self,
        kind: TableKind,
        df: DataFrame,
        position: usize,
    ) -> Result<(DataFrame, CleaningStats)> {
        self.report_progress(ProgressUpdate::for_table(
            PipelineStage::Cleaning,
            kind,
            position - 1,
            format!("Cleaning {}...", kind),
        ));

        let result = match kind {
            TableKind::Employees => self.cleaner.clean_employees(df),
            TableKind::Salaries => self.cleaner.clean_salaries(df),
            TableKind::Pensions => self.cleaner.clean_pensions(df),
        };
        let (df, stats) =
            result.map_err(|e| PrepError::CleaningFailed(format!("{}: {:#}", kind, e)))?;

        self.report_progress(ProgressUpdate::for_table(
            PipelineStage::Cleaning,
            kind,
            position,
            format!("Cleaned {} ({} rows)", kind, stats.rows_after),
        ));
        Ok((df, stats))
    }

    /// Append to the sink if there is one. Failures are logged and recorded,
    /// never returned.
    fn append_to_database(&self, df: &DataFrame) -> DatabaseOutcome {
        let Some(sink) = &self.table_sink else {
            info!("No database configured, skipping insert");
            return DatabaseOutcome::Skipped {
                reason: "no database configured".to_string(),
            };
        };

        info!("Appending {} rows to {}", df.height(), sink.target());
        match sink.append(df) {
            Ok(rows) => DatabaseOutcome::Inserted { rows },
            Err(e) => {
                let err = PrepError::Database(format!("{:#}", e));
                warn!("{} ({}), continuing with backup", err, sink.name());
                DatabaseOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Unless overridden, the rate provider is an [`HttpRateProvider`] for the
/// configured endpoint and the sink is a Postgres sink for the configured
/// database (when the `db` feature is enabled).
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PrepConfig>,
    rate_provider: Option<Arc<dyn RateProvider>>,
    table_sink: Option<Arc<dyn TableSink>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PrepConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `provider` instead of the configured HTTP service.
    pub fn rate_provider(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.rate_provider = Some(provider);
        self
    }

    /// Use `sink` instead of the configured database.
    pub fn table_sink(mut self, sink: Arc<dyn TableSink>) -> Self {
        self.table_sink = Some(sink);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let rate_provider = match self.rate_provider {
            Some(provider) => provider,
            None => Arc::new(
                HttpRateProvider::new(config.rate_service.clone())
                    .map_err(|e| PrepError::InvalidConfig(e.to_string()))?,
            ),
        };

        let table_sink = match self.table_sink {
            Some(sink) => Some(sink),
            None => default_sink(&config),
        };

        Ok(Pipeline {
            config,
            rate_provider,
            table_sink,
            progress_reporter: self.progress_reporter,
            cleaner: TableCleaner,
        })
    }
}

#[cfg(feature = "db")]
fn default_sink(config: &PrepConfig) -> Option<Arc<dyn TableSink>> {
    config.database.clone().map(|database| {
        Arc::new(crate::sink::PostgresSink::new(database)) as Arc<dyn TableSink>
    })
}

#[cfg(not(feature = "db"))]
fn default_sink(config: &PrepConfig) -> Option<Arc<dyn TableSink>> {
    if config.database.is_some() {
        warn!("Built without the `db` feature, database insert disabled");
    }
    None
}
