//! Progress reporting for the payroll pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] at every stage boundary and once
//! per table while cleaning. The CLI turns these into log lines; library
//! callers can plug in any [`ProgressReporter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use payroll_prep::Pipeline;
//!
//! let summary = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use crate::schema::TableKind;
use serde::{Deserialize, Serialize};

/// Stages of the payroll pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the three input files
    Loading,
    /// Looking up the GBP exchange rate
    FetchingRate,
    /// Filling defaults, parsing dates, de-duplicating
    Cleaning,
    /// Joining the tables and deriving `salary_usd`
    Merging,
    /// IQR correction of the salary column
    OutlierCorrection,
    /// Database append and CSV backup
    Persisting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Inputs",
            Self::FetchingRate => "Fetching Exchange Rate",
            Self::Cleaning => "Cleaning Tables",
            Self::Merging => "Merging Tables",
            Self::OutlierCorrection => "Correcting Outliers",
            Self::Persisting => "Persisting Results",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run taken by this stage (0.0 - 1.0).
    ///
    /// Weights of the working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.15,
            Self::FetchingRate => 0.10,
            Self::Cleaning => 0.25,
            Self::Merging => 0.15,
            Self::OutlierCorrection => 0.10,
            Self::Persisting => 0.25,
            Self::Complete => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Overall progress at the start of this stage: the summed weight of
    /// every working stage before it.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::WORKING
                .iter()
                .take_while(|s| *s != stage)
                .map(|s| s.weight())
                .sum(),
        }
    }

    /// Working stages in execution order.
    pub const WORKING: [PipelineStage; 6] = [
        Self::Loading,
        Self::FetchingRate,
        Self::Cleaning,
        Self::Merging,
        Self::OutlierCorrection,
        Self::Persisting,
    ];
}

/// A single progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Table being worked on, for per-table stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableKind>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within `stage` (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            table: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
        }
    }

    /// Update for `table` with `tables_done` of the three tables finished.
    pub fn for_table(
        stage: PipelineStage,
        table: TableKind,
        tables_done: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = tables_done as f32 / TableKind::ALL.len() as f32;
        Self {
            table: Some(table),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            progress: 0.0,
            ..Self::new(PipelineStage::Failed, 0.0, message)
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync`; the pipeline may be moved to a
/// worker thread by the caller.
pub trait ProgressReporter: Send + Sync {
    /// Called at each stage boundary. Should not block.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
