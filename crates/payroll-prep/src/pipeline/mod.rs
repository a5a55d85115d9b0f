//! Pipeline module.
//!
//! This module provides the payroll pipeline and its supporting pieces:
//! progress reporting and the salary outlier corrector.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, PipelineOutput};
pub use outliers::IqrOutlierCorrector;
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
