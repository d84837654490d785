//! Pipeline module.
//!
//! This module provides the main preprocessing pipeline and related components.

mod builder;
pub mod outliers;
pub mod plan;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::{OutlierHandler, OutlierOutcome};
pub use plan::StagePlan;
pub use progress::{ClosureProgressReporter, PreprocessingStage, ProgressReporter, ProgressUpdate};
