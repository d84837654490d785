//! Progress reporting for the preprocessing pipeline.
//!
//! A run walks the working stages in [`PreprocessingStage::WORKING`] order and
//! emits a [`ProgressUpdate`] on entering a stage and after each filtered
//! column. Runs end with exactly one `Complete` or `Failed` update.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabprep::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| match &update.column {
//!         Some(column) => println!("{:>3.0}% {} [{}]", update.progress * 100.0, update.message, column),
//!         None => println!("{:>3.0}% {}", update.progress * 100.0, update.message),
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Stages of a pipeline run.
///
/// Transitions only move forward; any error moves the run to [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingStage {
    Loading,
    /// Duplicate removal and median imputation
    Cleaning,
    OutlierFiltering,
    /// Ratio and binned columns
    FeatureEngineering,
    Scaling,
    Encoding,
    Writing,
    Complete,
    Failed,
}

impl PreprocessingStage {
    /// Stages that do work, in execution order, with their share of the run.
    ///
    /// Shares sum to 1.0. Writing is heavy because the CSV writer formats every cell.
    pub const WORKING: [(PreprocessingStage, f32); 7] = [
        (Self::Loading, 0.10),
        (Self::Cleaning, 0.15),
        (Self::OutlierFiltering, 0.15),
        (Self::FeatureEngineering, 0.10),
        (Self::Scaling, 0.15),
        (Self::Encoding, 0.10),
        (Self::Writing, 0.25),
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Cleaning => "Cleaning Data",
            Self::OutlierFiltering => "Filtering Outliers",
            Self::FeatureEngineering => "Engineering Features",
            Self::Scaling => "Scaling Columns",
            Self::Encoding => "Encoding Categories",
            Self::Writing => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage. Zero for terminal stages.
    pub fn weight(&self) -> f32 {
        Self::WORKING
            .iter()
            .find(|(stage, _)| stage == self)
            .map_or(0.0, |(_, weight)| *weight)
    }

    /// Overall progress when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            _ => Self::WORKING
                .iter()
                .take_while(|(stage, _)| stage != self)
                .map(|(_, weight)| weight)
                .sum(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PreprocessingStage,

    /// Column the stage just finished, for per-column stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within `stage` (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    /// `(finished, total)` columns of a per-column stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_done: Option<(usize, usize)>,
}

impl ProgressUpdate {
    pub fn new(stage: PreprocessingStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            column: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            columns_done: None,
        }
    }

    /// Update emitted after `done` of `total` columns of `stage` are finished,
    /// the last one being `column`.
    pub fn for_column(
        stage: PreprocessingStage,
        column: impl Into<String>,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let fraction = if total == 0 {
            0.0
        } else {
            done as f32 / total as f32
        };
        Self {
            column: Some(column.into()),
            columns_done: Some((done, total)),
            ..Self::new(stage, fraction, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PreprocessingStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PreprocessingStage::Failed, 0.0, message)
    }
}

/// Receiver of progress updates.
///
/// `Send + Sync` so a pipeline and its reporter can move to a worker thread.
/// Called once per filtered column, so implementations should return quickly.
pub trait ProgressReporter: Send + Sync {
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
static_assertions::assert_impl_all!(PreprocessingStage: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_update_progress_within_stage() {
        let update = ProgressUpdate::new(PreprocessingStage::Scaling, 0.5, "Scaling...");

        assert_eq!(update.stage_progress, 0.5);
        assert!(update.column.is_none());
        // Scaling starts at 0.50 and spans 0.15
        assert!((update.progress - 0.575).abs() < 1e-6);
    }

    #[test]
    fn test_update_stage_progress_clamped() {
        let update = ProgressUpdate::new(PreprocessingStage::Loading, 3.0, "Loading");
        assert_eq!(update.stage_progress, 1.0);
        assert!((update.progress - 0.10).abs() < 1e-6);
    }

    #[test]
    fn test_update_for_column() {
        let update = ProgressUpdate::for_column(
            PreprocessingStage::OutlierFiltering,
            "Enroll",
            3,
            4,
            "Removed 2 rows in 'Enroll'",
        );

        assert_eq!(update.column.as_deref(), Some("Enroll"));
        assert_eq!(update.columns_done, Some((3, 4)));
        assert_eq!(update.stage_progress, 0.75);
    }

    #[test]
    fn test_update_for_column_without_columns() {
        let update = ProgressUpdate::for_column(PreprocessingStage::Scaling, "x", 0, 0, "");
        assert_eq!(update.stage_progress, 0.0);
    }

    #[test]
    fn test_terminal_updates() {
        let done = ProgressUpdate::complete("Done");
        assert!(done.stage.is_terminal());
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("Column 'Apps' not found in dataset");
        assert_eq!(failed.stage, PreprocessingStage::Failed);
        assert_eq!(failed.progress, 0.0);
        assert!(!PreprocessingStage::Writing.is_terminal());
    }

    #[test]
    fn test_working_stage_weights() {
        let total: f32 = PreprocessingStage::WORKING.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(PreprocessingStage::Complete.weight(), 0.0);
    }

    #[test]
    fn test_stages_start_where_previous_ends() {
        assert_eq!(PreprocessingStage::Loading.base_progress(), 0.0);
        for pair in PreprocessingStage::WORKING.windows(2) {
            let (previous, weight) = pair[0];
            let (next, _) = pair[1];
            assert!((previous.base_progress() + weight - next.base_progress()).abs() < 1e-6);
        }
        assert!((PreprocessingStage::Writing.base_progress() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_closure_reporter_from_worker_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let reporter = Arc::new(ClosureProgressReporter::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let worker = reporter.clone();
        std::thread::spawn(move || {
            worker.report(ProgressUpdate::new(PreprocessingStage::Cleaning, 0.0, "Cleaning"));
        })
        .join()
        .unwrap();
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_closure_reporter_receives_messages() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(update.message);
        });

        reporter.report(ProgressUpdate::new(PreprocessingStage::Encoding, 0.0, "Encoding"));

        assert_eq!(*messages.lock().unwrap(), vec!["Encoding".to_string()]);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PreprocessingStage::OutlierFiltering).unwrap(),
            "\"outlier_filtering\""
        );
        assert_eq!(
            serde_json::to_string(&PreprocessingStage::FeatureEngineering).unwrap(),
            "\"feature_engineering\""
        );
    }
}
