//! Main preprocessing pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the preprocessing stages.

use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::features::FeatureBuilder;
use crate::io::{load_csv, write_csv};
use crate::pipeline::outliers::OutlierHandler;
use crate::pipeline::plan::{self, StagePlan};
use crate::pipeline::progress::{
    ClosureProgressReporter, PreprocessingStage, ProgressReporter, ProgressUpdate,
};
use crate::transform::{OneHotEncoder, Scaler};
use crate::types::{ActionType, PipelineResult, PreprocessingAction, PreprocessingSummary};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Share of removed rows above which the summary carries a data-loss warning.
const HIGH_DATA_LOSS_PERCENT: f32 = 30.0;

/// The main preprocessing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use tabprep::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run("namadataset_raw/College.csv", "preprocessing/College_preprocessed.csv")?;
///
/// println!("{} rows written", result.summary.rows_after);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
}

// Embedders may run the pipeline on a worker thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load `input`, process it and write the result to `output`.
    ///
    /// Nothing is written when any stage fails.
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<PipelineResult> {
        let result = self.run_internal(input.as_ref(), output.as_ref());
        self.finish(result)
    }

    /// Process an in-memory table through every stage between loading and writing.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        let result = self.process_internal(df);
        self.finish(result)
    }

    /// Columns each stage would act on for this table, without transforming it.
    pub fn plan(&self, df: &DataFrame) -> Vec<StagePlan> {
        plan::plan_stages(&self.config, df)
    }

    fn finish(&self, result: Result<PipelineResult>) -> Result<PipelineResult> {
        match result {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, input: &Path, output: &Path) -> Result<PipelineResult> {
        let start_time = Instant::now();

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Loading,
            0.0,
            format!("Loading {}", input.display()),
        ));
        let df = load_csv(input)?;

        let mut result = self.process_internal(df)?;

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Writing,
            0.0,
            format!("Writing {}", output.display()),
        ));
        info!("Step 6: Writing output...");
        write_csv(&mut result.data, output)?;

        result.summary.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(result)
    }

    fn process_internal(&self, df: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting preprocessing pipeline...");

        let mut summary = PreprocessingSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();
        let mut processing_steps: Vec<String> = Vec::new();

        // Step 1: Cleaning
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Cleaning,
            0.0,
            "Removing duplicates and imputing missing values...",
        ));
        info!("Step 1: Cleaning...");

        let (mut df, cleaning) =
            self.cleaner
                .clean(df, &self.config.cleaning, &mut processing_steps)?;

        summary.duplicates_removed = cleaning.duplicates_removed;
        if cleaning.duplicates_removed > 0 {
            summary.add_action(PreprocessingAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows", cleaning.duplicates_removed),
            ));
        }
        for record in &cleaning.imputations {
            summary.add_action(PreprocessingAction::new(
                ActionType::ValueImputed,
                &record.column,
                format!(
                    "Filled {} missing values with median {:.4}",
                    record.filled_count, record.fill_value
                ),
            ));
        }
        for column in &cleaning.unfillable_columns {
            summary.add_warning(format!(
                "Column '{}' has no values to compute a median from; missing values kept",
                column
            ));
        }
        summary.imputations = cleaning.imputations;

        // Step 2: Outlier filtering
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::OutlierFiltering,
            0.0,
            "Filtering IQR outliers...",
        ));
        info!("Step 2: Filtering outliers...");

        let outliers =
            OutlierHandler::remove_outliers(&mut df, &self.config.outliers, &mut processing_steps)?;

        for (i, bounds) in outliers.bounds.iter().enumerate() {
            self.report_progress(ProgressUpdate::for_column(
                PreprocessingStage::OutlierFiltering,
                &bounds.column,
                i + 1,
                outliers.bounds.len(),
                format!("Removed {} rows in '{}'", bounds.rows_removed, bounds.column),
            ));
            summary.add_action(PreprocessingAction::new(
                ActionType::OutliersRemoved,
                &bounds.column,
                format!(
                    "Removed {} rows outside [{:.4}, {:.4}]",
                    bounds.rows_removed, bounds.lower, bounds.upper
                ),
            ));
        }
        record_skipped(&mut summary, "outlier filtering", &outliers.absent);
        for column in &outliers.empty {
            summary.add_warning(format!(
                "Column '{}' has no values; outlier filter skipped",
                column
            ));
        }
        summary.outlier_rows_removed = outliers.rows_removed();
        summary.outlier_bounds = outliers.bounds;

        // Step 3: Feature engineering
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::FeatureEngineering,
            0.0,
            "Deriving features...",
        ));
        info!("Step 3: Engineering features...");

        let features = &self.config.features;
        let mut declared_levels: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ratio) = &features.ratio {
            match FeatureBuilder::add_ratio_feature(
                &mut df,
                ratio,
                features.missing_columns,
                &mut processing_steps,
            )? {
                Some(output) => {
                    summary.add_action(PreprocessingAction::new(
                        ActionType::FeatureDerived,
                        &output,
                        format!(
                            "'{}' / '{}' * {}",
                            ratio.numerator, ratio.denominator, ratio.scale
                        ),
                    ));
                    summary.derived_columns.push(output);
                }
                None => summary.add_action(PreprocessingAction::new(
                    ActionType::ColumnSkipped,
                    &ratio.output,
                    "Ratio inputs not present",
                )),
            }
        }

        if let Some(binning) = &features.binning {
            match FeatureBuilder::add_quantile_bins(
                &mut df,
                binning,
                features.missing_columns,
                &mut processing_steps,
            )? {
                Some(record) => {
                    summary.add_action(PreprocessingAction::new(
                        ActionType::ColumnBinned,
                        &record.output,
                        format!(
                            "'{}' cut into {} equal-frequency bins",
                            record.source,
                            binning.bins()
                        ),
                    ));
                    if record.rank_fallback {
                        summary.add_warning(format!(
                            "Tied quantiles in '{}'; bins assigned by rank",
                            record.source
                        ));
                    }
                    declared_levels.insert(record.output.clone(), binning.labels.clone());
                    summary.derived_columns.push(record.output.clone());
                    summary.binning = Some(record);
                }
                None => summary.add_action(PreprocessingAction::new(
                    ActionType::ColumnSkipped,
                    &binning.output,
                    format!("Binning source '{}' not present or empty", binning.source),
                )),
            }
        }

        // Step 4: Scaling
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Scaling,
            0.0,
            "Standardizing and normalizing...",
        ));
        info!("Step 4: Scaling...");

        let standardized =
            Scaler::standardize(&mut df, &self.config.scaling, &mut processing_steps)?;
        for params in &standardized.params {
            summary.add_action(PreprocessingAction::new(
                ActionType::ColumnStandardized,
                &params.column,
                format!("mean {:.4}, std {:.4}", params.mean, params.std_dev),
            ));
        }
        record_skipped(&mut summary, "standardization", &standardized.absent);
        record_unscaled(&mut summary, &standardized.degenerate, &standardized.empty);
        summary.standardized = standardized.params;

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Scaling,
            0.5,
            "Normalizing...",
        ));
        let normalized = Scaler::normalize(&mut df, &self.config.scaling, &mut processing_steps)?;
        for params in &normalized.params {
            summary.add_action(PreprocessingAction::new(
                ActionType::ColumnNormalized,
                &params.column,
                format!("min {:.4}, max {:.4}", params.min, params.max),
            ));
        }
        record_skipped(&mut summary, "normalization", &normalized.absent);
        record_unscaled(&mut summary, &normalized.degenerate, &normalized.empty);
        summary.normalized = normalized.params;

        // Step 5: Encoding
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Encoding,
            0.0,
            "One-hot encoding categorical columns...",
        ));
        info!("Step 5: Encoding...");

        let encoding = OneHotEncoder::encode(
            &mut df,
            &self.config.encoding,
            &declared_levels,
            &mut processing_steps,
        )?;
        for encoded in &encoding.encoded {
            summary.add_action(PreprocessingAction::new(
                ActionType::ColumnEncoded,
                &encoded.source,
                format!(
                    "{} indicators, reference level {:?}",
                    encoded.indicators.len(),
                    encoded.dropped
                ),
            ));
        }
        record_skipped(&mut summary, "encoding", &encoding.absent);
        summary.encoded = encoding.encoded;

        // Finalize summary
        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.processing_steps = processing_steps;

        if summary.rows_removed_percentage() > HIGH_DATA_LOSS_PERCENT {
            summary.add_warning(format!(
                "High data loss: {:.1}% of rows were removed",
                summary.rows_removed_percentage()
            ));
        }

        info!(
            "Preprocessing complete: {} -> {} rows, {} -> {} columns",
            summary.rows_before, summary.rows_after, summary.columns_before, summary.columns_after
        );

        Ok(PipelineResult { data: df, summary })
    }
}

fn record_skipped(summary: &mut PreprocessingSummary, stage: &str, columns: &[String]) {
    for column in columns {
        summary.add_action(PreprocessingAction::new(
            ActionType::ColumnSkipped,
            column,
            format!("Not present; skipped by {}", stage),
        ));
    }
}

fn record_unscaled(summary: &mut PreprocessingSummary, degenerate: &[String], empty: &[String]) {
    for column in degenerate {
        summary.add_warning(format!("Column '{}' has no spread", column));
    }
    for column in empty {
        summary.add_warning(format!("Column '{}' has no finite values; not scaled", column));
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tabprep::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For anything beyond simple printing, use
    /// [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner,
        })
    }
}
