//! Tabular Preprocessing Pipeline Library
//!
//! A single-pass, offline cleaning and transformation pipeline for flat
//! tables, built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline loads a comma-delimited file, runs a fixed sequence of
//! stages on the in-memory table and writes the result:
//!
//! - **Cleaning**: duplicate removal, median imputation of numeric columns
//! - **Outlier Filtering**: IQR fences applied column by column
//! - **Feature Engineering**: derived ratio columns, equal-frequency binning
//! - **Scaling**: standardization and min-max normalization
//! - **Encoding**: one-hot encoding with an optional reference level
//! - **Progress Reporting**: stage-by-stage progress updates
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabprep::{Pipeline, PipelineConfig};
//!
//! // The default configuration is the College preset
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("namadataset_raw/College.csv", "preprocessing/College_preprocessed.csv")?;
//!
//! println!("{} -> {} rows", result.summary.rows_before, result.summary.rows_after);
//! ```
//!
//! # Configuration
//!
//! Every stage takes its target columns and thresholds from [`PipelineConfig`],
//! so the same pipeline runs against other schemas:
//!
//! ```rust,ignore
//! use tabprep::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .outlier_columns(["price", "area"])
//!     .iqr_multiplier(3.0)
//!     .ratio_feature(None)
//!     .binning(None)
//!     .standardize_columns(["price", "area"])
//!     .normalize_columns(["rooms"])
//!     .encode_columns(["city"])
//!     .missing_column_policy(MissingColumnPolicy::Require)
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleaningOutcome, DataCleaner};
pub use config::{
    BinningConfig, CategoryOrder, CleaningConfig, ConfigValidationError, DegeneratePolicy,
    EncodingConfig, FeatureConfig, MissingColumnPolicy, OutlierConfig, PipelineConfig,
    PipelineConfigBuilder, RatioFeature, ScalingConfig,
};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use features::FeatureBuilder;
pub use imputers::StatisticalImputer;
pub use io::{load_csv, write_csv};
pub use pipeline::{
    ClosureProgressReporter, OutlierHandler, Pipeline, PipelineBuilder, PreprocessingStage,
    ProgressReporter, ProgressUpdate, StagePlan,
};
pub use reporting::{ReportGenerator, RunOverview, RunReport};
pub use transform::{OneHotEncoder, Scaler};
pub use types::{
    ActionType, BinningRecord, EncodedColumn, ImputationRecord, IqrBounds, MinMaxScalerParams,
    PipelineResult, PreprocessingAction, PreprocessingSummary, StandardScalerParams,
};
