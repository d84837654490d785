//! Configuration types for the preprocessing pipeline.
//!
//! Every stage receives its own configuration struct carrying the target
//! columns and thresholds it acts on. [`PipelineConfig::default()`] is the
//! College preset; other schemas are described by building a config with
//! [`PipelineConfig::builder()`] or by loading one from JSON.

use crate::error::{PreprocessingError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// What a stage does when one of its configured columns is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Skip the column and continue (logged at debug level)
    #[default]
    Skip,
    /// Fail the run with `ColumnNotFound`
    Require,
}

/// How scalers treat a column with no spread (zero variance or `max == min`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Use a divisor of 1, so the column is centered (all zeros)
    #[default]
    Center,
    /// Leave the column untouched
    Unchanged,
    /// Fail the run with a `DataError`
    Error,
}

/// Category ordering used to pick the dropped reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOrder {
    /// Sort categories lexically
    #[default]
    Lexical,
    /// Keep categories in order of first appearance
    FirstSeen,
}

/// Duplicate removal and imputation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Collapse rows identical across all columns, keeping the first.
    /// Default: true
    pub remove_duplicates: bool,

    /// Fill missing numeric cells with the column median.
    /// Default: true
    pub impute_numeric_median: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            impute_numeric_median: true,
        }
    }
}

/// IQR outlier filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Columns filtered in order; each filter sees the table left by the previous one.
    pub columns: Vec<String>,

    /// Fence multiplier `k` in `[Q1 - k*IQR, Q3 + k*IQR]`.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    pub missing_columns: MissingColumnPolicy,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            columns: strings(&["Apps", "Accept", "Enroll", "Expend"]),
            iqr_multiplier: 1.5,
            missing_columns: MissingColumnPolicy::default(),
        }
    }
}

/// Derived `output = numerator / denominator * scale` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioFeature {
    pub numerator: String,
    pub denominator: String,
    pub output: String,
    /// Default: 100.0 (percentage)
    #[serde(default = "default_ratio_scale")]
    pub scale: f64,
}

fn default_ratio_scale() -> f64 {
    100.0
}

impl Default for RatioFeature {
    fn default() -> Self {
        Self {
            numerator: "Accept".to_string(),
            denominator: "Apps".to_string(),
            output: "Accept_Rate".to_string(),
            scale: default_ratio_scale(),
        }
    }
}

/// Equal-frequency binning of a continuous column.
///
/// The number of bins is the number of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    pub source: String,
    pub output: String,
    pub labels: Vec<String>,
}

impl BinningConfig {
    /// Number of bins produced.
    pub fn bins(&self) -> usize {
        self.labels.len()
    }
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            source: "Grad.Rate".to_string(),
            output: "Grad_Category".to_string(),
            labels: strings(&["Low_Grad_Rate", "Medium_Grad_Rate", "High_Grad_Rate"]),
        }
    }
}

/// Derived-feature settings. A `None` feature is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub ratio: Option<RatioFeature>,
    pub binning: Option<BinningConfig>,
    pub missing_columns: MissingColumnPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ratio: Some(RatioFeature::default()),
            binning: Some(BinningConfig::default()),
            missing_columns: MissingColumnPolicy::default(),
        }
    }
}

/// Standardization and min-max normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    /// Columns rescaled to zero mean and unit variance.
    pub standardize: Vec<String>,

    /// Columns rescaled to `[0, 1]`.
    pub normalize: Vec<String>,

    /// Default: Center
    pub degenerate: DegeneratePolicy,

    pub missing_columns: MissingColumnPolicy,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            standardize: strings(&["Apps", "Accept", "Enroll", "Outstate", "Expend", "Room.Board"]),
            normalize: strings(&["PhD", "S.F.Ratio", "Grad.Rate", "Accept_Rate", "perc.alumni"]),
            degenerate: DegeneratePolicy::default(),
            missing_columns: MissingColumnPolicy::default(),
        }
    }
}

/// One-hot encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub columns: Vec<String>,

    /// Omit the first category's indicator (reference-level encoding).
    /// Default: true
    pub drop_first: bool,

    /// Ordering for columns without a declared category order.
    /// Default: Lexical
    pub category_order: CategoryOrder,

    pub missing_columns: MissingColumnPolicy,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            columns: strings(&["Private", "Grad_Category"]),
            drop_first: true,
            category_order: CategoryOrder::default(),
            missing_columns: MissingColumnPolicy::default(),
        }
    }
}

/// Configuration for the preprocessing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tabprep::config::{PipelineConfig, DegeneratePolicy};
///
/// let config = PipelineConfig::builder()
///     .outlier_columns(["price", "area"])
///     .iqr_multiplier(3.0)
///     .degenerate_policy(DegeneratePolicy::Error)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cleaning: CleaningConfig,
    pub outliers: OutlierConfig,
    pub features: FeatureConfig,
    pub scaling: ScalingConfig,
    pub encoding: EncodingConfig,
}

impl PipelineConfig {
    /// Create a new configuration builder, starting from the defaults.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PreprocessingError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config '{}'", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let k = self.outliers.iqr_multiplier;
        if !k.is_finite() || k < 0.0 {
            return Err(ConfigValidationError::InvalidIqrMultiplier(k));
        }

        if let Some(ratio) = &self.features.ratio {
            if !ratio.scale.is_finite() {
                return Err(ConfigValidationError::InvalidRatioScale(ratio.scale));
            }
            for (field, name) in [
                ("ratio.numerator", &ratio.numerator),
                ("ratio.denominator", &ratio.denominator),
                ("ratio.output", &ratio.output),
            ] {
                if name.trim().is_empty() {
                    return Err(ConfigValidationError::EmptyColumnName(field));
                }
            }
        }

        if let Some(binning) = &self.features.binning {
            if binning.source.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName("binning.source"));
            }
            if binning.output.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName("binning.output"));
            }
            if binning.bins() < 2 {
                return Err(ConfigValidationError::InvalidBinCount(binning.bins()));
            }
            let mut seen = HashSet::new();
            for label in &binning.labels {
                if !seen.insert(label.as_str()) {
                    return Err(ConfigValidationError::DuplicateBinLabel(label.clone()));
                }
            }
        }

        if let (Some(ratio), Some(binning)) = (&self.features.ratio, &self.features.binning)
            && ratio.output == binning.output
        {
            return Err(ConfigValidationError::OutputCollision(ratio.output.clone()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid IQR multiplier: {0} (must be finite and non-negative)")]
    InvalidIqrMultiplier(f64),

    #[error("Invalid ratio scale: {0} (must be finite)")]
    InvalidRatioScale(f64),

    #[error("Invalid bin count: {0} (at least 2 labels are required)")]
    InvalidBinCount(usize),

    #[error("Duplicate bin label: '{0}'")]
    DuplicateBinLabel(String),

    #[error("Empty column name for '{0}'")]
    EmptyColumnName(&'static str),

    #[error("Derived features both write column '{0}'")]
    OutputCollision(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.config.cleaning.remove_duplicates = remove;
        self
    }

    /// Enable or disable median imputation of numeric columns.
    pub fn impute_numeric_median(mut self, impute: bool) -> Self {
        self.config.cleaning.impute_numeric_median = impute;
        self
    }

    /// Set the columns filtered by the IQR fence, in filtering order.
    pub fn outlier_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.outliers.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fence multiplier `k` (1.5 by default).
    pub fn iqr_multiplier(mut self, k: f64) -> Self {
        self.config.outliers.iqr_multiplier = k;
        self
    }

    /// Set (or disable with `None`) the derived ratio feature.
    pub fn ratio_feature(mut self, ratio: Option<RatioFeature>) -> Self {
        self.config.features.ratio = ratio;
        self
    }

    /// Set (or disable with `None`) equal-frequency binning.
    pub fn binning(mut self, binning: Option<BinningConfig>) -> Self {
        self.config.features.binning = binning;
        self
    }

    /// Set the columns standardized to zero mean and unit variance.
    pub fn standardize_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scaling.standardize = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the columns normalized to `[0, 1]`.
    pub fn normalize_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scaling.normalize = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set how scalers treat columns with no spread.
    pub fn degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.config.scaling.degenerate = policy;
        self
    }

    /// Set the categorical columns to one-hot encode.
    pub fn encode_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.encoding.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable dropping the reference category.
    pub fn drop_first(mut self, drop_first: bool) -> Self {
        self.config.encoding.drop_first = drop_first;
        self
    }

    /// Set the ordering used for columns without declared categories.
    pub fn category_order(mut self, order: CategoryOrder) -> Self {
        self.config.encoding.category_order = order;
        self
    }

    /// Apply one absent-column policy to every stage.
    pub fn missing_column_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.config.outliers.missing_columns = policy;
        self.config.features.missing_columns = policy;
        self.config.scaling.missing_columns = policy;
        self.config.encoding.missing_columns = policy;
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
