//! Result and summary types produced by a pipeline run.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Output of [`Pipeline::process`](crate::Pipeline::process): the final
/// table plus a summary of everything the run did to it.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub data: DataFrame,
    pub summary: PreprocessingSummary,
}

/// Median fill applied to one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub fill_value: f64,
    pub filled_count: usize,
}

/// IQR fence used to filter one column, computed on the table as it was
/// before that column's filter ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    pub rows_before: usize,
    pub rows_removed: usize,
}

impl IqrBounds {
    /// Whether a value lies inside the fence (bounds inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Equal-frequency binning applied to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningRecord {
    pub source: String,
    pub output: String,
    /// Quantile cut points, `bins + 1` values from min to max.
    pub edges: Vec<f64>,
    /// Row count per label, in label order.
    pub counts: Vec<(String, usize)>,
    /// True when tied edges forced rank-based assignment.
    pub rank_fallback: bool,
}

/// Fitted parameters of a standardized column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    pub column: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Fitted parameters of a min-max normalized column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerParams {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// One-hot encoding applied to a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub source: String,
    /// Observed categories in encoding order.
    pub categories: Vec<String>,
    /// Reference category without an indicator, if any.
    pub dropped: Option<String>,
    /// Indicator column names added to the table.
    pub indicators: Vec<String>,
}

/// Types of actions taken during preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Duplicate rows were removed
    DuplicatesRemoved,
    /// Missing values were imputed
    ValueImputed,
    /// Rows outside an IQR fence were removed
    OutliersRemoved,
    /// A derived column was added
    FeatureDerived,
    /// A continuous column was binned
    ColumnBinned,
    /// A column was standardized
    ColumnStandardized,
    /// A column was normalized
    ColumnNormalized,
    /// A categorical column was one-hot encoded
    ColumnEncoded,
    /// A configured column was absent or unusable and skipped
    ColumnSkipped,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::ValueImputed => "Value Imputed",
            Self::OutliersRemoved => "Outliers Removed",
            Self::FeatureDerived => "Feature Derived",
            Self::ColumnBinned => "Column Binned",
            Self::ColumnStandardized => "Column Standardized",
            Self::ColumnNormalized => "Column Normalized",
            Self::ColumnEncoded => "Column Encoded",
            Self::ColumnSkipped => "Column Skipped",
        };
        write!(f, "{}", name)
    }
}

/// A single preprocessing action taken by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingAction {
    pub action_type: ActionType,
    /// Column the action applies to ("dataset" for table-wide actions).
    pub target: String,
    pub description: String,
}

impl PreprocessingAction {
    /// Create a new preprocessing action.
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Human-readable and machine-checkable summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    pub duplicates_removed: usize,
    pub outlier_rows_removed: usize,

    pub imputations: Vec<ImputationRecord>,
    pub outlier_bounds: Vec<IqrBounds>,
    pub derived_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binning: Option<BinningRecord>,
    pub standardized: Vec<StandardScalerParams>,
    pub normalized: Vec<MinMaxScalerParams>,
    pub encoded: Vec<EncodedColumn>,

    /// Ordered log of everything the pipeline did.
    pub actions: Vec<PreprocessingAction>,

    /// One line per processing step, in execution order.
    pub processing_steps: Vec<String>,

    /// Warnings and notes generated during preprocessing.
    pub warnings: Vec<String>,
}

impl PreprocessingSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the summary.
    pub fn add_action(&mut self, action: PreprocessingAction) {
        self.actions.push(action);
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed overall (duplicates and outliers).
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Actions of the given type.
    pub fn actions_of(&self, action_type: ActionType) -> impl Iterator<Item = &PreprocessingAction> {
        self.actions
            .iter()
            .filter(move |action| action.action_type == action_type)
    }
}
