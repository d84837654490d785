//! Shared utilities for the preprocessing pipeline.
//!
//! Column resolution, numeric extraction and order statistics used by
//! several stages.

use crate::config::MissingColumnPolicy;
use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use tracing::debug;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of all numeric columns, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

// =============================================================================
// Column Resolution
// =============================================================================

/// Configured columns split by whether the table has them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

/// Resolve a stage's configured columns against the table.
///
/// Under [`MissingColumnPolicy::Skip`] absent columns are returned in
/// `absent`; under [`MissingColumnPolicy::Require`] the first absent column
/// is a `ColumnNotFound` error.
pub fn resolve_columns(
    df: &DataFrame,
    columns: &[String],
    policy: MissingColumnPolicy,
    stage: &str,
) -> Result<ResolvedColumns> {
    let mut resolved = ResolvedColumns::default();
    for name in columns {
        if df.column(name).is_ok() {
            resolved.present.push(name.clone());
        } else {
            match policy {
                MissingColumnPolicy::Skip => {
                    debug!("{}: column '{}' not present, skipping", stage, name);
                    resolved.absent.push(name.clone());
                }
                MissingColumnPolicy::Require => {
                    return Err(PreprocessingError::ColumnNotFound(name.clone()));
                }
            }
        }
    }
    Ok(resolved)
}

// =============================================================================
// Numeric Extraction
// =============================================================================

/// Read a numeric column as `Option<f64>` values (`None` for nulls).
///
/// Returns a `DataError` when the column is not numeric.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(PreprocessingError::data_error(
            name,
            format!("expected a numeric column, found {}", column.dtype()),
        ));
    }
    let float_series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = float_series.f64()?.into_iter().collect();
    Ok(values)
}

/// Non-missing, finite values sorted ascending.
pub fn sorted_finite(values: &[Option<f64>]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile of sorted values with linear interpolation between closest
/// ranks (position `(n - 1) * p`). Returns `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let position = (sorted.len() - 1) as f64 * p;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
