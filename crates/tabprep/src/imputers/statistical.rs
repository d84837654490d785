//! Statistical imputation methods.

use crate::error::Result;
use crate::types::ImputationRecord;
use crate::utils::numeric_values;
use polars::prelude::*;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Apply median imputation to a numeric column.
    ///
    /// The median is taken over the non-missing values. Columns without
    /// nulls, and columns with no values at all, are left unchanged and
    /// return `None`.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<Option<ImputationRecord>> {
        let column = df.column(col_name)?;
        let null_count = column.null_count();
        if null_count == 0 {
            return Ok(None);
        }

        let Some(median_val) = column.as_materialized_series().median() else {
            return Ok(None);
        };

        Self::fill_with_value(df, col_name, median_val, processing_steps, "median")?;

        Ok(Some(ImputationRecord {
            column: col_name.to_string(),
            fill_value: median_val,
            filled_count: null_count,
        }))
    }

    /// Fill nulls of a numeric column with a value, producing a Float64 column.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        processing_steps: &mut Vec<String>,
        method: &str,
    ) -> Result<()> {
        let filled: Vec<f64> = numeric_values(df, col_name)?
            .into_iter()
            .map(|v| v.unwrap_or(fill_value))
            .collect();

        let result = Series::new(col_name.into(), filled);
        df.replace(col_name, result)?;

        processing_steps.push(format!(
            "Filled '{}' with {}: {:.2}",
            col_name, method, fill_value
        ));

        Ok(())
    }
}
