//! Outlier handling module.
//!
//! Removes rows whose values fall outside the IQR fence of each configured
//! column. Columns are filtered one after another, and every column's
//! quartiles are computed on the table left by the previous filters.

use crate::config::OutlierConfig;
use crate::error::Result;
use crate::types::IqrBounds;
use crate::utils::{numeric_values, quantile_sorted, resolve_columns, sorted_finite};
use polars::prelude::*;
use tracing::{debug, warn};

/// What the outlier filter did to the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierOutcome {
    /// Fence applied per filtered column, in filtering order.
    pub bounds: Vec<IqrBounds>,
    /// Configured columns absent from the table.
    pub absent: Vec<String>,
    /// Present columns without any value to compute quartiles from.
    pub empty: Vec<String>,
}

impl OutlierOutcome {
    /// Total rows removed across all columns.
    pub fn rows_removed(&self) -> usize {
        self.bounds.iter().map(|b| b.rows_removed).sum()
    }
}

/// Handles outlier detection and removal.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Compute the IQR fence `[Q1 - k*IQR, Q3 + k*IQR]` of a set of values.
    ///
    /// Returns `None` when there is no non-missing value.
    pub fn iqr_bounds(column: &str, values: &[Option<f64>], k: f64) -> Option<IqrBounds> {
        let sorted = sorted_finite(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;

        Some(IqrBounds {
            column: column.to_string(),
            q1,
            q3,
            iqr,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
            rows_before: values.len(),
            rows_removed: 0,
        })
    }

    /// Remove rows outside the IQR fence of each configured column, in order.
    ///
    /// A missing value fails the fence comparison and its row is removed.
    pub fn remove_outliers(
        df: &mut DataFrame,
        config: &OutlierConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<OutlierOutcome> {
        let resolved = resolve_columns(df, &config.columns, config.missing_columns, "outliers")?;
        let mut outcome = OutlierOutcome {
            absent: resolved.absent,
            ..OutlierOutcome::default()
        };

        for col_name in &resolved.present {
            let values = numeric_values(df, col_name)?;

            let Some(mut bounds) = Self::iqr_bounds(col_name, &values, config.iqr_multiplier)
            else {
                warn!("No values in '{}' to compute quartiles from, skipping", col_name);
                outcome.empty.push(col_name.clone());
                continue;
            };

            let mask_values: Vec<bool> = values
                .iter()
                .map(|v| v.is_some_and(|val| bounds.contains(val)))
                .collect();

            let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
            *df = df.filter(&mask)?;

            bounds.rows_removed = bounds.rows_before - df.height();
            debug!(
                "'{}': Q1={:.4}, Q3={:.4}, bounds=[{:.4}, {:.4}], removed {} rows",
                col_name, bounds.q1, bounds.q3, bounds.lower, bounds.upper, bounds.rows_removed
            );
            processing_steps.push(format!(
                "Removed {} outlier rows in '{}' outside [{:.2}, {:.2}]",
                bounds.rows_removed, col_name, bounds.lower, bounds.upper
            ));
            outcome.bounds.push(bounds);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingColumnPolicy;

    fn config_for(columns: &[&str]) -> OutlierConfig {
        OutlierConfig {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            ..OutlierConfig::default()
        }
    }

    fn f64_values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_iqr_bounds_values() {
        // Q1 = 3.25, Q3 = 7.75, IQR = 4.5 -> [-3.5, 14.5]
        let values: Vec<Option<f64>> = (1..=10).map(|x| Some(x as f64)).collect();
        let bounds = OutlierHandler::iqr_bounds("v", &values, 1.5).unwrap();

        assert_eq!(bounds.q1, 3.25);
        assert_eq!(bounds.q3, 7.75);
        assert_eq!(bounds.iqr, 4.5);
        assert_eq!(bounds.lower, -3.5);
        assert_eq!(bounds.upper, 14.5);
    }

    #[test]
    fn test_iqr_bounds_empty() {
        assert!(OutlierHandler::iqr_bounds("v", &[None, None], 1.5).is_none());
    }

    #[test]
    fn test_remove_outliers_basic() {
        let mut df = df![
            "value" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
        ]
        .unwrap();
        let mut steps = vec![];

        let outcome =
            OutlierHandler::remove_outliers(&mut df, &config_for(&["value"]), &mut steps).unwrap();

        assert_eq!(df.height(), 9);
        assert_eq!(outcome.rows_removed(), 1);
        assert!(f64_values(&df, "value").iter().all(|v| *v < 100.0));
        assert!(steps[0].contains("value"));
    }

    #[test]
    fn test_remove_outliers_no_outliers() {
        let mut df = df![
            "value" => [1i64, 2, 3, 4, 5],
        ]
        .unwrap();
        let mut steps = vec![];

        OutlierHandler::remove_outliers(&mut df, &config_for(&["value"]), &mut steps).unwrap();

        assert_eq!(df.height(), 5);
    }

    #[test]
    fn test_remove_outliers_iqr_zero() {
        // All same values: IQR = 0, bounds = [5, 5]
        let mut df = df![
            "value" => [5.0, 5.0, 5.0, 5.0, 5.0],
        ]
        .unwrap();
        let mut steps = vec![];

        OutlierHandler::remove_outliers(&mut df, &config_for(&["value"]), &mut steps).unwrap();

        assert_eq!(df.height(), 5);
    }

    #[test]
    fn test_remove_outliers_drops_missing_values() {
        let mut df = df![
            "value" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
        ]
        .unwrap();
        let mut steps = vec![];

        OutlierHandler::remove_outliers(&mut df, &config_for(&["value"]), &mut steps).unwrap();

        assert_eq!(df.height(), 4);
        assert_eq!(df.column("value").unwrap().null_count(), 0);
    }

    #[test]
    fn test_remove_outliers_sequential_recomputation() {
        // Row 9 is an outlier in `a`. On all 10 rows `b` has Q3 = 7.5 and
        // keeps 10 and 12; once row 9 is gone Q3 drops to 0 and both go.
        let mut df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1000.0],
            "b" => [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 12.0, 1000.0],
        ]
        .unwrap();
        let mut steps = vec![];

        let outcome =
            OutlierHandler::remove_outliers(&mut df, &config_for(&["a", "b"]), &mut steps)
                .unwrap();

        assert_eq!(outcome.bounds.len(), 2);
        assert_eq!(outcome.bounds[0].rows_before, 10);
        assert_eq!(outcome.bounds[1].rows_before, 9);
        assert_eq!(outcome.bounds[1].q3, 0.0);
        assert_eq!(df.height(), 7);
        assert!(!f64_values(&df, "b").contains(&12.0));
    }

    #[test]
    fn test_survivors_within_recorded_bounds() {
        let mut df = df![
            "x" => [3.0, 4.0, 5.0, 5.0, 6.0, 7.0, -50.0, 80.0, 5.5, 4.5],
            "y" => [1.0, 1.2, 0.9, 1.1, 25.0, 1.0, 1.3, 0.8, 1.05, 0.95],
        ]
        .unwrap();
        let mut steps = vec![];

        let outcome =
            OutlierHandler::remove_outliers(&mut df, &config_for(&["x", "y"]), &mut steps)
                .unwrap();

        for bounds in &outcome.bounds {
            for v in f64_values(&df, &bounds.column) {
                assert!(bounds.contains(v), "{} outside bounds for {}", v, bounds.column);
            }
        }
    }

    #[test]
    fn test_absent_column_skipped() {
        let mut df = df![
            "other" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let mut steps = vec![];

        let outcome =
            OutlierHandler::remove_outliers(&mut df, &config_for(&["missing"]), &mut steps)
                .unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(outcome.absent, ["missing"]);
        assert!(outcome.bounds.is_empty());
    }

    #[test]
    fn test_absent_column_required() {
        let mut df = df!["other" => [1.0]].unwrap();
        let config = OutlierConfig {
            missing_columns: MissingColumnPolicy::Require,
            ..config_for(&["missing"])
        };

        let err = OutlierHandler::remove_outliers(&mut df, &config, &mut vec![]).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_non_numeric_column_is_data_error() {
        let mut df = df!["name" => ["a", "b", "c"]].unwrap();

        let err = OutlierHandler::remove_outliers(&mut df, &config_for(&["name"]), &mut vec![])
            .unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");
    }

    #[test]
    fn test_all_null_column_skipped() {
        let mut df = df![
            "empty" => [Option::<f64>::None, None],
        ]
        .unwrap();

        let outcome =
            OutlierHandler::remove_outliers(&mut df, &config_for(&["empty"]), &mut vec![])
                .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(outcome.empty, ["empty"]);
    }
}
