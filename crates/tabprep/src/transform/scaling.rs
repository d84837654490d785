//! Standardization and min-max normalization.

use crate::config::{DegeneratePolicy, ScalingConfig};
use crate::error::{PreprocessingError, Result};
use crate::types::{MinMaxScalerParams, StandardScalerParams};
use crate::utils::{numeric_values, resolve_columns};
use polars::prelude::*;
use tracing::{debug, warn};

/// Relative tolerance under which a standard deviation counts as zero.
const ZERO_SPREAD_TOLERANCE: f64 = 1e-12;

/// Result of scaling one group of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledColumns<P> {
    /// Fitted parameters of every rescaled column, in configured order.
    pub params: Vec<P>,
    /// Configured columns absent from the table.
    pub absent: Vec<String>,
    /// Columns without spread, handled per [`DegeneratePolicy`].
    pub degenerate: Vec<String>,
    /// Columns without any finite value, left unchanged.
    pub empty: Vec<String>,
}

impl<P> Default for ScaledColumns<P> {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            absent: Vec::new(),
            degenerate: Vec::new(),
            empty: Vec::new(),
        }
    }
}

/// Rescales numeric columns in place, fitted on the current table.
pub struct Scaler;

impl Scaler {
    /// Standardize `config.standardize` columns to `(v - mean) / std`.
    ///
    /// Uses the population standard deviation. Statistics ignore missing
    /// and non-finite values, which pass through unchanged.
    pub fn standardize(
        df: &mut DataFrame,
        config: &ScalingConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<ScaledColumns<StandardScalerParams>> {
        let resolved =
            resolve_columns(df, &config.standardize, config.missing_columns, "standardize")?;
        let mut outcome = ScaledColumns {
            absent: resolved.absent,
            ..ScaledColumns::default()
        };

        for col_name in &resolved.present {
            let values = numeric_values(df, col_name)?;
            let finite: Vec<f64> = values
                .iter()
                .flatten()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            if finite.is_empty() {
                warn!("No finite values in '{}', leaving it unchanged", col_name);
                outcome.empty.push(col_name.clone());
                continue;
            }

            let n = finite.len() as f64;
            let mean = finite.iter().sum::<f64>() / n;
            let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();

            let mut divisor = std_dev;
            if std_dev < ZERO_SPREAD_TOLERANCE * mean.abs().max(1.0) {
                match Self::degenerate_divisor(col_name, config.degenerate, "zero variance")? {
                    Some(d) => divisor = d,
                    None => {
                        outcome.degenerate.push(col_name.clone());
                        continue;
                    }
                }
                outcome.degenerate.push(col_name.clone());
            }

            Self::rescale(df, col_name, &values, mean, divisor)?;
            debug!("Standardized '{}': mean={:.4}, std={:.4}", col_name, mean, std_dev);
            processing_steps.push(format!(
                "Standardized '{}' (mean {:.2}, std {:.2})",
                col_name, mean, std_dev
            ));
            outcome.params.push(StandardScalerParams {
                column: col_name.clone(),
                mean,
                std_dev,
            });
        }

        Ok(outcome)
    }

    /// Normalize `config.normalize` columns to `(v - min) / (max - min)`.
    ///
    /// Min and max ignore missing and non-finite values, which pass
    /// through unchanged.
    pub fn normalize(
        df: &mut DataFrame,
        config: &ScalingConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<ScaledColumns<MinMaxScalerParams>> {
        let resolved = resolve_columns(df, &config.normalize, config.missing_columns, "normalize")?;
        let mut outcome = ScaledColumns {
            absent: resolved.absent,
            ..ScaledColumns::default()
        };

        for col_name in &resolved.present {
            let values = numeric_values(df, col_name)?;
            let (min, max) = values
                .iter()
                .flatten()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                });
            if min > max {
                warn!("No finite values in '{}', leaving it unchanged", col_name);
                outcome.empty.push(col_name.clone());
                continue;
            }

            let mut divisor = max - min;
            if divisor == 0.0 {
                match Self::degenerate_divisor(col_name, config.degenerate, "max equals min")? {
                    Some(d) => divisor = d,
                    None => {
                        outcome.degenerate.push(col_name.clone());
                        continue;
                    }
                }
                outcome.degenerate.push(col_name.clone());
            }

            Self::rescale(df, col_name, &values, min, divisor)?;
            debug!("Normalized '{}': min={:.4}, max={:.4}", col_name, min, max);
            processing_steps.push(format!(
                "Normalized '{}' (min {:.2}, max {:.2})",
                col_name, min, max
            ));
            outcome.params.push(MinMaxScalerParams {
                column: col_name.clone(),
                min,
                max,
            });
        }

        Ok(outcome)
    }

    /// Divisor to use for a column without spread, or `None` to leave it unchanged.
    fn degenerate_divisor(
        col_name: &str,
        policy: DegeneratePolicy,
        reason: &str,
    ) -> Result<Option<f64>> {
        match policy {
            DegeneratePolicy::Center => {
                warn!("Column '{}' has {}, centering only", col_name, reason);
                Ok(Some(1.0))
            }
            DegeneratePolicy::Unchanged => {
                warn!("Column '{}' has {}, leaving it unchanged", col_name, reason);
                Ok(None)
            }
            DegeneratePolicy::Error => Err(PreprocessingError::data_error(
                col_name,
                format!("cannot rescale a column with {}", reason),
            )),
        }
    }

    /// Replace a column with `(v - offset) / divisor` as Float64.
    fn rescale(
        df: &mut DataFrame,
        col_name: &str,
        values: &[Option<f64>],
        offset: f64,
        divisor: f64,
    ) -> Result<()> {
        let scaled: Vec<Option<f64>> = values
            .iter()
            .map(|v| v.map(|v| if v.is_finite() { (v - offset) / divisor } else { v }))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), scaled))?;
        Ok(())
    }
}
