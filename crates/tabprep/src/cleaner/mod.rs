//! Data cleaning: duplicate removal and median imputation.

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::types::ImputationRecord;
use crate::utils::numeric_column_names;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// What a cleaning pass did to the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningOutcome {
    pub duplicates_removed: usize,
    pub imputations: Vec<ImputationRecord>,
    /// Numeric columns with missing values but no median (all values missing).
    pub unfillable_columns: Vec<String>,
}

/// Data cleaner for duplicate removal and missing-value imputation.
pub struct DataCleaner;

impl DataCleaner {
    /// Run the cleaning stage.
    ///
    /// 1. Remove duplicate rows (keep first, order preserved)
    /// 2. Fill missing numeric cells with the column median, computed after step 1
    pub fn clean(
        &self,
        df: DataFrame,
        config: &CleaningConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, CleaningOutcome)> {
        let mut outcome = CleaningOutcome::default();
        let mut df = df;

        info!("Performing data cleaning...");

        if config.remove_duplicates {
            let (deduped, removed) = self.remove_duplicates(df)?;
            df = deduped;
            outcome.duplicates_removed = removed;

            if removed > 0 {
                processing_steps.push(format!("Removed {} duplicate rows", removed));
            } else {
                processing_steps.push("No duplicate rows found".to_string());
            }
        }

        if config.impute_numeric_median {
            let (imputations, unfillable) =
                self.impute_numeric_medians(&mut df, processing_steps)?;
            outcome.imputations = imputations;
            outcome.unfillable_columns = unfillable;
        }

        Ok((df, outcome))
    }

    /// Collapse rows identical across all columns to their first occurrence.
    ///
    /// Survivor order is preserved. Returns the table and the number of rows removed.
    pub fn remove_duplicates(&self, df: DataFrame) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = before - deduped.height();

        if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            debug!("Removed {} duplicate rows ({:.1}%)", removed, pct);
        } else {
            debug!("No duplicate rows found");
        }

        Ok((deduped, removed))
    }

    /// Fill missing cells of every numeric column with that column's median.
    ///
    /// Non-numeric columns are untouched. Returns the fills applied and the
    /// numeric columns that could not be filled.
    pub fn impute_numeric_medians(
        &self,
        df: &mut DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> Result<(Vec<ImputationRecord>, Vec<String>)> {
        let mut imputations = Vec::new();
        let mut unfillable = Vec::new();

        for col_name in numeric_column_names(df) {
            let null_count = df.column(&col_name)?.null_count();
            if null_count == 0 {
                continue;
            }

            match StatisticalImputer::apply_numeric_median(df, &col_name, processing_steps)? {
                Some(record) => {
                    debug!(
                        "Imputed {} values in '{}' with median {:.4}",
                        record.filled_count, record.column, record.fill_value
                    );
                    imputations.push(record);
                }
                None => {
                    warn!("Column '{}' has no values to compute a median from", col_name);
                    unfillable.push(col_name);
                }
            }
        }

        Ok((imputations, unfillable))
    }
}
