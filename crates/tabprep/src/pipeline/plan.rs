//! Dry-run planning: which columns each stage would act on.
//!
//! The plan tracks the columns the feature stage would derive, so later
//! stages that target derived columns are reported as present.

use crate::config::PipelineConfig;
use crate::pipeline::progress::PreprocessingStage;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Columns one stage would touch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagePlan {
    pub stage: PreprocessingStage,
    /// What the stage does to `columns`.
    pub operation: String,
    /// Configured columns the stage would act on.
    pub columns: Vec<String>,
    /// Configured columns that would be absent when the stage runs.
    pub absent: Vec<String>,
}

/// Plan every stage of `config` against the columns of `df`.
pub fn plan_stages(config: &PipelineConfig, df: &DataFrame) -> Vec<StagePlan> {
    let mut available: HashSet<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut plans = Vec::new();

    if config.cleaning.impute_numeric_median {
        let columns = df
            .get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()) && col.null_count() > 0)
            .map(|col| col.name().to_string())
            .collect();
        plans.push(StagePlan {
            stage: PreprocessingStage::Cleaning,
            operation: "impute median".to_string(),
            columns,
            absent: Vec::new(),
        });
    }

    plans.push(split(
        PreprocessingStage::OutlierFiltering,
        "filter IQR outliers",
        &config.outliers.columns,
        &available,
    ));

    if let Some(ratio) = &config.features.ratio {
        let inputs = [ratio.numerator.clone(), ratio.denominator.clone()];
        let plan = split(
            PreprocessingStage::FeatureEngineering,
            &format!("derive '{}'", ratio.output),
            &inputs,
            &available,
        );
        if plan.absent.is_empty() {
            available.insert(ratio.output.clone());
        }
        plans.push(plan);
    }

    if let Some(binning) = &config.features.binning {
        let plan = split(
            PreprocessingStage::FeatureEngineering,
            &format!("bin into '{}'", binning.output),
            std::slice::from_ref(&binning.source),
            &available,
        );
        if plan.absent.is_empty() {
            available.insert(binning.output.clone());
        }
        plans.push(plan);
    }

    plans.push(split(
        PreprocessingStage::Scaling,
        "standardize",
        &config.scaling.standardize,
        &available,
    ));
    plans.push(split(
        PreprocessingStage::Scaling,
        "normalize",
        &config.scaling.normalize,
        &available,
    ));
    plans.push(split(
        PreprocessingStage::Encoding,
        "one-hot encode",
        &config.encoding.columns,
        &available,
    ));

    plans
}

fn split(
    stage: PreprocessingStage,
    operation: &str,
    columns: &[String],
    available: &HashSet<String>,
) -> StagePlan {
    let (present, absent) = columns
        .iter()
        .cloned()
        .partition(|name| available.contains(name));
    StagePlan {
        stage,
        operation: operation.to_string(),
        columns: present,
        absent,
    }
}
