//! Feature engineering: derived ratio columns and equal-frequency binning.

use crate::config::{BinningConfig, ConfigValidationError, MissingColumnPolicy, RatioFeature};
use crate::error::Result;
use crate::types::BinningRecord;
use crate::utils::{numeric_values, quantile_sorted, resolve_columns, sorted_finite};
use polars::prelude::*;
use tracing::{debug, warn};

/// Builds derived columns on the current table.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Add `output = numerator / denominator * scale` as a Float64 column.
    ///
    /// A missing numerator or denominator gives a missing cell and a zero
    /// denominator gives `NaN`. Returns the output column name, or `None`
    /// when an input column is absent and skipped.
    pub fn add_ratio_feature(
        df: &mut DataFrame,
        feature: &RatioFeature,
        policy: MissingColumnPolicy,
        processing_steps: &mut Vec<String>,
    ) -> Result<Option<String>> {
        let inputs = [feature.numerator.clone(), feature.denominator.clone()];
        let resolved = resolve_columns(df, &inputs, policy, "features")?;
        if !resolved.absent.is_empty() {
            debug!(
                "Ratio '{}' skipped, missing input columns: {:?}",
                feature.output, resolved.absent
            );
            return Ok(None);
        }

        let numerator = numeric_values(df, &feature.numerator)?;
        let denominator = numeric_values(df, &feature.denominator)?;

        let ratio: Vec<Option<f64>> = numerator
            .iter()
            .zip(&denominator)
            .map(|(n, d)| match (n, d) {
                (Some(_), Some(d)) if *d == 0.0 => Some(f64::NAN),
                (Some(n), Some(d)) => Some(n / d * feature.scale),
                _ => None,
            })
            .collect();

        df.with_column(Series::new(feature.output.as_str().into(), ratio))?;

        processing_steps.push(format!(
            "Derived '{}' = '{}' / '{}' * {}",
            feature.output, feature.numerator, feature.denominator, feature.scale
        ));
        Ok(Some(feature.output.clone()))
    }

    /// Cut a numeric column into equal-frequency bins labelled with
    /// `config.labels`, added as a string column.
    ///
    /// Edges are the `i/N` quantiles of the non-missing values, intervals are
    /// right-closed and the lowest edge is included. When ties collapse the
    /// edges, rows are assigned by stable rank instead. Missing or
    /// non-finite source values get a missing label.
    ///
    /// Fails with `InvalidConfig` when fewer than two labels are configured.
    pub fn add_quantile_bins(
        df: &mut DataFrame,
        config: &BinningConfig,
        policy: MissingColumnPolicy,
        processing_steps: &mut Vec<String>,
    ) -> Result<Option<BinningRecord>> {
        if config.bins() < 2 {
            return Err(ConfigValidationError::InvalidBinCount(config.bins()).into());
        }

        let resolved = resolve_columns(df, std::slice::from_ref(&config.source), policy, "features")?;
        if resolved.present.is_empty() {
            return Ok(None);
        }

        let values = numeric_values(df, &config.source)?;
        let sorted = sorted_finite(&values);
        if sorted.is_empty() {
            warn!("No values in '{}' to bin, skipping", config.source);
            return Ok(None);
        }

        let n_bins = config.bins();
        let edges: Vec<f64> = (0..=n_bins)
            .filter_map(|i| quantile_sorted(&sorted, i as f64 / n_bins as f64))
            .collect();
        let distinct_edges = edges.windows(2).all(|w| w[0] < w[1]);

        let assignments = if distinct_edges {
            assign_by_edges(&values, &edges)
        } else {
            debug!(
                "Quantile edges of '{}' collapse on ties, assigning bins by rank",
                config.source
            );
            assign_by_rank(&values, n_bins)
        };

        let mut counts = vec![0usize; n_bins];
        for bin in assignments.iter().flatten() {
            counts[*bin] += 1;
        }

        let labels: Vec<Option<&str>> = assignments
            .iter()
            .map(|bin| bin.map(|b| config.labels[b].as_str()))
            .collect();
        df.with_column(Series::new(config.output.as_str().into(), labels))?;

        let record = BinningRecord {
            source: config.source.clone(),
            output: config.output.clone(),
            edges,
            counts: config.labels.iter().cloned().zip(counts).collect(),
            rank_fallback: !distinct_edges,
        };

        processing_steps.push(format!(
            "Binned '{}' into '{}' ({} equal-frequency bins{})",
            config.source,
            config.output,
            n_bins,
            if record.rank_fallback { ", by rank" } else { "" }
        ));
        Ok(Some(record))
    }
}

fn assign_by_edges(values: &[Option<f64>], edges: &[f64]) -> Vec<Option<usize>> {
    let last = edges.len().saturating_sub(2);
    values
        .iter()
        .map(|v| {
            let v = v.filter(|v| v.is_finite())?;
            let bin = edges[1..]
                .iter()
                .position(|edge| v <= *edge)
                .unwrap_or(last);
            Some(bin)
        })
        .collect()
}

fn assign_by_rank(values: &[Option<f64>], n_bins: usize) -> Vec<Option<usize>> {
    let mut ranked: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (i, v)))
        .collect();
    // Stable sort keeps row order among ties
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = ranked.len();
    let mut assignments = vec![None; values.len()];
    for (rank, (row, _)) in ranked.into_iter().enumerate() {
        assignments[row] = Some(rank * n_bins / n);
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn binning(source: &str, labels: &[&str]) -> BinningConfig {
        BinningConfig {
            source: source.to_string(),
            output: "bin".to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn labels_of(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_ratio_feature_value() {
        let mut df = df![
            "Accept" => [500i64],
            "Apps" => [1000i64],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let output = FeatureBuilder::add_ratio_feature(
            &mut df,
            &RatioFeature::default(),
            MissingColumnPolicy::Skip,
            &mut steps,
        )
        .unwrap();

        assert_eq!(output.as_deref(), Some("Accept_Rate"));
        let rate = df.column("Accept_Rate").unwrap().f64().unwrap().get(0);
        assert_eq!(rate, Some(50.0));
        assert!(steps[0].contains("Accept_Rate"));
    }

    #[test]
    fn test_ratio_zero_and_missing_denominator() {
        let mut df = df![
            "Accept" => [Some(5.0), Some(5.0), None],
            "Apps" => [Some(0.0), None, Some(10.0)],
        ]
        .unwrap();

        FeatureBuilder::add_ratio_feature(
            &mut df,
            &RatioFeature::default(),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap();

        let rate = df.column("Accept_Rate").unwrap().f64().unwrap();
        assert!(rate.get(0).unwrap().is_nan());
        assert_eq!(rate.get(1), None);
        assert_eq!(rate.get(2), None);
    }

    #[test]
    fn test_ratio_skipped_when_input_absent() {
        let mut df = df!["Accept" => [1.0, 2.0]].unwrap();

        let output = FeatureBuilder::add_ratio_feature(
            &mut df,
            &RatioFeature::default(),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap();

        assert!(output.is_none());
        assert!(df.column("Accept_Rate").is_err());
    }

    #[test]
    fn test_ratio_required_input_absent() {
        let mut df = df!["Accept" => [1.0]].unwrap();

        let err = FeatureBuilder::add_ratio_feature(
            &mut df,
            &RatioFeature::default(),
            MissingColumnPolicy::Require,
            &mut vec![],
        )
        .unwrap_err();

        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_quantile_bins_equal_frequency() {
        let values: Vec<f64> = (1..=300).map(|v| v as f64).collect();
        let mut df = df!["rate" => values].unwrap();
        let mut steps = Vec::new();

        let record = FeatureBuilder::add_quantile_bins(
            &mut df,
            &binning("rate", &["Low", "Medium", "High"]),
            MissingColumnPolicy::Skip,
            &mut steps,
        )
        .unwrap()
        .unwrap();

        assert!(!record.rank_fallback);
        assert_eq!(record.edges.len(), 4);
        for (_, count) in &record.counts {
            assert!((99..=101).contains(count), "unbalanced bin: {}", count);
        }

        let labels = labels_of(&df, "bin");
        assert_eq!(labels[0].as_deref(), Some("Low"));
        assert_eq!(labels[150].as_deref(), Some("Medium"));
        assert_eq!(labels[299].as_deref(), Some("High"));
    }

    #[test]
    fn test_quantile_bins_right_closed_lowest_included() {
        // Edges: [1, 2, 3]; 2 belongs to the first bin
        let mut df = df!["v" => [1.0, 2.0, 3.0]].unwrap();

        FeatureBuilder::add_quantile_bins(
            &mut df,
            &binning("v", &["lo", "hi"]),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap();

        assert_eq!(
            labels_of(&df, "bin"),
            vec![Some("lo".to_string()), Some("lo".to_string()), Some("hi".to_string())]
        );
    }

    #[test]
    fn test_quantile_bins_rank_fallback_on_ties() {
        let mut df = df!["v" => [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0]].unwrap();

        let record = FeatureBuilder::add_quantile_bins(
            &mut df,
            &binning("v", &["a", "b", "c"]),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap()
        .unwrap();

        assert!(record.rank_fallback);
        assert_eq!(
            record.counts,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 3),
                ("c".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_quantile_bins_missing_values_get_missing_label() {
        let mut df = df!["v" => [Some(1.0), None, Some(3.0), Some(5.0)]].unwrap();

        FeatureBuilder::add_quantile_bins(
            &mut df,
            &binning("v", &["lo", "hi"]),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap();

        let labels = labels_of(&df, "bin");
        assert_eq!(labels[1], None);
        assert_eq!(df.column("bin").unwrap().null_count(), 1);
    }

    #[test]
    fn test_quantile_bins_absent_source_skipped() {
        let mut df = df!["other" => [1.0]].unwrap();

        let record = FeatureBuilder::add_quantile_bins(
            &mut df,
            &binning("v", &["lo", "hi"]),
            MissingColumnPolicy::Skip,
            &mut vec![],
        )
        .unwrap();

        assert!(record.is_none());
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_quantile_bins_too_few_labels_rejected() {
        for labels in [&[][..], &["only"][..]] {
            let mut df = df!["v" => [1.0, 2.0, 3.0]].unwrap();

            let err = FeatureBuilder::add_quantile_bins(
                &mut df,
                &binning("v", labels),
                MissingColumnPolicy::Skip,
                &mut vec![],
            )
            .unwrap_err();

            assert_eq!(err.error_code(), "INVALID_CONFIG");
            assert_eq!(df.width(), 1);
        }
    }
}
