//! One-hot encoding of categorical columns.

use crate::config::{CategoryOrder, EncodingConfig};
use crate::error::{PreprocessingError, Result};
use crate::types::EncodedColumn;
use crate::utils::resolve_columns;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// What the encoder did to the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodingOutcome {
    pub encoded: Vec<EncodedColumn>,
    /// Configured columns absent from the table.
    pub absent: Vec<String>,
}

/// Replaces categorical columns with 0/1 indicator columns.
pub struct OneHotEncoder;

impl OneHotEncoder {
    /// One-hot encode the configured columns.
    ///
    /// `declared_levels` gives the category order of columns that carry one
    /// (such as a binned column); other columns are ordered per
    /// `config.category_order`. With `drop_first`, the first category gets no
    /// indicator. Missing values get zeros in every indicator. Originals are
    /// removed and indicators are appended after the remaining columns.
    pub fn encode(
        df: &mut DataFrame,
        config: &EncodingConfig,
        declared_levels: &HashMap<String, Vec<String>>,
        processing_steps: &mut Vec<String>,
    ) -> Result<EncodingOutcome> {
        let resolved = resolve_columns(df, &config.columns, config.missing_columns, "encoding")?;
        let mut outcome = EncodingOutcome {
            absent: resolved.absent,
            ..EncodingOutcome::default()
        };

        let mut indicator_columns: Vec<Series> = Vec::new();
        for col_name in &resolved.present {
            let values = Self::string_values(df, col_name)?;
            let categories = Self::ordered_categories(
                &values,
                declared_levels.get(col_name),
                config.category_order,
            );

            let (dropped, kept) = match categories.split_first() {
                Some((first, rest)) if config.drop_first => (Some(first.clone()), rest),
                _ => (None, categories.as_slice()),
            };

            let mut indicators = Vec::with_capacity(kept.len());
            for category in kept {
                let name = format!("{}_{}", col_name, category);
                let flags: Vec<i32> = values
                    .iter()
                    .map(|v| i32::from(v.as_deref() == Some(category.as_str())))
                    .collect();
                indicator_columns.push(Series::new(name.as_str().into(), flags));
                indicators.push(name);
            }

            debug!(
                "Encoded '{}': categories {:?}, dropped {:?}",
                col_name, categories, dropped
            );
            processing_steps.push(format!(
                "One-hot encoded '{}' into {} indicator columns",
                col_name,
                indicators.len()
            ));
            outcome.encoded.push(EncodedColumn {
                source: col_name.clone(),
                categories,
                dropped,
                indicators,
            });
        }

        for col_name in &resolved.present {
            *df = df.drop(col_name)?;
        }

        let mut taken: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        for series in indicator_columns {
            let name = series.name().to_string();
            if !taken.insert(name.clone()) {
                let source = outcome
                    .encoded
                    .iter()
                    .find(|e| e.indicators.contains(&name))
                    .map(|e| e.source.clone())
                    .unwrap_or_default();
                return Err(PreprocessingError::data_error(
                    source,
                    format!("indicator column '{}' already exists", name),
                ));
            }
            df.with_column(series)?;
        }

        Ok(outcome)
    }

    /// Read a column as strings, casting non-string columns.
    fn string_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<String>>> {
        let column = df.column(col_name)?.cast(&DataType::String)?;
        let values = column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(values)
    }

    /// Distinct observed categories in encoding order.
    fn ordered_categories(
        values: &[Option<String>],
        declared: Option<&Vec<String>>,
        order: CategoryOrder,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut first_seen: Vec<String> = values
            .iter()
            .flatten()
            .filter(|v| seen.insert(v.as_str()))
            .cloned()
            .collect();

        match declared {
            Some(levels) => {
                let mut ordered: Vec<String> = levels
                    .iter()
                    .filter(|level| seen.contains(level.as_str()))
                    .cloned()
                    .collect();
                // Undeclared values follow the declared ones, sorted
                let mut extra: Vec<String> = first_seen
                    .into_iter()
                    .filter(|v| !levels.contains(v))
                    .collect();
                extra.sort();
                ordered.extend(extra);
                ordered
            }
            None => {
                if order == CategoryOrder::Lexical {
                    first_seen.sort();
                }
                first_seen
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encoding(columns: &[&str]) -> EncodingConfig {
        EncodingConfig {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            ..EncodingConfig::default()
        }
    }

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    fn i32_values(df: &DataFrame, name: &str) -> Vec<i32> {
        df.column(name)
            .unwrap()
            .i32()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_binary_column_single_indicator() {
        let mut df = df![
            "Private" => ["Yes", "No", "Yes"],
            "Apps" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let outcome =
            OneHotEncoder::encode(&mut df, &encoding(&["Private"]), &HashMap::new(), &mut steps)
                .unwrap();

        assert_eq!(column_names(&df), ["Apps", "Private_Yes"]);
        assert_eq!(i32_values(&df, "Private_Yes"), vec![1, 0, 1]);
        assert_eq!(outcome.encoded[0].dropped.as_deref(), Some("No"));
        assert_eq!(outcome.encoded[0].indicators, ["Private_Yes"]);
    }

    #[test]
    fn test_declared_order_picks_reference_level() {
        let mut df = df!["cat" => ["High", "Low", "Medium", "Low"]].unwrap();
        let declared = HashMap::from([(
            "cat".to_string(),
            vec!["Low".to_string(), "Medium".to_string(), "High".to_string()],
        )]);

        let outcome =
            OneHotEncoder::encode(&mut df, &encoding(&["cat"]), &declared, &mut vec![]).unwrap();

        assert_eq!(outcome.encoded[0].categories, ["Low", "Medium", "High"]);
        assert_eq!(outcome.encoded[0].dropped.as_deref(), Some("Low"));
        assert_eq!(column_names(&df), ["cat_Medium", "cat_High"]);
        assert_eq!(i32_values(&df, "cat_High"), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_first_seen_order() {
        let mut df = df!["c" => ["b", "a", "c"]].unwrap();
        let config = EncodingConfig {
            category_order: CategoryOrder::FirstSeen,
            ..encoding(&["c"])
        };

        let outcome = OneHotEncoder::encode(&mut df, &config, &HashMap::new(), &mut vec![]).unwrap();

        assert_eq!(outcome.encoded[0].dropped.as_deref(), Some("b"));
        assert_eq!(column_names(&df), ["c_a", "c_c"]);
    }

    #[test]
    fn test_keep_all_levels_and_missing_values() {
        let mut df = df!["c" => [Some("x"), None, Some("y")]].unwrap();
        let config = EncodingConfig {
            drop_first: false,
            ..encoding(&["c"])
        };

        OneHotEncoder::encode(&mut df, &config, &HashMap::new(), &mut vec![]).unwrap();

        assert_eq!(i32_values(&df, "c_x"), vec![1, 0, 0]);
        assert_eq!(i32_values(&df, "c_y"), vec![0, 0, 1]);
    }

    #[test]
    fn test_indicators_grouped_in_configured_order() {
        let mut df = df![
            "b" => ["p", "q"],
            "keep" => [1i64, 2],
            "a" => ["m", "n"],
        ]
        .unwrap();

        OneHotEncoder::encode(&mut df, &encoding(&["a", "b"]), &HashMap::new(), &mut vec![])
            .unwrap();

        assert_eq!(column_names(&df), ["keep", "a_n", "b_q"]);
    }

    #[test]
    fn test_indicator_name_collision_is_data_error() {
        let mut df = df![
            "Private" => ["Yes", "No"],
            "Private_Yes" => [0i64, 1],
        ]
        .unwrap();

        let err =
            OneHotEncoder::encode(&mut df, &encoding(&["Private"]), &HashMap::new(), &mut vec![])
                .unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");
    }

    #[test]
    fn test_absent_column_skipped() {
        let mut df = df!["x" => [1i64]].unwrap();

        let outcome =
            OneHotEncoder::encode(&mut df, &encoding(&["Private"]), &HashMap::new(), &mut vec![])
                .unwrap();

        assert_eq!(outcome.absent, ["Private"]);
        assert_eq!(column_names(&df), ["x"]);
    }
}
