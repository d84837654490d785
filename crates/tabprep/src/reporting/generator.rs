use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::types::{PipelineResult, PreprocessingSummary};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Report of one pipeline run, for JSON output (`--json`) and report files
/// (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,

    pub overview: RunOverview,

    /// Everything the pipeline did, stage by stage
    pub summary: PreprocessingSummary,

    /// Effective configuration of the run
    pub config: PipelineConfig,
}

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOverview {
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
    pub rows_removed_percent: f32,
    pub columns_before: usize,
    pub columns_after: usize,
    pub duplicates_removed: usize,
    pub outlier_rows_removed: usize,
    pub values_imputed: usize,
    pub warnings: usize,
}

impl From<&PreprocessingSummary> for RunOverview {
    fn from(summary: &PreprocessingSummary) -> Self {
        Self {
            duration_ms: summary.duration_ms,
            rows_before: summary.rows_before,
            rows_after: summary.rows_after,
            rows_removed: summary.rows_removed(),
            rows_removed_percent: summary.rows_removed_percentage(),
            columns_before: summary.columns_before,
            columns_after: summary.columns_after,
            duplicates_removed: summary.duplicates_removed,
            outlier_rows_removed: summary.outlier_rows_removed,
            values_imputed: summary.imputations.iter().map(|i| i.filled_count).sum(),
            warnings: summary.warnings.len(),
        }
    }
}

// ============================================================================
// Report Generator
// ============================================================================

/// Builds run reports and writes them next to the output file.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Build a report from a finished run.
    pub fn build_report(
        input_file: &Path,
        output_file: Option<&Path>,
        result: &PipelineResult,
        config: &PipelineConfig,
    ) -> RunReport {
        RunReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.display().to_string(),
            output_file: output_file.map(|p| p.display().to_string()),
            overview: RunOverview::from(&result.summary),
            summary: result.summary.clone(),
            config: config.clone(),
        }
    }

    /// Write `report` as pretty JSON to `<output_dir>/<base_name>_report.json`.
    pub fn write_report_to_file(&self, report: &RunReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).context(format!(
            "Failed to create report directory '{}'",
            self.output_dir.display()
        ))?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)
            .context(format!("Failed to create '{}'", report_path.display()))?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
