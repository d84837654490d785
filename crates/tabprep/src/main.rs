//! CLI entry point for the tabular preprocessing pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tabprep::{Pipeline, PipelineConfig, PipelineResult, ReportGenerator, RunReport, load_csv};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Single-pass tabular preprocessing pipeline",
    long_about = "Cleans, filters, derives, scales and encodes a comma-delimited table.\n\n\
                  The default configuration is the College preset. Use --config to run\n\
                  against another schema.\n\n\
                  EXAMPLES:\n  \
                  # Default College run\n  \
                  tabprep\n\n  \
                  # Custom input, output and configuration\n  \
                  tabprep -i data.csv -o out/data_clean.csv -c pipeline.json\n\n  \
                  # Preview which columns each stage acts on\n  \
                  tabprep -i data.csv --dry-run"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long, default_value = "namadataset_raw/College.csv")]
    input: PathBuf,

    /// Path of the processed CSV file
    #[arg(short, long, default_value = "preprocessing/College_preprocessed.csv")]
    output: PathBuf,

    /// JSON pipeline configuration (missing fields take the College defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a JSON report next to the output file
    ///
    /// The report will be saved as <output_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Preview which columns each stage would act on without processing
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let pipeline = build_pipeline(&args, config)?;

    if args.dry_run {
        let data = load_csv(&args.input)?;
        run_dry_run(&args, &pipeline, &data);
        return Ok(());
    }

    run_pipeline(&pipeline, &args)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Run dry-run mode - show what would happen without processing.
///
/// Uses `println!` since this output is the point of `--dry-run` and must
/// not depend on the log level.
fn run_dry_run(args: &Args, pipeline: &Pipeline, data: &DataFrame) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of preprocessing actions");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input.display());
    println!("  Rows: {}", data.height());
    println!("  Columns: {}", data.width());
    println!();

    println!("STAGES");
    println!("{}", "-".repeat(40));
    println!("{:<22} {:<24} {}", "Stage", "Operation", "Columns");
    println!("{}", "-".repeat(70));
    for plan in pipeline.plan(data) {
        let columns = if plan.columns.is_empty() {
            "(none)".to_string()
        } else {
            plan.columns.join(", ")
        };
        println!(
            "{:<22} {:<24} {}",
            plan.stage.display_name(),
            truncate_str(&plan.operation, 23),
            columns
        );
        if !plan.absent.is_empty() {
            println!("{:<22} {:<24} absent: {}", "", "", plan.absent.join(", "));
        }
    }
    println!();

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    println!("  - {}", args.output.display());
    if args.emit_report {
        println!("  - {}", report_path(&args.output).display());
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this preprocessing, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Run pipeline and print results
fn run_pipeline(pipeline: &Pipeline, args: &Args) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting preprocessing pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.run(&args.input, &args.output) {
        Ok(result) => handle_pipeline_output(pipeline, &result, args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed [{}]: {}", e.error_code(), e))
        }
    }
}

/// Handle pipeline output based on CLI flags.
///
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report next to the output file
fn handle_pipeline_output(pipeline: &Pipeline, result: &PipelineResult, args: &Args) -> Result<()> {
    let report =
        ReportGenerator::build_report(&args.input, Some(&args.output), result, pipeline.config());

    if args.emit_report {
        let generator = ReportGenerator::new(output_dir(&args.output));
        let report_path = generator.write_report_to_file(&report, &output_stem(&args.output))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    Ok(())
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Extract the file stem (name without extension) from a path.
fn output_stem(output: &Path) -> String {
    output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

fn report_path(output: &Path) -> PathBuf {
    output_dir(output).join(format!("{}_report.json", output_stem(output)))
}

/// Print a human-readable summary of the preprocessing results.
fn print_human_readable_summary(report: &RunReport) {
    let overview = &report.overview;
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, overview.rows_before, overview.columns_before
    );
    if let Some(output_file) = &report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, overview.rows_after, overview.columns_after
        );
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", overview.duration_ms);
    println!(
        "  Rows: {} -> {} ({} duplicates, {} outliers removed)",
        overview.rows_before,
        overview.rows_after,
        overview.duplicates_removed,
        overview.outlier_rows_removed
    );
    println!("  Values imputed: {}", overview.values_imputed);
    if !summary.derived_columns.is_empty() {
        println!("  Derived columns: {}", summary.derived_columns.join(", "));
    }
    println!(
        "  Scaled: {} standardized, {} normalized",
        summary.standardized.len(),
        summary.normalized.len()
    );
    for encoded in &summary.encoded {
        println!(
            "  Encoded '{}' -> {}",
            encoded.source,
            encoded.indicators.join(", ")
        );
    }
    println!();

    if !summary.processing_steps.is_empty() {
        println!("Actions Taken:");
        for step in summary.processing_steps.iter().take(10) {
            println!("  - {}", step);
        }
        if summary.processing_steps.len() > 10 {
            println!(
                "  ... and {} more actions",
                summary.processing_steps.len() - 10
            );
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
