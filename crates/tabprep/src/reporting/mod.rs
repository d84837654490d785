//! Report generation module.
//!
//! A [`RunReport`] bundles the run summary, headline numbers and the
//! effective configuration. It backs both the `--json` stdout output and the
//! `--emit-report` file.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabprep::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report(input, Some(output), &result, pipeline.config());
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("preprocessing"));
//! generator.write_report_to_file(&report, "College_preprocessed")?;
//! ```

mod generator;

pub use generator::{ReportGenerator, RunOverview, RunReport};
