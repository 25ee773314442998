#![warn(missing_docs)]
//! Splitlab Report - Analysis Output
//!
//! Structured records handed to downstream consumers, in three formats:
//! - JSON (machine-readable, full structure)
//! - CSV (one flat long-format table)
//! - Human-readable terminal output (rendered by the CLI)

mod csv;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use json::{generate_json_report, parse_json_report};
pub use report::{
    BootstrapInterval, BootstrapScope, CupedSummary, Report, ReportMeta, ReportSummary,
    SCHEMA_VERSION,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Flat CSV table
    Csv,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
