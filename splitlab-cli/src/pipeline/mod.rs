//! Analysis Pipeline
//!
//! Pure stages connected by immutable record collections.
//!
//! ## Pipeline Overview
//!
//! ```text
//! OrderSource (orders, line items, assignment history)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  outcomes   │  Timeline, assignment, window, aggregation
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Guardrails + variant metrics
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  inference  │  Significance, CUPED, bootstrap, power
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! Guardrail failures never stop the pipeline; they mark the report as not
//! trustworthy. Configuration and data-integrity errors do stop it.

mod formatting;
mod inference;
mod outcomes;
mod report;

pub use formatting::format_human_output;
pub use inference::{
    collect_metrics, run_bootstrap, run_cuped, run_power, run_significance, MetricSamples,
    CUPED_METRIC,
};
pub use outcomes::{compute_outcomes, OutcomeSet};
pub use report::{build_report, guardrail_config};

use splitlab_core::{AnalysisConfig, AnalysisError, OrderSource};
use splitlab_report::Report;

/// Run a complete analysis over a source
pub fn run_analysis(source: &dyn OrderSource, config: &AnalysisConfig) -> Result<Report, AnalysisError> {
    config.validate()?;
    let set = compute_outcomes(source, config)?;
    Ok(build_report(&set.history, &set.outcomes, config))
}
