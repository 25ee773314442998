#![warn(missing_docs)]
//! # Splitlab
//!
//! Offline analysis of two-arm controlled experiments over an order log.
//!
//! - **Deterministic Assignment**: salted-hash split, reproducible for a fixed salt
//! - **Outcome Windows**: pseudo-timelines from day deltas, half-open windows, zero-activity users kept
//! - **Guardrails**: sample ratio mismatch, contamination and equal-exposure checks gate trust
//! - **Significance**: two-proportion z-test and Welch's t-test behind one contract
//! - **CUPED**: pre-period covariate adjustment with pooled theta
//! - **Bootstrap**: seeded, parallel percentile intervals per variant and for B - A
//! - **Power**: MDE, required sample size and achieved power
//!
//! ## Quick Start
//!
//! ```ignore
//! use splitlab::prelude::*;
//!
//! let source = InMemorySource::new(orders, line_items);
//! let report = run_analysis(&source, &AnalysisConfig::default())?;
//! if report.summary.trustworthy {
//!     println!("{}", generate_json_report(&report)?);
//! }
//! ```

// Re-export core types
pub use splitlab_core::{
    aggregate_outcomes, assign_users, assign_variant, build_timeline, filter_window,
    verify_outcomes, AnalysisConfig, AnalysisError, Assignment, AssignmentConfig, ConfigError,
    DataIntegrityError, EventRecord, InMemorySource, InferenceConfig, LineItem, OrderRecord,
    OrderSource, OutcomeConfig, ResamplingConfig, SourceError, UserOutcome, Variant,
    WindowedEvent,
};

// Re-export logic types
pub use splitlab_logic::{
    summarize_variants, validate_guardrails, GuardrailConfig, GuardrailReport, VariantMetrics,
};

// Re-export stats
pub use splitlab_stats::{
    bootstrap_difference, bootstrap_distribution, compute_bootstrap, cuped_adjust,
    ArmStatistics, BootstrapConfig, BootstrapResult, CupedAdjustment, PowerCalculator,
    SignificanceResult, SignificanceTest, TwoProportionZTest, WelchTTest,
};

// Re-export report
pub use splitlab_report::{generate_csv_report, generate_json_report, OutputFormat, Report};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        generate_json_report, run_analysis, AnalysisConfig, InMemorySource, LineItem,
        OrderRecord, Report, Variant,
    };
}

/// Run a complete analysis over a source.
pub use splitlab_cli::run_analysis;

/// Run the Splitlab CLI with the process arguments.
pub use splitlab_cli::run;
