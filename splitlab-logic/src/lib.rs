#![warn(missing_docs)]
//! Splitlab Logic - Guardrails and Variant Metrics
//!
//! Sits between the per-user outcomes and the statistical engine:
//! - Guardrail validation (sample ratio mismatch, contamination, equal exposure)
//! - Per-variant grouping into counts, rates, means and variances

mod guardrails;
mod metrics;

pub use guardrails::{
    contaminated_users, sample_ratio_mismatch, validate_guardrails, GuardrailCheck,
    GuardrailConfig, GuardrailReport, GuardrailStatus, SrmStatistics,
};
pub use metrics::{
    conversion_value, pre_volume_value, retention_value, summarize_variants, variant_values,
    volume_value, RetentionRate, VariantMetrics,
};
