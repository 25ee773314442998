//! Report Building
//!
//! Assembles the [`Report`] from the outcome and inference stages and derives
//! the summary a caller reads first: whether the run is trustworthy and which
//! metrics moved.

use super::inference::{collect_metrics, run_bootstrap, run_cuped, run_power, run_significance};
use chrono::Utc;
use splitlab_core::{AnalysisConfig, Assignment, UserOutcome};
use splitlab_logic::{summarize_variants, validate_guardrails, GuardrailConfig, GuardrailReport};
use splitlab_report::{CupedSummary, Report, ReportMeta, ReportSummary, SCHEMA_VERSION};
use splitlab_stats::SignificanceResult;
use tracing::{info, warn};

/// Run every inference stage over finished outcomes and assemble the report
pub fn build_report(
    history: &[Assignment],
    outcomes: &[UserOutcome],
    config: &AnalysisConfig,
) -> Report {
    let guardrails = validate_guardrails(history, outcomes, &guardrail_config(config));
    let variants = summarize_variants(outcomes, &config.outcome.retention_checkpoints);

    let metrics = collect_metrics(outcomes, &variants, &config.outcome.retention_checkpoints);
    let significance = run_significance(&metrics, config);
    let cuped = run_cuped(outcomes, config);
    let bootstrap = run_bootstrap(&metrics, config);
    let power = run_power(&metrics, &significance, config);

    let summary = build_summary(outcomes.len() as u64, &guardrails, &significance, cuped.as_ref());
    if summary.trustworthy {
        info!(
            significant = summary.significant_metrics.len(),
            "Analysis complete"
        );
    } else {
        warn!(
            failures = summary.guardrail_failures,
            "Analysis complete with failing guardrails; results are not trustworthy"
        );
    }

    Report {
        meta: ReportMeta {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            config: config.clone(),
        },
        guardrails,
        variants,
        significance,
        cuped,
        bootstrap,
        power,
        summary,
    }
}

/// Guardrail inputs implied by the analysis configuration
pub fn guardrail_config(config: &AnalysisConfig) -> GuardrailConfig {
    GuardrailConfig {
        expected_split: config.assignment.split_ratio,
        srm_threshold: config.inference.srm_threshold,
        window_days: config.outcome.window_days,
    }
}

fn build_summary(
    users: u64,
    guardrails: &GuardrailReport,
    significance: &[SignificanceResult],
    cuped: Option<&CupedSummary>,
) -> ReportSummary {
    let significant_metrics = significance
        .iter()
        .chain(cuped.map(|c| &c.result))
        .filter(|r| r.significant == Some(true))
        .map(|r| r.metric_name.clone())
        .collect();

    ReportSummary {
        users,
        trustworthy: guardrails.all_pass(),
        guardrail_failures: guardrails.failures().count(),
        significant_metrics,
        interpretations: guardrails.checks.iter().map(|c| c.message.clone()).collect(),
    }
}
