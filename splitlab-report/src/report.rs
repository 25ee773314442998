//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitlab_core::AnalysisConfig;
use splitlab_logic::{GuardrailReport, VariantMetrics};
use splitlab_stats::{PowerResult, SignificanceResult};

/// Current report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub guardrails: GuardrailReport,
    pub variants: Vec<VariantMetrics>,
    pub significance: Vec<SignificanceResult>,
    pub cuped: Option<CupedSummary>,
    pub bootstrap: Vec<BootstrapInterval>,
    pub power: Vec<PowerResult>,
    pub summary: ReportSummary,
}

impl Report {
    /// Significance result of a metric by name
    pub fn significance_for(&self, metric_name: &str) -> Option<&SignificanceResult> {
        self.significance
            .iter()
            .find(|r| r.metric_name == metric_name)
    }

    /// Bootstrap interval of a metric for one scope
    pub fn bootstrap_for(&self, metric: &str, scope: BootstrapScope) -> Option<&BootstrapInterval> {
        self.bootstrap
            .iter()
            .find(|b| b.metric == metric && b.scope == scope)
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub config: AnalysisConfig,
}

/// CUPED adjustment of the volume metric and its re-run test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CupedSummary {
    pub metric: String,
    pub covariate: String,
    pub theta: f64,
    pub covariate_mean: f64,
    /// Mean of the per-variant sample variances before adjustment
    pub variance_raw: Option<f64>,
    pub variance_adjusted: Option<f64>,
    /// 1 - adjusted / raw
    pub variance_reduction: Option<f64>,
    pub result: SignificanceResult,
}

/// What a bootstrap interval estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapScope {
    /// Statistic of variant A
    VariantA,
    /// Statistic of variant B
    VariantB,
    /// Statistic of B minus statistic of A
    Difference,
}

impl BootstrapScope {
    /// Label used in CSV and terminal output
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapScope::VariantA => "A",
            BootstrapScope::VariantB => "B",
            BootstrapScope::Difference => "B-A",
        }
    }
}

/// Percentile bootstrap interval of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    pub metric: String,
    pub scope: BootstrapScope,
    pub point_estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
    pub standard_error: f64,
    pub replicates: usize,
    pub seed: u64,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub users: u64,
    /// Every guardrail passed; significance results may be relied on
    pub trustworthy: bool,
    pub guardrail_failures: usize,
    /// Metrics with a significant difference at alpha
    pub significant_metrics: Vec<String>,
    /// One interpretation line per guardrail
    pub interpretations: Vec<String>,
}
