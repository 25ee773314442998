//! Analysis configuration
//!
//! Supplied once per run and validated before any stage executes.

use crate::error::ConfigError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default outcome window length in days
pub const DEFAULT_WINDOW_DAYS: u32 = 28;

/// Default retention checkpoints in days
pub const DEFAULT_RETENTION_CHECKPOINTS: [u32; 2] = [14, 28];

/// Complete configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Date the first event of every user's pseudo-timeline is anchored to
    pub base_date: NaiveDate,
    pub assignment: AssignmentConfig,
    pub outcome: OutcomeConfig,
    pub inference: InferenceConfig,
    pub bootstrap: ResamplingConfig,
}

/// How users are split into variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Salt mixed into the assignment hash
    pub salt: String,
    /// Share of users assigned to variant B
    pub split_ratio: f64,
    pub assignment_date: NaiveDate,
}

/// How per-user outcomes are derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeConfig {
    pub window_days: u32,
    /// Retention checkpoints in days after assignment, each within the window
    pub retention_checkpoints: Vec<u32>,
    /// Lookback before assignment used for the CUPED covariate
    pub pre_period_days: u32,
}

/// Significance, guardrail and power settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub alpha: f64,
    /// Target power (1 - beta)
    pub power: f64,
    /// Maximum |z| of the sample ratio check before it fails
    pub srm_threshold: f64,
    /// Derive p-values from the test statistics
    pub p_values: bool,
    /// Relative effect the sample-size calculation is sized for
    pub target_relative_mde: f64,
}

/// Bootstrap settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResamplingConfig {
    pub enabled: bool,
    pub replicates: usize,
    pub seed: u64,
}

fn default_base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or(NaiveDate::MIN)
}

// one full pre-period after the base date
fn default_assignment_date() -> NaiveDate {
    let base = default_base_date();
    base.checked_add_days(Days::new(u64::from(DEFAULT_WINDOW_DAYS)))
        .unwrap_or(base)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_date: default_base_date(),
            assignment: AssignmentConfig::default(),
            outcome: OutcomeConfig::default(),
            inference: InferenceConfig::default(),
            bootstrap: ResamplingConfig::default(),
        }
    }
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            salt: "splitlab".to_string(),
            split_ratio: 0.5,
            assignment_date: default_assignment_date(),
        }
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            retention_checkpoints: DEFAULT_RETENTION_CHECKPOINTS.to_vec(),
            pre_period_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.8,
            srm_threshold: 3.0,
            p_values: true,
            target_relative_mde: 0.02,
        }
    }
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replicates: 2_000,
            seed: 42,
        }
    }
}

impl AnalysisConfig {
    /// Check every parameter; the first invalid one is reported
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assignment.salt.is_empty() {
            return Err(ConfigError::EmptySalt);
        }
        if !open_unit_interval(self.assignment.split_ratio) {
            return Err(ConfigError::InvalidSplitRatio(self.assignment.split_ratio));
        }
        if self.outcome.window_days == 0 {
            return Err(ConfigError::InvalidWindow(0));
        }
        for &day in &self.outcome.retention_checkpoints {
            if day == 0 || day > self.outcome.window_days {
                return Err(ConfigError::CheckpointOutsideWindow {
                    day: i64::from(day),
                    window_days: self.outcome.window_days,
                });
            }
        }
        if !open_unit_interval(self.inference.alpha) {
            return Err(ConfigError::InvalidAlpha(self.inference.alpha));
        }
        if !open_unit_interval(self.inference.power) {
            return Err(ConfigError::InvalidPower(self.inference.power));
        }
        if !(self.inference.srm_threshold > 0.0) {
            return Err(ConfigError::InvalidSrmThreshold(
                self.inference.srm_threshold,
            ));
        }
        if !(self.inference.target_relative_mde > 0.0) {
            return Err(ConfigError::InvalidTargetMde(
                self.inference.target_relative_mde,
            ));
        }
        if self.bootstrap.enabled && self.bootstrap.replicates == 0 {
            return Err(ConfigError::InvalidReplicates);
        }
        Ok(())
    }

    /// Confidence level implied by alpha
    pub fn confidence_level(&self) -> f64 {
        1.0 - self.inference.alpha
    }
}

// NaN fails both comparisons
fn open_unit_interval(value: f64) -> bool {
    value > 0.0 && value < 1.0
}
