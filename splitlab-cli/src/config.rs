//! Configuration loading from splitlab.toml
//!
//! An analysis can be configured in a `splitlab.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.
//! Every key is optional; missing keys take the defaults of [`AnalysisConfig`].

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use splitlab_core::{
    AnalysisConfig, AssignmentConfig, ConfigError, InferenceConfig, OutcomeConfig,
    ResamplingConfig, DEFAULT_RETENTION_CHECKPOINTS, DEFAULT_WINDOW_DAYS,
};
use std::path::{Path, PathBuf};

/// Name of the discovered configuration file
pub const CONFIG_FILE_NAME: &str = "splitlab.toml";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Splitlab configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SplitConfig {
    /// Assignment configuration
    #[serde(default)]
    pub experiment: ExperimentSection,
    /// Outcome window configuration
    #[serde(default)]
    pub window: WindowSection,
    /// Significance and power configuration
    #[serde(default)]
    pub inference: InferenceSection,
    /// Bootstrap configuration
    #[serde(default)]
    pub bootstrap: BootstrapSection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputSection,
}

/// `[experiment]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSection {
    /// Salt mixed into the assignment hash
    #[serde(default = "default_salt")]
    pub salt: String,
    /// Share of users assigned to variant B
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    /// Assignment date, `YYYY-MM-DD`
    #[serde(default = "default_assignment_date")]
    pub assignment_date: String,
    /// Date every pseudo-timeline is anchored to, `YYYY-MM-DD`
    #[serde(default = "default_base_date")]
    pub base_date: String,
}

impl Default for ExperimentSection {
    fn default() -> Self {
        Self {
            salt: default_salt(),
            split_ratio: default_split_ratio(),
            assignment_date: default_assignment_date(),
            base_date: default_base_date(),
        }
    }
}

fn default_salt() -> String {
    AssignmentConfig::default().salt
}
fn default_split_ratio() -> f64 {
    0.5
}
fn default_assignment_date() -> String {
    date_string(AssignmentConfig::default().assignment_date)
}
fn default_base_date() -> String {
    date_string(AnalysisConfig::default().base_date)
}
fn date_string(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `[window]` section.
///
/// Day counts are signed so a negative value is reported as a configuration
/// error rather than a TOML type error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSection {
    /// Outcome window length in days
    #[serde(default = "default_window_days")]
    pub days: i64,
    /// Retention checkpoints in days after assignment
    #[serde(default = "default_checkpoints")]
    pub retention_checkpoints: Vec<i64>,
    /// Lookback before assignment for the CUPED covariate
    #[serde(default = "default_window_days")]
    pub pre_period_days: i64,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            days: default_window_days(),
            retention_checkpoints: default_checkpoints(),
            pre_period_days: default_window_days(),
        }
    }
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS as i64
}
fn default_checkpoints() -> Vec<i64> {
    DEFAULT_RETENTION_CHECKPOINTS.iter().map(|&d| d as i64).collect()
}

/// `[inference]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceSection {
    /// Significance level
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Target power
    #[serde(default = "default_power")]
    pub power: f64,
    /// Maximum |z| of the sample ratio check
    #[serde(default = "default_srm_threshold")]
    pub srm_threshold: f64,
    /// Report p-values next to the test statistics
    #[serde(default = "default_true")]
    pub p_values: bool,
    /// Relative effect the sample-size calculation is sized for
    #[serde(default = "default_target_mde")]
    pub target_relative_mde: f64,
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            power: default_power(),
            srm_threshold: default_srm_threshold(),
            p_values: true,
            target_relative_mde: default_target_mde(),
        }
    }
}

fn default_alpha() -> f64 {
    0.05
}
fn default_power() -> f64 {
    0.8
}
fn default_srm_threshold() -> f64 {
    3.0
}
fn default_true() -> bool {
    true
}
fn default_target_mde() -> f64 {
    0.02
}

/// `[bootstrap]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSection {
    /// Compute bootstrap intervals at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of resamples
    #[serde(default = "default_replicates")]
    pub replicates: usize,
    /// Base seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for BootstrapSection {
    fn default() -> Self {
        Self {
            enabled: true,
            replicates: default_replicates(),
            seed: default_seed(),
        }
    }
}

fn default_replicates() -> usize {
    ResamplingConfig::default().replicates
}
fn default_seed() -> u64 {
    ResamplingConfig::default().seed
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl SplitConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find `splitlab.toml` by walking up from the current directory
    pub fn discover_path() -> Option<PathBuf> {
        Self::discover_path_from(&std::env::current_dir().ok()?)
    }

    /// Find `splitlab.toml` by walking up from `start`
    pub fn discover_path_from(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Discover and load configuration by walking up from the current directory.
    ///
    /// `Ok(None)` when no file exists; a file that exists but does not parse
    /// is an error.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        let start = std::env::current_dir()?;
        Self::discover_from(&start)
    }

    /// Discover and load configuration by walking up from `start`
    pub fn discover_from(start: &Path) -> anyhow::Result<Option<Self>> {
        match Self::discover_path_from(start) {
            Some(path) => Self::load(&path)
                .with_context(|| format!("Failed to load {}", path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    /// Convert into a validated [`AnalysisConfig`]
    pub fn to_analysis_config(&self) -> Result<AnalysisConfig, ConfigError> {
        let window_days = non_negative_days(self.window.days, ConfigError::InvalidWindow)?;
        let pre_period_days =
            non_negative_days(self.window.pre_period_days, ConfigError::InvalidPrePeriod)?;

        let mut retention_checkpoints = Vec::with_capacity(self.window.retention_checkpoints.len());
        for &day in &self.window.retention_checkpoints {
            let day = u32::try_from(day)
                .map_err(|_| ConfigError::CheckpointOutsideWindow { day, window_days })?;
            retention_checkpoints.push(day);
        }

        let config = AnalysisConfig {
            base_date: parse_date(&self.experiment.base_date)?,
            assignment: AssignmentConfig {
                salt: self.experiment.salt.clone(),
                split_ratio: self.experiment.split_ratio,
                assignment_date: parse_date(&self.experiment.assignment_date)?,
            },
            outcome: OutcomeConfig {
                window_days,
                retention_checkpoints,
                pre_period_days,
            },
            inference: InferenceConfig {
                alpha: self.inference.alpha,
                power: self.inference.power,
                srm_threshold: self.inference.srm_threshold,
                p_values: self.inference.p_values,
                target_relative_mde: self.inference.target_relative_mde,
            },
            bootstrap: ResamplingConfig {
                enabled: self.bootstrap.enabled,
                replicates: self.bootstrap.replicates,
                seed: self.bootstrap.seed,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Splitlab Configuration

[experiment]
# Salt mixed into the assignment hash; changing it reshuffles every user
salt = "splitlab"
# Share of users assigned to variant B
split_ratio = 0.5
# Date every user is assigned on (YYYY-MM-DD); the pre-period before it
# feeds the CUPED covariate
assignment_date = "2017-01-29"
# Date the first order of every user is placed on
base_date = "2017-01-01"

[window]
# Outcome window length in days, half-open [assigned, assigned + days)
days = 28
# Retention checkpoints in days after assignment (each <= days)
retention_checkpoints = [14, 28]
# Lookback before assignment for the CUPED covariate
pre_period_days = 28

[inference]
# Significance level
alpha = 0.05
# Target power for MDE and sample-size analysis
power = 0.8
# Sample ratio mismatch fails when |z| exceeds this
srm_threshold = 3.0
# Report p-values next to test statistics
p_values = true
# Relative effect the required sample size is computed for
target_relative_mde = 0.02

[bootstrap]
# Compute bootstrap confidence intervals
enabled = true
# Number of resamples
replicates = 2000
# Base seed; results are reproducible for a fixed seed
seed = 42

[output]
# Default output format: human, json, csv
format = "human"
"#
        .to_string()
    }
}

fn non_negative_days(days: i64, error: fn(i64) -> ConfigError) -> Result<u32, ConfigError> {
    u32::try_from(days).map_err(|_| error(days))
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| ConfigError::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
