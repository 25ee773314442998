//! Bootstrap Resampling
//!
//! Percentile bootstrap for per-variant statistics and for the difference
//! between two variants.
//!
//! Replicate `i` draws from its own `StdRng` seeded with `seed + i`, so the
//! distribution is identical whether replicates run on the rayon pool or
//! serially, and identical across runs with the same seed.

use crate::percentiles::percentile_of_sorted;
use crate::summary::mean;
use crate::{DEFAULT_BOOTSTRAP_REPLICATES, DEFAULT_CONFIDENCE_LEVEL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default seed when none is configured
pub const DEFAULT_BOOTSTRAP_SEED: u64 = 42;

/// Bootstrap configuration
#[derive(Debug, Clone, Copy)]
pub struct BootstrapConfig {
    /// Number of resamples R (default: 2,000)
    pub replicates: usize,
    /// Confidence level (default: 0.95 for 95% CI)
    pub confidence_level: f64,
    /// Base seed; replicate `i` uses `seed + i`
    pub seed: u64,
    /// Whether to use parallel computation
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            replicates: DEFAULT_BOOTSTRAP_REPLICATES,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seed: DEFAULT_BOOTSTRAP_SEED,
            parallel: true,
        }
    }
}

impl BootstrapConfig {
    /// Same settings with a different base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Confidence interval bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl ConfidenceInterval {
    /// Distance between the bounds
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `value` lies within the bounds
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Result of bootstrap analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    /// Statistic on the original data
    pub point_estimate: f64,
    /// Percentile confidence interval
    pub confidence_interval: ConfidenceInterval,
    /// Standard deviation of the resample distribution
    pub standard_error: f64,
    /// Number of resamples drawn
    pub replicates: usize,
    /// Warning message if any
    pub warning: Option<String>,
}

/// Errors that can occur during bootstrap
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    #[error("Not enough samples: got {got}, need at least {min}")]
    NotEnoughSamples { got: usize, min: usize },

    #[error("Invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    #[error("Replicate count must be at least 1")]
    NoReplicates,
}

/// Draw `config.replicates` resamples of `values` with replacement and
/// evaluate `statistic` on each.
///
/// The returned distribution is in replicate order. Empty input yields an
/// empty distribution.
pub fn bootstrap_distribution<F>(values: &[f64], config: &BootstrapConfig, statistic: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    if values.is_empty() {
        return Vec::new();
    }

    let replicate = |i: usize| {
        let mut rng = replicate_rng(config.seed, i);
        let resample = resample(values, &mut rng);
        statistic(&resample)
    };

    if config.parallel {
        (0..config.replicates).into_par_iter().map(replicate).collect()
    } else {
        (0..config.replicates).map(replicate).collect()
    }
}

/// Bootstrap confidence interval for the mean of `values`.
///
/// For 0/1 values the mean is the proportion.
pub fn compute_bootstrap(
    values: &[f64],
    config: &BootstrapConfig,
) -> Result<BootstrapResult, BootstrapError> {
    validate(config)?;
    if values.len() < 2 {
        return Err(BootstrapError::NotEnoughSamples {
            got: values.len(),
            min: 2,
        });
    }

    let point_estimate = mean(values).unwrap_or(0.0);
    let distribution = bootstrap_distribution(values, config, |s| mean(s).unwrap_or(0.0));
    let warning = if values.len() < 10 {
        Some("Very small sample size may lead to unreliable estimates".to_string())
    } else {
        None
    };

    Ok(summarize(point_estimate, distribution, config, warning))
}

/// Bootstrap confidence interval for `mean(b) - mean(a)`.
///
/// Each replicate resamples both arms independently with the same sizes as
/// the originals.
pub fn bootstrap_difference(
    a: &[f64],
    b: &[f64],
    config: &BootstrapConfig,
) -> Result<BootstrapResult, BootstrapError> {
    validate(config)?;
    let smallest = a.len().min(b.len());
    if smallest < 2 {
        return Err(BootstrapError::NotEnoughSamples {
            got: smallest,
            min: 2,
        });
    }

    let point_estimate = mean(b).unwrap_or(0.0) - mean(a).unwrap_or(0.0);

    let replicate = |i: usize| {
        let mut rng = replicate_rng(config.seed, i);
        let resample_a = resample(a, &mut rng);
        let resample_b = resample(b, &mut rng);
        mean(&resample_b).unwrap_or(0.0) - mean(&resample_a).unwrap_or(0.0)
    };
    let distribution: Vec<f64> = if config.parallel {
        (0..config.replicates).into_par_iter().map(replicate).collect()
    } else {
        (0..config.replicates).map(replicate).collect()
    };

    Ok(summarize(point_estimate, distribution, config, None))
}

/// Percentile interval `[(1-c)/2, 1-(1-c)/2]` of a resample distribution,
/// with linear interpolation between order statistics.
pub fn percentile_interval(distribution: &[f64], confidence: f64) -> ConfidenceInterval {
    let mut sorted = distribution.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let tail = (1.0 - confidence) / 2.0 * 100.0;
    ConfidenceInterval {
        lower: percentile_of_sorted(&sorted, tail),
        upper: percentile_of_sorted(&sorted, 100.0 - tail),
        level: confidence,
    }
}

fn validate(config: &BootstrapConfig) -> Result<(), BootstrapError> {
    if config.confidence_level <= 0.0 || config.confidence_level >= 1.0 {
        return Err(BootstrapError::InvalidConfidenceLevel(
            config.confidence_level,
        ));
    }
    if config.replicates == 0 {
        return Err(BootstrapError::NoReplicates);
    }
    Ok(())
}

fn replicate_rng(seed: u64, replicate: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(replicate as u64))
}

fn resample(values: &[f64], rng: &mut StdRng) -> Vec<f64> {
    (0..values.len())
        .map(|_| values[rng.gen_range(0..values.len())])
        .collect()
}

fn summarize(
    point_estimate: f64,
    distribution: Vec<f64>,
    config: &BootstrapConfig,
    warning: Option<String>,
) -> BootstrapResult {
    let confidence_interval = percentile_interval(&distribution, config.confidence_level);
    // population SD of the replicates
    let standard_error = mean(&distribution)
        .map(|m| {
            let ss: f64 = distribution.iter().map(|x| (x - m).powi(2)).sum();
            (ss / distribution.len() as f64).sqrt()
        })
        .unwrap_or(0.0);

    BootstrapResult {
        point_estimate,
        confidence_interval,
        standard_error,
        replicates: distribution.len(),
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(replicates: usize) -> BootstrapConfig {
        BootstrapConfig {
            replicates,
            ..Default::default()
        }
    }

    fn skewed_samples() -> Vec<f64> {
        (0..200).map(|i| ((i * 37) % 11) as f64).collect()
    }

    #[test]
    fn test_bootstrap_basic() {
        let samples: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let result = compute_bootstrap(&samples, &config(1_000)).unwrap();

        assert!((result.point_estimate - 49.5).abs() < 1e-12);
        assert!(result.confidence_interval.contains(49.5));
        assert!(result.confidence_interval.lower > 40.0);
        assert!(result.confidence_interval.upper < 60.0);
        assert_eq!(result.replicates, 1_000);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let samples = skewed_samples();
        let first = compute_bootstrap(&samples, &config(500)).unwrap();
        let second = compute_bootstrap(&samples, &config(500)).unwrap();
        assert_eq!(first, second);

        let other = compute_bootstrap(&samples, &config(500).with_seed(7)).unwrap();
        assert_ne!(first.confidence_interval, other.confidence_interval);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let samples = skewed_samples();
        let parallel = config(300);
        let serial = BootstrapConfig {
            parallel: false,
            ..parallel
        };
        let mean_of = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
        assert_eq!(
            bootstrap_distribution(&samples, &parallel, mean_of),
            bootstrap_distribution(&samples, &serial, mean_of)
        );
    }

    #[test]
    fn test_custom_statistic() {
        let samples = skewed_samples();
        let max_of = |s: &[f64]| s.iter().cloned().fold(f64::MIN, f64::max);
        let distribution = bootstrap_distribution(&samples, &config(100), max_of);
        assert_eq!(distribution.len(), 100);
        assert!(distribution.iter().all(|&m| m <= 10.0));
    }

    #[test]
    fn test_constant_samples_degenerate_interval() {
        let samples = vec![1.0; 50];
        let result = compute_bootstrap(&samples, &config(200)).unwrap();
        assert_eq!(result.confidence_interval.lower, 1.0);
        assert_eq!(result.confidence_interval.upper, 1.0);
        assert_eq!(result.standard_error, 0.0);
    }

    #[test]
    fn test_difference_detects_shift() {
        let a: Vec<f64> = (0..300).map(|i| (i % 10) as f64).collect();
        let b: Vec<f64> = a.iter().map(|x| x + 2.0).collect();
        let result = bootstrap_difference(&a, &b, &config(1_000)).unwrap();

        assert!((result.point_estimate - 2.0).abs() < 1e-12);
        assert!(result.confidence_interval.lower > 1.0);
        assert!(result.confidence_interval.upper < 3.0);
    }

    #[test]
    fn test_difference_of_identical_arms_covers_zero() {
        let a = skewed_samples();
        let result = bootstrap_difference(&a, &a, &config(1_000)).unwrap();
        assert!(result.confidence_interval.contains(0.0));
    }

    #[test]
    fn test_not_enough_samples() {
        let err = compute_bootstrap(&[1.0], &config(10)).unwrap_err();
        assert_eq!(err, BootstrapError::NotEnoughSamples { got: 1, min: 2 });
        assert!(bootstrap_distribution(&[], &config(10), |_| 0.0).is_empty());
    }

    #[test]
    fn test_invalid_settings() {
        let samples = skewed_samples();
        let bad_level = BootstrapConfig {
            confidence_level: 1.0,
            ..config(10)
        };
        assert!(matches!(
            compute_bootstrap(&samples, &bad_level),
            Err(BootstrapError::InvalidConfidenceLevel(_))
        ));
        assert_eq!(
            compute_bootstrap(&samples, &config(0)).unwrap_err(),
            BootstrapError::NoReplicates
        );
    }

    #[test]
    fn test_percentile_interval_bounds() {
        let distribution: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let ci = percentile_interval(&distribution, 0.90);
        assert!((ci.lower - 5.0).abs() < 1e-12);
        assert!((ci.upper - 95.0).abs() < 1e-12);
        assert!((ci.width() - 90.0).abs() < 1e-12);
    }
}
