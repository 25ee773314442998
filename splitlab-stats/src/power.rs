//! Power and Minimum Detectable Effect
//!
//! Closed-form normal approximation for two-sample comparisons:
//!
//! ```text
//! MDE = (z_{1-α/2} + z_{power}) * sqrt(var_A/n_A + var_B/n_B)
//! ```
//!
//! Sample-size mode inverts it for equal arms, and achievable power runs it
//! backwards for a given effect.

use crate::distributions::{normal_cdf, normal_quantile};
use serde::{Deserialize, Serialize};

/// Significance level and target power shared by all three modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCalculator {
    pub alpha: f64,
    /// Target power 1 - β
    pub power: f64,
}

impl Default for PowerCalculator {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.8,
        }
    }
}

/// Power analysis of one metric at the observed sample sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    pub metric_name: String,
    pub alpha: f64,
    pub power: f64,
    pub n_a: u64,
    pub n_b: u64,
    /// Baseline (arm A) rate or mean
    pub baseline: Option<f64>,
    pub mde_absolute: Option<f64>,
    /// MDE relative to the baseline
    pub mde_relative: Option<f64>,
    /// Users per arm needed to detect `target_relative_mde` at the target power
    pub target_relative_mde: f64,
    pub required_n_per_arm: Option<u64>,
    /// Power to detect the observed absolute lift
    pub observed_effect: Option<f64>,
    pub achieved_power: Option<f64>,
}

impl PowerCalculator {
    /// Create a calculator for the given α and target power
    pub fn new(alpha: f64, power: f64) -> Self {
        Self { alpha, power }
    }

    fn z_sum(&self) -> f64 {
        normal_quantile(1.0 - self.alpha / 2.0) + normal_quantile(self.power)
    }

    /// Smallest absolute effect detectable at the target power
    pub fn minimum_detectable_effect(
        &self,
        variance_a: f64,
        n_a: u64,
        variance_b: f64,
        n_b: u64,
    ) -> Option<f64> {
        let se = standard_error(variance_a, n_a, variance_b, n_b)?;
        Some(self.z_sum() * se)
    }

    /// Users per arm needed to detect an absolute effect `mde` with equal arms
    pub fn required_sample_size(&self, variance_a: f64, variance_b: f64, mde: f64) -> Option<u64> {
        if !(mde.is_finite() && mde != 0.0) {
            return None;
        }
        let total_variance = variance_a + variance_b;
        if !(total_variance.is_finite() && total_variance > 0.0) {
            return None;
        }
        let n = (self.z_sum().powi(2) * total_variance / (mde * mde)).ceil();
        if n.is_finite() && n < u64::MAX as f64 {
            Some(n as u64)
        } else {
            None
        }
    }

    /// Probability of a significant two-sided result when the true effect is
    /// `effect`. The negligible opposite-tail term is ignored.
    pub fn achievable_power(
        &self,
        variance_a: f64,
        n_a: u64,
        variance_b: f64,
        n_b: u64,
        effect: f64,
    ) -> Option<f64> {
        let se = standard_error(variance_a, n_a, variance_b, n_b)?;
        let z_alpha = normal_quantile(1.0 - self.alpha / 2.0);
        Some(normal_cdf(effect.abs() / se - z_alpha))
    }
}

/// Minimum detectable absolute effect, see [`PowerCalculator::minimum_detectable_effect`]
pub fn minimum_detectable_effect(
    alpha: f64,
    power: f64,
    variance_a: f64,
    n_a: u64,
    variance_b: f64,
    n_b: u64,
) -> Option<f64> {
    PowerCalculator::new(alpha, power).minimum_detectable_effect(variance_a, n_a, variance_b, n_b)
}

/// Required users per arm, see [`PowerCalculator::required_sample_size`]
pub fn required_sample_size(
    alpha: f64,
    power: f64,
    variance_a: f64,
    variance_b: f64,
    mde: f64,
) -> Option<u64> {
    PowerCalculator::new(alpha, power).required_sample_size(variance_a, variance_b, mde)
}

/// Achievable power, see [`PowerCalculator::achievable_power`]
pub fn achievable_power(
    alpha: f64,
    variance_a: f64,
    n_a: u64,
    variance_b: f64,
    n_b: u64,
    effect: f64,
) -> Option<f64> {
    PowerCalculator::new(alpha, 0.8).achievable_power(variance_a, n_a, variance_b, n_b, effect)
}

fn standard_error(variance_a: f64, n_a: u64, variance_b: f64, n_b: u64) -> Option<f64> {
    if n_a == 0 || n_b == 0 {
        return None;
    }
    let variance = variance_a / n_a as f64 + variance_b / n_b as f64;
    if variance > 0.0 && variance.is_finite() {
        Some(variance.sqrt())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mde_known_value() {
        // p = 0.4 both arms, 10k per arm: 2.8016 * sqrt(0.48/10000)
        let calc = PowerCalculator::default();
        let mde = calc
            .minimum_detectable_effect(0.24, 10_000, 0.24, 10_000)
            .unwrap();
        assert!((mde - 0.01941).abs() < 1e-4, "mde = {}", mde);
    }

    #[test]
    fn test_mde_and_sample_size_are_inverses() {
        let calc = PowerCalculator::new(0.05, 0.8);
        for &(variance, n) in &[(0.24, 5_000u64), (12.5, 800), (0.09, 120_000)] {
            let mde = calc.minimum_detectable_effect(variance, n, variance, n).unwrap();
            let back = calc.required_sample_size(variance, variance, mde).unwrap();
            let diff = (back as i64 - n as i64).abs();
            assert!(diff <= 1, "n = {}, back = {}", n, back);
        }
    }

    #[test]
    fn test_power_at_mde_equals_target() {
        let calc = PowerCalculator::new(0.05, 0.9);
        let mde = calc.minimum_detectable_effect(4.0, 2_000, 5.0, 2_500).unwrap();
        let power = calc.achievable_power(4.0, 2_000, 5.0, 2_500, mde).unwrap();
        assert!((power - 0.9).abs() < 1e-3, "power = {}", power);
    }

    #[test]
    fn test_power_grows_with_effect() {
        let small = achievable_power(0.05, 0.24, 1_000, 0.24, 1_000, 0.01).unwrap();
        let large = achievable_power(0.05, 0.24, 1_000, 0.24, 1_000, 0.08).unwrap();
        assert!(large > small);
        assert!(large > 0.9);
    }

    #[test]
    fn test_mde_shrinks_with_sample_size() {
        let small = minimum_detectable_effect(0.05, 0.8, 1.0, 100, 1.0, 100).unwrap();
        let large = minimum_detectable_effect(0.05, 0.8, 1.0, 10_000, 1.0, 10_000).unwrap();
        assert!((small / large - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(minimum_detectable_effect(0.05, 0.8, 0.24, 0, 0.24, 10), None);
        assert_eq!(minimum_detectable_effect(0.05, 0.8, 0.0, 10, 0.0, 10), None);
        assert_eq!(required_sample_size(0.05, 0.8, 0.24, 0.24, 0.0), None);
        assert_eq!(required_sample_size(0.05, 0.8, 0.0, 0.0, 0.01), None);
    }
}
