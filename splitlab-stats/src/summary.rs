//! Sufficient Statistics
//!
//! Everything the significance tests need from one arm: size, mean and
//! variance. Undefined quantities (mean of nothing, variance of one value) are
//! `None` rather than NaN.

use serde::{Deserialize, Serialize};

/// Size, mean and variance of one experiment arm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmStatistics {
    pub n: u64,
    pub mean: Option<f64>,
    /// Bessel-corrected sample variance for continuous metrics,
    /// Bernoulli variance p(1-p) for proportions
    pub variance: Option<f64>,
}

impl ArmStatistics {
    /// Statistics of a continuous metric from per-user values
    pub fn from_samples(values: &[f64]) -> Self {
        Self {
            n: values.len() as u64,
            mean: mean(values),
            variance: sample_variance(values),
        }
    }

    /// Statistics of a proportion from a success count
    pub fn from_proportion(successes: u64, n: u64) -> Self {
        let rate = proportion(successes, n);
        Self {
            n,
            mean: rate,
            variance: rate.map(|p| p * (1.0 - p)),
        }
    }

    /// Standard error of the mean, `sqrt(variance / n)`
    pub fn standard_error(&self) -> Option<f64> {
        let variance = self.variance?;
        if self.n == 0 {
            return None;
        }
        Some((variance / self.n as f64).sqrt())
    }
}

/// `successes / n`, `None` when `n` is zero
pub fn proportion(successes: u64, n: u64) -> Option<f64> {
    if n == 0 {
        None
    } else {
        Some(successes as f64 / n as f64)
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Bessel-corrected sample variance, `None` below two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Bessel-corrected sample covariance of paired values.
///
/// `None` below two pairs or when the slices differ in length.
pub fn sample_covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let cross: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    Some(cross / (x.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-12);
        // population variance 4, sample variance 32/7
        assert!((sample_variance(&values).unwrap() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_statistics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_variance(&[3.0]), None);
        assert_eq!(proportion(0, 0), None);
        assert_eq!(sample_covariance(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn test_covariance() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((sample_covariance(&x, &y).unwrap() - 2.0 * sample_variance(&x).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_arm_from_proportion() {
        let arm = ArmStatistics::from_proportion(40, 100);
        assert_eq!(arm.n, 100);
        assert!((arm.mean.unwrap() - 0.4).abs() < 1e-12);
        assert!((arm.variance.unwrap() - 0.24).abs() < 1e-12);
        assert!((arm.standard_error().unwrap() - (0.24_f64 / 100.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_arm() {
        let arm = ArmStatistics::from_samples(&[]);
        assert_eq!(arm.n, 0);
        assert_eq!(arm.mean, None);
        assert_eq!(arm.standard_error(), None);
    }
}
