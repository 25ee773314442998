//! Significance Testing
//!
//! Every metric goes through the same contract, [`SignificanceTest::test`],
//! taking the metric name and the sufficient statistics of both arms:
//! - [`TwoProportionZTest`] for conversion and retention rates
//! - [`WelchTTest`] for continuous per-user metrics
//!
//! Lift is always B minus A. Statistics that cannot be computed (empty arm,
//! zero standard error) come back as `None` instead of NaN or infinity.

use crate::distributions::{
    normal_quantile, normal_two_sided_p, student_t_quantile, student_t_two_sided_p,
};
use crate::summary::ArmStatistics;
use serde::{Deserialize, Serialize};

/// Which test produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Unpooled two-proportion z-test
    TwoProportionZ,
    /// Welch's unequal-variance t-test
    WelchT,
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestKind::TwoProportionZ => write!(f, "z-test"),
            TestKind::WelchT => write!(f, "welch-t"),
        }
    }
}

/// Outcome of testing one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub metric_name: String,
    pub test: TestKind,
    pub n_a: u64,
    pub n_b: u64,
    pub estimate_a: Option<f64>,
    pub estimate_b: Option<f64>,
    /// estimate_b - estimate_a
    pub abs_lift: Option<f64>,
    /// abs_lift / estimate_a, undefined when estimate_a is 0
    pub rel_lift: Option<f64>,
    pub standard_error: Option<f64>,
    pub test_statistic: Option<f64>,
    /// Welch-Satterthwaite degrees of freedom (t-test only)
    pub degrees_of_freedom: Option<f64>,
    pub p_value: Option<f64>,
    /// Confidence interval of abs_lift at level 1 - alpha
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
    /// Significance level alpha the decision is made at
    pub decision_threshold: f64,
    pub significant: Option<bool>,
}

/// Settings shared by all tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestConfig {
    pub alpha: f64,
    /// Derive p-values from the test statistic
    pub p_values: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            p_values: true,
        }
    }
}

/// Common contract of every significance test
pub trait SignificanceTest {
    /// Which test this is
    fn kind(&self) -> TestKind;

    /// Compare arm B against arm A
    fn test(&self, metric_name: &str, a: &ArmStatistics, b: &ArmStatistics)
        -> SignificanceResult;
}

/// Two-proportion z-test: `z = (p_B - p_A) / sqrt(p_A(1-p_A)/n_A + p_B(1-p_B)/n_B)`
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoProportionZTest {
    pub config: TestConfig,
}

impl TwoProportionZTest {
    /// Create a z-test with the given settings
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }
}

impl SignificanceTest for TwoProportionZTest {
    fn kind(&self) -> TestKind {
        TestKind::TwoProportionZ
    }

    fn test(
        &self,
        metric_name: &str,
        a: &ArmStatistics,
        b: &ArmStatistics,
    ) -> SignificanceResult {
        let mut result = base_result(metric_name, self.kind(), a, b, self.config.alpha);

        let (Some(p_a), Some(p_b)) = (a.mean, b.mean) else {
            return result;
        };
        let variance = p_a * (1.0 - p_a) / a.n as f64 + p_b * (1.0 - p_b) / b.n as f64;
        let Some(se) = positive_sqrt(variance) else {
            return result;
        };
        let diff = p_b - p_a;
        let z = diff / se;
        let critical = normal_quantile(1.0 - self.config.alpha / 2.0);

        result.standard_error = Some(se);
        result.test_statistic = Some(z);
        result.ci_lower = Some(diff - critical * se);
        result.ci_upper = Some(diff + critical * se);
        if self.config.p_values {
            result.p_value = Some(normal_two_sided_p(z));
        }
        result.significant = Some(decide(&result, z, critical, self.config));
        result
    }
}

/// Welch's t-test: `t = (m_B - m_A) / sqrt(v_A/n_A + v_B/n_B)`
#[derive(Debug, Clone, Copy, Default)]
pub struct WelchTTest {
    pub config: TestConfig,
}

impl WelchTTest {
    /// Create a Welch test with the given settings
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }
}

impl SignificanceTest for WelchTTest {
    fn kind(&self) -> TestKind {
        TestKind::WelchT
    }

    fn test(
        &self,
        metric_name: &str,
        a: &ArmStatistics,
        b: &ArmStatistics,
    ) -> SignificanceResult {
        let mut result = base_result(metric_name, self.kind(), a, b, self.config.alpha);

        let (Some(m_a), Some(m_b), Some(v_a), Some(v_b)) = (a.mean, b.mean, a.variance, b.variance)
        else {
            return result;
        };
        let n_a = a.n as f64;
        let n_b = b.n as f64;
        let Some(se) = positive_sqrt(v_a / n_a + v_b / n_b) else {
            return result;
        };

        let diff = m_b - m_a;
        let t = diff / se;
        let df = welch_degrees_of_freedom(v_a, n_a, v_b, n_b);

        result.standard_error = Some(se);
        result.test_statistic = Some(t);
        result.degrees_of_freedom = Some(df);
        // no t reference for a non-positive df: interval and p-value stay null
        let Some(critical) = student_t_quantile(1.0 - self.config.alpha / 2.0, df) else {
            return result;
        };
        result.ci_lower = Some(diff - critical * se);
        result.ci_upper = Some(diff + critical * se);
        if self.config.p_values {
            result.p_value = student_t_two_sided_p(t, df);
        }
        result.significant = Some(decide(&result, t, critical, self.config));
        result
    }
}

/// Welch-Satterthwaite approximation; `n_A + n_B - 2` when undefined
pub fn welch_degrees_of_freedom(v_a: f64, n_a: f64, v_b: f64, n_b: f64) -> f64 {
    let se_a = v_a / n_a;
    let se_b = v_b / n_b;
    let numerator = (se_a + se_b).powi(2);
    let denominator = se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0);
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        n_a + n_b - 2.0
    }
}

/// Absolute and relative lift of B over A
pub fn lift(estimate_a: Option<f64>, estimate_b: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (estimate_a, estimate_b) {
        (Some(a), Some(b)) => {
            let abs = b - a;
            let rel = if a == 0.0 { None } else { Some(abs / a) };
            (Some(abs), rel)
        }
        _ => (None, None),
    }
}

fn base_result(
    metric_name: &str,
    test: TestKind,
    a: &ArmStatistics,
    b: &ArmStatistics,
    alpha: f64,
) -> SignificanceResult {
    let (abs_lift, rel_lift) = lift(a.mean, b.mean);
    SignificanceResult {
        metric_name: metric_name.to_string(),
        test,
        n_a: a.n,
        n_b: b.n,
        estimate_a: a.mean,
        estimate_b: b.mean,
        abs_lift,
        rel_lift,
        standard_error: None,
        test_statistic: None,
        degrees_of_freedom: None,
        p_value: None,
        ci_lower: None,
        ci_upper: None,
        decision_threshold: alpha,
        significant: None,
    }
}

fn positive_sqrt(variance: f64) -> Option<f64> {
    if variance > 0.0 && variance.is_finite() {
        Some(variance.sqrt())
    } else {
        None
    }
}

fn decide(result: &SignificanceResult, statistic: f64, critical: f64, config: TestConfig) -> bool {
    match result.p_value {
        Some(p) => p < config.alpha,
        None => statistic.abs() > critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z_test() -> TwoProportionZTest {
        TwoProportionZTest::default()
    }

    #[test]
    fn test_z_large_sample() {
        let a = ArmStatistics::from_proportion(40_000, 100_000);
        let b = ArmStatistics::from_proportion(41_000, 100_000);
        let result = z_test().test("conversion", &a, &b);

        let z = result.test_statistic.unwrap();
        assert!((z - 4.555).abs() < 0.01, "z = {}", z);
        assert!((result.abs_lift.unwrap() - 0.01).abs() < 1e-12);
        assert!((result.rel_lift.unwrap() - 0.025).abs() < 1e-9);
        assert!(result.p_value.unwrap() < 1e-4);
        assert_eq!(result.significant, Some(true));
        assert!(result.ci_lower.unwrap() > 0.0);
    }

    #[test]
    fn test_z_symmetry() {
        let a = ArmStatistics::from_proportion(120, 1_000);
        let b = ArmStatistics::from_proportion(150, 1_000);
        let forward = z_test().test("conversion", &a, &b);
        let backward = z_test().test("conversion", &b, &a);

        let z_f = forward.test_statistic.unwrap();
        let z_b = backward.test_statistic.unwrap();
        assert!((z_f + z_b).abs() < 1e-12);
        assert!((forward.abs_lift.unwrap() + backward.abs_lift.unwrap()).abs() < 1e-12);
        assert!((forward.p_value.unwrap() - backward.p_value.unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_z_undefined_at_degenerate_rates() {
        let a = ArmStatistics::from_proportion(5, 5);
        let b = ArmStatistics::from_proportion(5, 5);
        let result = z_test().test("conversion", &a, &b);

        assert_eq!(result.abs_lift, Some(0.0));
        assert_eq!(result.rel_lift, Some(0.0));
        assert_eq!(result.test_statistic, None);
        assert_eq!(result.p_value, None);
        assert_eq!(result.significant, None);
    }

    #[test]
    fn test_z_empty_arm() {
        let a = ArmStatistics::from_proportion(0, 0);
        let b = ArmStatistics::from_proportion(3, 10);
        let result = z_test().test("conversion", &a, &b);
        assert_eq!(result.estimate_a, None);
        assert_eq!(result.abs_lift, None);
        assert_eq!(result.test_statistic, None);
    }

    #[test]
    fn test_relative_lift_undefined_on_zero_baseline() {
        let a = ArmStatistics::from_proportion(0, 100);
        let b = ArmStatistics::from_proportion(5, 100);
        let result = z_test().test("conversion", &a, &b);
        assert_eq!(result.rel_lift, None);
        assert!(result.test_statistic.is_some());
    }

    #[test]
    fn test_z_without_p_values_uses_critical_value() {
        let config = TestConfig {
            alpha: 0.05,
            p_values: false,
        };
        let a = ArmStatistics::from_proportion(40_000, 100_000);
        let b = ArmStatistics::from_proportion(41_000, 100_000);
        let result = TwoProportionZTest::new(config).test("conversion", &a, &b);
        assert_eq!(result.p_value, None);
        assert_eq!(result.significant, Some(true));
    }

    #[test]
    fn test_welch_known_values() {
        let a = [19.1, 21.3, 20.2, 18.7, 20.9, 21.4, 19.8, 20.0];
        let b = [22.4, 21.9, 23.5, 22.8, 21.7, 23.1, 22.2, 24.0, 22.6, 23.3];
        let result = WelchTTest::default().test(
            "volume",
            &ArmStatistics::from_samples(&a),
            &ArmStatistics::from_samples(&b),
        );

        let t = result.test_statistic.unwrap();
        let df = result.degrees_of_freedom.unwrap();
        assert!(t > 5.0);
        assert!(df > 10.0 && df < 16.0);
        assert!(result.p_value.unwrap() < 0.001);
        assert_eq!(result.significant, Some(true));
    }

    #[test]
    fn test_welch_identical_samples_not_significant() {
        let values = [3.0, 5.0, 4.0, 6.0, 2.0, 5.0];
        let arm = ArmStatistics::from_samples(&values);
        let result = WelchTTest::default().test("volume", &arm, &arm);
        assert!(result.test_statistic.unwrap().abs() < 1e-12);
        assert!((result.p_value.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(result.significant, Some(false));
    }

    #[test]
    fn test_welch_zero_variance_is_undefined() {
        let arm = ArmStatistics::from_samples(&[2.0, 2.0, 2.0]);
        let result = WelchTTest::default().test("volume", &arm, &arm);
        assert_eq!(result.test_statistic, None);
        assert_eq!(result.degrees_of_freedom, None);
    }

    #[test]
    fn test_welch_df_equal_variances() {
        // equal n and variance: df = 2n - 2
        let df = welch_degrees_of_freedom(4.0, 50.0, 4.0, 50.0);
        assert!((df - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_both_tests_share_contract() {
        let tests: Vec<Box<dyn SignificanceTest>> =
            vec![Box::new(z_test()), Box::new(WelchTTest::default())];
        let a = ArmStatistics::from_samples(&[0.0, 1.0, 0.0, 1.0, 1.0]);
        let b = ArmStatistics::from_samples(&[1.0, 1.0, 0.0, 1.0, 1.0]);
        for test in &tests {
            let result = test.test("metric", &a, &b);
            assert_eq!(result.test, test.kind());
            assert!((result.abs_lift.unwrap() - 0.2).abs() < 1e-12);
        }
    }
}
