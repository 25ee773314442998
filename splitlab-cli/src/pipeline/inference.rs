//! Inference Stage
//!
//! Significance tests, CUPED, bootstrap intervals and power analysis over the
//! per-user outcomes. Every tested metric is first reduced to a
//! [`MetricSamples`] so all four consumers see the same numbers.

use splitlab_core::{AnalysisConfig, UserOutcome, Variant};
use splitlab_logic::{
    conversion_value, pre_volume_value, retention_value, variant_values, volume_value,
    VariantMetrics,
};
use splitlab_report::{BootstrapInterval, BootstrapScope, CupedSummary};
use splitlab_stats::{
    bootstrap_difference, compute_bootstrap, cuped_adjust, sample_variance, variance_reduction,
    ArmStatistics, BootstrapConfig, BootstrapResult, PowerCalculator, PowerResult,
    SignificanceResult, SignificanceTest, TestConfig, TestKind, TwoProportionZTest, WelchTTest,
};
use tracing::debug;

/// Name of the CUPED-adjusted volume metric
pub const CUPED_METRIC: &str = "volume_cuped";

/// Seed distance between bootstrap streams of different metrics
const METRIC_SEED_STRIDE: u64 = 1 << 32;

/// Per-user values and sufficient statistics of one metric
#[derive(Debug, Clone)]
pub struct MetricSamples {
    pub name: String,
    pub test: TestKind,
    pub a: ArmStatistics,
    pub b: ArmStatistics,
    pub values_a: Vec<f64>,
    pub values_b: Vec<f64>,
}

/// Conversion, each retention checkpoint, then volume
pub fn collect_metrics(
    outcomes: &[UserOutcome],
    variants: &[VariantMetrics],
    checkpoints: &[u32],
) -> Vec<MetricSamples> {
    let stats = |variant: Variant| variants.iter().find(|m| m.variant == variant);
    let (Some(metrics_a), Some(metrics_b)) = (stats(Variant::A), stats(Variant::B)) else {
        return Vec::new();
    };

    let mut metrics = vec![MetricSamples {
        name: "conversion".to_string(),
        test: TestKind::TwoProportionZ,
        a: metrics_a.conversion_stats(),
        b: metrics_b.conversion_stats(),
        values_a: variant_values(outcomes, Variant::A, conversion_value),
        values_b: variant_values(outcomes, Variant::B, conversion_value),
    }];

    for &day in checkpoints {
        let (Some(a), Some(b)) = (metrics_a.retention_stats(day), metrics_b.retention_stats(day))
        else {
            continue;
        };
        metrics.push(MetricSamples {
            name: format!("retention_d{}", day),
            test: TestKind::TwoProportionZ,
            a,
            b,
            values_a: variant_values(outcomes, Variant::A, retention_value(day)),
            values_b: variant_values(outcomes, Variant::B, retention_value(day)),
        });
    }

    metrics.push(MetricSamples {
        name: "volume".to_string(),
        test: TestKind::WelchT,
        a: metrics_a.volume_stats(),
        b: metrics_b.volume_stats(),
        values_a: variant_values(outcomes, Variant::A, volume_value),
        values_b: variant_values(outcomes, Variant::B, volume_value),
    });

    metrics
}

/// Run the matching significance test on every metric
pub fn run_significance(metrics: &[MetricSamples], config: &AnalysisConfig) -> Vec<SignificanceResult> {
    let test_config = test_config(config);
    let z_test = TwoProportionZTest::new(test_config);
    let welch = WelchTTest::new(test_config);

    metrics
        .iter()
        .map(|m| {
            let test: &dyn SignificanceTest = match m.test {
                TestKind::TwoProportionZ => &z_test,
                TestKind::WelchT => &welch,
            };
            let result = test.test(&m.name, &m.a, &m.b);
            debug!(
                metric = %m.name,
                test = %m.test,
                statistic = ?result.test_statistic,
                p_value = ?result.p_value,
                "Tested metric"
            );
            result
        })
        .collect()
}

/// Adjust volume with pre-period volume and re-run the Welch test.
///
/// `theta` is estimated on both variants pooled. `None` without users.
pub fn run_cuped(outcomes: &[UserOutcome], config: &AnalysisConfig) -> Option<CupedSummary> {
    if outcomes.is_empty() {
        return None;
    }
    let y: Vec<f64> = outcomes.iter().map(volume_value).collect();
    let x: Vec<f64> = outcomes.iter().map(pre_volume_value).collect();
    let adjustment = cuped_adjust(&y, &x).ok()?;

    let mut raw = (Vec::new(), Vec::new());
    let mut adjusted = (Vec::new(), Vec::new());
    for ((outcome, &yi), &adj) in outcomes.iter().zip(&y).zip(&adjustment.adjusted) {
        match outcome.variant {
            Variant::A => {
                raw.0.push(yi);
                adjusted.0.push(adj);
            }
            Variant::B => {
                raw.1.push(yi);
                adjusted.1.push(adj);
            }
        }
    }

    let pooled = |a: &[f64], b: &[f64]| {
        let variances: Vec<f64> = [a, b].iter().filter_map(|g| sample_variance(g)).collect();
        splitlab_stats::mean(&variances)
    };
    let result = WelchTTest::new(test_config(config)).test(
        CUPED_METRIC,
        &ArmStatistics::from_samples(&adjusted.0),
        &ArmStatistics::from_samples(&adjusted.1),
    );
    debug!(theta = adjustment.theta, "Applied CUPED adjustment");

    Some(CupedSummary {
        metric: "volume".to_string(),
        covariate: "pre_volume".to_string(),
        theta: adjustment.theta,
        covariate_mean: adjustment.covariate_mean,
        variance_raw: pooled(&raw.0, &raw.1),
        variance_adjusted: pooled(&adjusted.0, &adjusted.1),
        variance_reduction: variance_reduction(
            &[raw.0.as_slice(), raw.1.as_slice()],
            &[adjusted.0.as_slice(), adjusted.1.as_slice()],
        ),
        result,
    })
}

/// Per-variant intervals for conversion and volume, and difference intervals
/// for every metric.
///
/// Metrics whose arms are too small to resample are left out.
pub fn run_bootstrap(metrics: &[MetricSamples], config: &AnalysisConfig) -> Vec<BootstrapInterval> {
    if !config.bootstrap.enabled {
        return Vec::new();
    }
    let base = BootstrapConfig {
        replicates: config.bootstrap.replicates,
        confidence_level: config.confidence_level(),
        seed: config.bootstrap.seed,
        parallel: true,
    };

    let mut intervals = Vec::new();
    for (index, metric) in metrics.iter().enumerate() {
        // three streams per metric: A, B, difference
        let stream = |offset: u64| {
            let seed = base
                .seed
                .wrapping_add((index as u64 * 3 + offset).wrapping_mul(METRIC_SEED_STRIDE));
            base.with_seed(seed)
        };

        if metric.name == "conversion" || metric.name == "volume" {
            for (offset, scope, values) in [
                (0, BootstrapScope::VariantA, &metric.values_a),
                (1, BootstrapScope::VariantB, &metric.values_b),
            ] {
                let cfg = stream(offset);
                push_interval(&mut intervals, &metric.name, scope, &cfg, compute_bootstrap(values, &cfg));
            }
        }

        let cfg = stream(2);
        push_interval(
            &mut intervals,
            &metric.name,
            BootstrapScope::Difference,
            &cfg,
            bootstrap_difference(&metric.values_a, &metric.values_b, &cfg),
        );
    }
    intervals
}

fn push_interval(
    intervals: &mut Vec<BootstrapInterval>,
    metric: &str,
    scope: BootstrapScope,
    config: &BootstrapConfig,
    result: Result<BootstrapResult, splitlab_stats::BootstrapError>,
) {
    match result {
        Ok(r) => intervals.push(BootstrapInterval {
            metric: metric.to_string(),
            scope,
            point_estimate: r.point_estimate,
            lower: r.confidence_interval.lower,
            upper: r.confidence_interval.upper,
            level: r.confidence_interval.level,
            standard_error: r.standard_error,
            replicates: r.replicates,
            seed: config.seed,
        }),
        Err(e) => debug!(metric, scope = scope.as_str(), error = %e, "Skipped bootstrap interval"),
    }
}

/// MDE, required sample size and achieved power for every tested metric
pub fn run_power(
    metrics: &[MetricSamples],
    significance: &[SignificanceResult],
    config: &AnalysisConfig,
) -> Vec<PowerResult> {
    let calc = PowerCalculator::new(config.inference.alpha, config.inference.power);
    let target = config.inference.target_relative_mde;

    metrics
        .iter()
        .map(|m| {
            let baseline = m.a.mean;
            let variances = m.a.variance.zip(m.b.variance);
            let mde_absolute =
                variances.and_then(|(va, vb)| calc.minimum_detectable_effect(va, m.a.n, vb, m.b.n));
            let mde_relative = mde_absolute
                .zip(baseline)
                .and_then(|(mde, base)| if base == 0.0 { None } else { Some(mde / base) });
            let required_n_per_arm = variances
                .zip(baseline)
                .and_then(|((va, vb), base)| calc.required_sample_size(va, vb, target * base));
            let observed_effect = significance
                .iter()
                .find(|r| r.metric_name == m.name)
                .and_then(|r| r.abs_lift);
            let achieved_power = variances
                .zip(observed_effect)
                .and_then(|((va, vb), effect)| calc.achievable_power(va, m.a.n, vb, m.b.n, effect));

            PowerResult {
                metric_name: m.name.clone(),
                alpha: calc.alpha,
                power: calc.power,
                n_a: m.a.n,
                n_b: m.b.n,
                baseline,
                mde_absolute,
                mde_relative,
                target_relative_mde: target,
                required_n_per_arm,
                observed_effect,
                achieved_power,
            }
        })
        .collect()
}

fn test_config(config: &AnalysisConfig) -> TestConfig {
    TestConfig {
        alpha: config.inference.alpha,
        p_values: config.inference.p_values,
    }
}
