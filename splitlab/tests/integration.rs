//! Integration tests for Splitlab
//!
//! These tests verify the end-to-end behavior of the analysis pipeline.

use chrono::{Days, NaiveDate};
use splitlab::{
    aggregate_outcomes, assign_users, assign_variant, build_timeline, compute_bootstrap, cuped_adjust,
    filter_window, run_analysis, verify_outcomes, AnalysisConfig, ArmStatistics, Assignment,
    BootstrapConfig, InMemorySource, LineItem, OrderRecord, PowerCalculator, SignificanceTest,
    TwoProportionZTest, UserOutcome, Variant,
};
use splitlab_cli::{build_report, compute_outcomes};
use splitlab_report::BootstrapScope;
use std::collections::BTreeMap;

const USERS: u64 = 600;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
}

/// Users assigned 60 days after the timeline anchor, so each user has both
/// pre-period and in-window activity.
fn synthetic_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.assignment.assignment_date = base_date() + Days::new(60);
    config.bootstrap.replicates = 200;
    config
}

fn synthetic_source() -> InMemorySource {
    let mut orders = Vec::new();
    let mut line_items = Vec::new();
    for user_id in 1..=USERS {
        let order_count = 1 + (user_id % 7) as u32;
        for number in 1..=order_count {
            let order_id = user_id * 100 + u64::from(number);
            let delta = if number == 1 {
                None
            } else {
                Some(((user_id * 13 + u64::from(number) * 7) % 25) as f64)
            };
            orders.push(OrderRecord {
                user_id,
                order_id,
                order_number: number,
                days_since_prior_order: delta,
            });
            line_items.push(LineItem {
                order_id,
                item_count: 1 + (user_id + u64::from(number)) % 4,
            });
        }
    }
    InMemorySource::new(orders, line_items)
}

fn outcome(user_id: u64, variant: Variant, converted: bool) -> UserOutcome {
    let retained: BTreeMap<u32, bool> = [(14, converted), (28, converted)].into_iter().collect();
    UserOutcome {
        user_id,
        variant,
        assigned_at: base_date(),
        window_days: 28,
        events_in_window: u64::from(converted),
        volume_in_window: if converted { 3 } else { 0 },
        converted,
        retained,
        pre_events: 0,
        pre_volume: 0,
    }
}

fn history_of(outcomes: &[UserOutcome]) -> Vec<Assignment> {
    outcomes
        .iter()
        .map(|o| Assignment {
            user_id: o.user_id,
            variant: o.variant,
            assigned_at: o.assigned_at,
        })
        .collect()
}

/// 10 users split 5/5 by the pinned salt, each with one order on the assignment day
#[test]
fn test_ten_users_all_converting() {
    let mut config = AnalysisConfig::default();
    config.assignment.salt = "exp-6".to_string();
    config.assignment.assignment_date = config.base_date;

    let assignments = assign_users(1..=10, &config.assignment);
    let in_b: Vec<u64> = assignments
        .iter()
        .filter(|a| a.variant == Variant::B)
        .map(|a| a.user_id)
        .collect();
    assert_eq!(in_b, vec![1, 2, 3, 6, 10]);

    let orders: Vec<OrderRecord> = (1..=10)
        .map(|user_id| OrderRecord {
            user_id,
            order_id: user_id * 10,
            order_number: 1,
            days_since_prior_order: None,
        })
        .collect();

    let events = build_timeline(&orders, &[], config.base_date).unwrap();
    let windowed = filter_window(&assignments, &events, config.outcome.window_days);
    let outcomes = aggregate_outcomes(&assignments, &windowed, &events, &config.outcome).unwrap();
    verify_outcomes(&assignments, &outcomes).unwrap();
    assert!(outcomes.iter().all(|o| o.converted));

    let report = build_report(&assignments, &outcomes, &config);
    assert_eq!(report.variants[0].conversion_rate, Some(1.0));
    assert_eq!(report.variants[1].conversion_rate, Some(1.0));

    let conversion = report.significance_for("conversion").unwrap();
    assert_eq!(conversion.abs_lift, Some(0.0));
    assert_eq!(conversion.test_statistic, None);
    assert_eq!(conversion.p_value, None);
    assert_eq!(conversion.significant, None);

    // undefined statistics serialize as null, never NaN
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["significance"][0]["test_statistic"].is_null());
    assert!(!serde_json::to_string(&report).unwrap().contains("NaN"));
    assert!(report.summary.trustworthy);
}

/// A converts at 40%, B at 41%, 100k users each
#[test]
fn test_large_sample_lift_is_significant() {
    let mut outcomes = Vec::with_capacity(200_000);
    for i in 0..100_000u64 {
        outcomes.push(outcome(i, Variant::A, i < 40_000));
        outcomes.push(outcome(100_000 + i, Variant::B, i < 41_000));
    }
    let mut config = AnalysisConfig::default();
    config.bootstrap.enabled = false;

    let report = build_report(&history_of(&outcomes), &outcomes, &config);

    assert_eq!(report.guardrails.srm_z, Some(0.0));
    assert!(report.guardrails.srm_pass);
    assert!(report.summary.trustworthy);

    let conversion = report.significance_for("conversion").unwrap();
    let z = conversion.test_statistic.unwrap();
    assert!(z > 4.4 && z < 4.8, "z = {}", z);
    assert!((conversion.abs_lift.unwrap() - 0.01).abs() < 1e-12);
    assert_eq!(conversion.significant, Some(true));
    assert!(report
        .summary
        .significant_metrics
        .contains(&"conversion".to_string()));
    assert!(report.bootstrap.is_empty());

    let power = report
        .power
        .iter()
        .find(|p| p.metric_name == "conversion")
        .unwrap();
    assert!(power.mde_absolute.unwrap() < 0.01);
    assert!(power.achieved_power.unwrap() > 0.9);
}

#[test]
fn test_outcomes_cover_every_user() {
    let config = synthetic_config();
    let set = compute_outcomes(&synthetic_source(), &config).unwrap();

    assert_eq!(set.assignments.len() as u64, USERS);
    assert_eq!(set.outcomes.len() as u64, USERS);
    // some users are inactive in the window and still counted
    assert!(set.outcomes.iter().any(|o| !o.converted));
    assert!(set.outcomes.iter().any(|o| o.pre_volume > 0));

    let report = build_report(&set.history, &set.outcomes, &config);
    let users: u64 = report.variants.iter().map(|v| v.users).sum();
    assert_eq!(users, USERS);
    for v in &report.variants {
        let rate = v.conversion_rate.unwrap();
        assert!((0.0..=1.0).contains(&rate));
        assert!(v.variance_volume.unwrap() >= 0.0);
    }
}

/// Default dates leave a pre-period, so outcomes and the CUPED covariate carry signal
#[test]
fn test_default_config_gives_real_outcomes() {
    let mut config = AnalysisConfig::default();
    config.bootstrap.enabled = false;
    let report = run_analysis(&synthetic_source(), &config).unwrap();

    for v in &report.variants {
        let rate = v.conversion_rate.unwrap();
        assert!(rate > 0.0 && rate < 1.0, "conversion rate {}", rate);
    }
    let cuped = report.cuped.as_ref().unwrap();
    assert!(cuped.theta.abs() > 1e-3, "theta = {}", cuped.theta);
}

#[test]
fn test_analysis_is_reproducible() {
    let config = synthetic_config();
    let source = synthetic_source();
    let first = run_analysis(&source, &config).unwrap();
    let second = run_analysis(&source, &config).unwrap();

    assert_eq!(first.guardrails, second.guardrails);
    assert_eq!(first.variants, second.variants);
    assert_eq!(first.significance, second.significance);
    assert_eq!(first.bootstrap, second.bootstrap);
    assert!(first
        .bootstrap_for("volume", BootstrapScope::Difference)
        .is_some());
}

#[test]
fn test_salt_changes_assignment() {
    let config = synthetic_config();
    let mut other = synthetic_config();
    other.assignment.salt = "another-experiment".to_string();

    let first = compute_outcomes(&synthetic_source(), &config).unwrap();
    let second = compute_outcomes(&synthetic_source(), &other).unwrap();
    let differing = first
        .assignments
        .iter()
        .zip(&second.assignments)
        .filter(|(a, b)| a.variant != b.variant)
        .count();
    assert!(differing > 0);
}

#[test]
fn test_injected_contamination_reported() {
    let config = synthetic_config();
    let user_id = 42;
    let fresh = assign_variant(&config.assignment.salt, user_id, config.assignment.split_ratio);
    let opposite = match fresh {
        Variant::A => Variant::B,
        Variant::B => Variant::A,
    };
    let source = synthetic_source().with_history(vec![Assignment {
        user_id,
        variant: opposite,
        assigned_at: config.assignment.assignment_date,
    }]);

    let report = run_analysis(&source, &config).unwrap();
    assert_eq!(report.guardrails.contamination_count, 1);
    assert!(!report.guardrails.contamination_pass);
    assert!(!report.summary.trustworthy);
    // results are still produced next to the failing guardrail
    assert!(report.significance_for("conversion").is_some());
}

#[test]
fn test_invalid_config_stops_analysis() {
    let mut config = synthetic_config();
    config.outcome.window_days = 0;
    config.outcome.retention_checkpoints.clear();
    assert!(matches!(
        run_analysis(&synthetic_source(), &config),
        Err(splitlab::AnalysisError::Config(_))
    ));
}

#[test]
fn test_z_test_symmetry() {
    let a = ArmStatistics::from_proportion(300, 1_000);
    let b = ArmStatistics::from_proportion(345, 1_000);
    let test = TwoProportionZTest::default();
    let forward = test.test("conversion", &a, &b);
    let swapped = test.test("conversion", &b, &a);

    assert!((forward.abs_lift.unwrap() + swapped.abs_lift.unwrap()).abs() < 1e-12);
    assert!((forward.test_statistic.unwrap() + swapped.test_statistic.unwrap()).abs() < 1e-12);
}

#[test]
fn test_cuped_constant_covariate_is_identity() {
    let y = [4.0, 1.0, 0.0, 7.0, 3.0];
    let adjustment = cuped_adjust(&y, &[2.0; 5]).unwrap();
    assert_eq!(adjustment.theta, 0.0);
    assert_eq!(adjustment.adjusted, y.to_vec());
}

#[test]
fn test_bootstrap_interval_symmetric_for_symmetric_data() {
    let values: Vec<f64> = (0..2_000).map(|i| (i % 101) as f64).collect();
    let config = BootstrapConfig {
        replicates: 2_000,
        ..Default::default()
    };
    let result = compute_bootstrap(&values, &config).unwrap();
    let ci = result.confidence_interval;
    let below = result.point_estimate - ci.lower;
    let above = ci.upper - result.point_estimate;
    assert!(below > 0.0 && above > 0.0);
    assert!((below - above).abs() < 0.2 * ci.width(), "below {} above {}", below, above);
}

#[test]
fn test_mde_and_sample_size_inverse() {
    let calc = PowerCalculator::new(0.05, 0.8);
    let n = 25_000;
    let mde = calc.minimum_detectable_effect(0.24, n, 0.24, n).unwrap();
    let back = calc.required_sample_size(0.24, 0.24, mde).unwrap();
    assert!((back as i64 - n as i64).abs() <= 1);
}
