//! Variant Metrics
//!
//! Per-variant grouping of user outcomes, plus the per-user value vectors the
//! significance tests, CUPED and the bootstrap consume.

use serde::{Deserialize, Serialize};
use splitlab_core::{UserOutcome, Variant};
use splitlab_stats::{mean, proportion, sample_variance, ArmStatistics};

/// Retention rate at one checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionRate {
    pub day: u32,
    pub retained: u64,
    pub rate: Option<f64>,
}

/// Aggregate metrics of one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub variant: Variant,
    pub users: u64,
    pub converters: u64,
    /// converters / users, `None` for an empty variant
    pub conversion_rate: Option<f64>,
    pub mean_volume: Option<f64>,
    /// Bessel-corrected, `None` below two users
    pub variance_volume: Option<f64>,
    pub mean_events: Option<f64>,
    pub retention: Vec<RetentionRate>,
}

impl VariantMetrics {
    /// Retention rate at `day`, if that checkpoint was computed
    pub fn retention_rate(&self, day: u32) -> Option<f64> {
        self.retention
            .iter()
            .find(|r| r.day == day)
            .and_then(|r| r.rate)
    }
}

/// Metrics for both variants, A first. Variants without users are still
/// reported, with zero counts and `None` rates.
pub fn summarize_variants(outcomes: &[UserOutcome], checkpoints: &[u32]) -> Vec<VariantMetrics> {
    Variant::ALL
        .iter()
        .map(|&variant| summarize_variant(outcomes, variant, checkpoints))
        .collect()
}

fn summarize_variant(outcomes: &[UserOutcome], variant: Variant, checkpoints: &[u32]) -> VariantMetrics {
    let group: Vec<&UserOutcome> = outcomes.iter().filter(|o| o.variant == variant).collect();
    let users = group.len() as u64;
    let converters = group.iter().filter(|o| o.converted).count() as u64;

    let volume: Vec<f64> = group.iter().map(|o| o.volume_in_window as f64).collect();
    let events: Vec<f64> = group.iter().map(|o| o.events_in_window as f64).collect();

    let retention = checkpoints
        .iter()
        .map(|&day| {
            let retained = group
                .iter()
                .filter(|o| o.retained_at(day).unwrap_or(false))
                .count() as u64;
            RetentionRate {
                day,
                retained,
                rate: proportion(retained, users),
            }
        })
        .collect();

    VariantMetrics {
        variant,
        users,
        converters,
        conversion_rate: proportion(converters, users),
        mean_volume: mean(&volume),
        variance_volume: sample_variance(&volume),
        mean_events: mean(&events),
        retention,
    }
}

/// Per-user metric values of one variant, in outcome order
pub fn variant_values<F>(outcomes: &[UserOutcome], variant: Variant, metric: F) -> Vec<f64>
where
    F: Fn(&UserOutcome) -> f64,
{
    outcomes
        .iter()
        .filter(|o| o.variant == variant)
        .map(metric)
        .collect()
}

/// Conversion as 0/1 per user
pub fn conversion_value(outcome: &UserOutcome) -> f64 {
    if outcome.converted {
        1.0
    } else {
        0.0
    }
}

/// Retention at `day` as 0/1 per user
pub fn retention_value(day: u32) -> impl Fn(&UserOutcome) -> f64 {
    move |outcome: &UserOutcome| {
        if outcome.retained_at(day).unwrap_or(false) {
            1.0
        } else {
            0.0
        }
    }
}

/// Volume in window per user
pub fn volume_value(outcome: &UserOutcome) -> f64 {
    outcome.volume_in_window as f64
}

/// Pre-period volume per user, the CUPED covariate
pub fn pre_volume_value(outcome: &UserOutcome) -> f64 {
    outcome.pre_volume as f64
}

impl VariantMetrics {
    /// Sufficient statistics of the conversion proportion
    pub fn conversion_stats(&self) -> ArmStatistics {
        ArmStatistics::from_proportion(self.converters, self.users)
    }

    /// Sufficient statistics of the retention proportion at `day`
    pub fn retention_stats(&self, day: u32) -> Option<ArmStatistics> {
        self.retention
            .iter()
            .find(|r| r.day == day)
            .map(|r| ArmStatistics::from_proportion(r.retained, self.users))
    }

    /// Sufficient statistics of volume in window
    pub fn volume_stats(&self) -> ArmStatistics {
        ArmStatistics {
            n: self.users,
            mean: self.mean_volume,
            variance: self.variance_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn outcome(user_id: u64, variant: Variant, events: u64, volume: u64, first_day: Option<u32>) -> UserOutcome {
        let mut retained = BTreeMap::new();
        for day in [14, 28] {
            retained.insert(day, first_day.map(|d| d < day).unwrap_or(false));
        }
        UserOutcome {
            user_id,
            variant,
            assigned_at: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            window_days: 28,
            events_in_window: events,
            volume_in_window: volume,
            converted: events > 0,
            retained,
            pre_events: 0,
            pre_volume: 0,
        }
    }

    fn fixture() -> Vec<UserOutcome> {
        vec![
            outcome(1, Variant::A, 2, 10, Some(3)),
            outcome(2, Variant::A, 0, 0, None),
            outcome(3, Variant::A, 1, 4, Some(20)),
            outcome(4, Variant::A, 0, 0, None),
            outcome(5, Variant::B, 3, 12, Some(0)),
            outcome(6, Variant::B, 1, 6, Some(15)),
        ]
    }

    #[test]
    fn test_summarize_counts_and_rates() {
        let metrics = summarize_variants(&fixture(), &[14, 28]);
        assert_eq!(metrics.len(), 2);

        let a = &metrics[0];
        assert_eq!(a.variant, Variant::A);
        assert_eq!(a.users, 4);
        assert_eq!(a.converters, 2);
        assert_eq!(a.conversion_rate, Some(0.5));
        assert_eq!(a.mean_volume, Some(3.5));
        assert_eq!(a.retention_rate(14), Some(0.25));
        assert_eq!(a.retention_rate(28), Some(0.5));

        let b = &metrics[1];
        assert_eq!(b.conversion_rate, Some(1.0));
        assert_eq!(b.variance_volume, Some(18.0));
        assert_eq!(b.retention_rate(14), Some(0.5));
        assert_eq!(b.retention_rate(7), None);
    }

    #[test]
    fn test_rates_bounded_and_variance_non_negative() {
        let metrics = summarize_variants(&fixture(), &[14]);
        for m in &metrics {
            let rate = m.conversion_rate.unwrap();
            assert!((0.0..=1.0).contains(&rate));
            assert!(m.variance_volume.unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_empty_variant_reports_nulls() {
        let only_a: Vec<UserOutcome> = fixture()
            .into_iter()
            .filter(|o| o.variant == Variant::A)
            .collect();
        let metrics = summarize_variants(&only_a, &[14]);
        let b = &metrics[1];
        assert_eq!(b.users, 0);
        assert_eq!(b.conversion_rate, None);
        assert_eq!(b.mean_volume, None);
        assert_eq!(b.variance_volume, None);
        assert_eq!(b.retention[0].rate, None);
    }

    #[test]
    fn test_sufficient_statistics() {
        let metrics = summarize_variants(&fixture(), &[14]);
        let stats = metrics[0].conversion_stats();
        assert_eq!(stats.n, 4);
        assert_eq!(stats.mean, Some(0.5));
        assert_eq!(stats.variance, Some(0.25));

        let volume = metrics[1].volume_stats();
        assert_eq!(volume.mean, Some(9.0));
        assert!(metrics[0].retention_stats(28).is_none());
    }

    #[test]
    fn test_variant_values() {
        let outcomes = fixture();
        assert_eq!(
            variant_values(&outcomes, Variant::B, volume_value),
            vec![12.0, 6.0]
        );
        assert_eq!(
            variant_values(&outcomes, Variant::A, conversion_value),
            vec![1.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(
            variant_values(&outcomes, Variant::A, retention_value(14)),
            vec![1.0, 0.0, 0.0, 0.0]
        );
    }
}
