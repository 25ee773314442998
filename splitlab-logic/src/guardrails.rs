//! Guardrail Validation
//!
//! Checks on experiment mechanics that gate whether significance results may
//! be trusted. A failing guardrail never aborts the analysis; it is reported
//! next to the results and flips the report's `trustworthy` flag.

use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use splitlab_core::{Assignment, UserId, UserOutcome, Variant};
use splitlab_stats::chi_square_1df_sf;
use tracing::warn;

/// Significance level the SRM interpretation line is phrased against
const SRM_REPORT_ALPHA: f64 = 0.05;

/// Inputs of the guardrail checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardrailConfig {
    /// Expected share of users in variant B
    pub expected_split: f64,
    /// SRM fails when |z| exceeds this
    pub srm_threshold: f64,
    /// Window every outcome must have been measured over
    pub window_days: u32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            expected_split: 0.5,
            srm_threshold: 3.0,
            window_days: 28,
        }
    }
}

/// Guardrail execution status.
///
/// `Skipped` covers checks with nothing to evaluate (e.g. SRM on an empty
/// population); it does not make the report untrustworthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GuardrailStatus {
    Passed,
    Failed,
    /// Nothing to evaluate
    Skipped { reason: String },
}

impl GuardrailStatus {
    /// Only `Failed` counts against trust
    pub fn is_failure(&self) -> bool {
        matches!(self, GuardrailStatus::Failed)
    }
}

/// One named guardrail outcome with a human-readable interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailCheck {
    pub id: String,
    #[serde(flatten)]
    pub status: GuardrailStatus,
    pub message: String,
}

/// Result of all guardrail checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailReport {
    pub users_a: u64,
    pub users_b: u64,
    pub expected_split: f64,
    /// (n_B - N r) / sqrt(N r (1 - r))
    pub srm_z: Option<f64>,
    pub srm_chi2: Option<f64>,
    pub srm_p_value: Option<f64>,
    pub srm_pass: bool,
    /// Users seen under more than one variant across the assignment history
    pub contamination_count: u64,
    pub contamination_pass: bool,
    /// Distinct window lengths found across outcomes
    pub window_days_observed: Vec<u32>,
    pub exposure_equal_pass: bool,
    pub checks: Vec<GuardrailCheck>,
}

impl GuardrailReport {
    /// Whether every guardrail passed (or was skipped)
    pub fn all_pass(&self) -> bool {
        self.srm_pass && self.contamination_pass && self.exposure_equal_pass
    }

    /// Checks that failed
    pub fn failures(&self) -> impl Iterator<Item = &GuardrailCheck> {
        self.checks.iter().filter(|c| c.status.is_failure())
    }
}

/// Run the SRM, contamination and exposure-equality checks.
///
/// `history` is the full assignment history (it may list a user more than
/// once); `outcomes` is the analysed population.
pub fn validate_guardrails(
    history: &[Assignment],
    outcomes: &[UserOutcome],
    config: &GuardrailConfig,
) -> GuardrailReport {
    let users_b = outcomes.iter().filter(|o| o.variant == Variant::B).count() as u64;
    let users_a = outcomes.len() as u64 - users_b;

    let srm = sample_ratio_mismatch(users_a, users_b, config.expected_split);
    let srm_check = srm_check(&srm, config);

    let contaminated = contaminated_users(history);
    let contamination_count = contaminated.len() as u64;
    let contamination_check = GuardrailCheck {
        id: "contamination".to_string(),
        status: if contamination_count == 0 {
            GuardrailStatus::Passed
        } else {
            GuardrailStatus::Failed
        },
        message: if contamination_count == 0 {
            "No user assigned to more than one variant".to_string()
        } else {
            format!(
                "{} user(s) assigned to more than one variant",
                contamination_count
            )
        },
    };

    let window_days_observed: Vec<u32> = outcomes
        .iter()
        .map(|o| o.window_days)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let exposure_equal = window_days_observed
        .iter()
        .all(|&days| days == config.window_days);
    let exposure_check = GuardrailCheck {
        id: "exposure_window".to_string(),
        status: if exposure_equal {
            GuardrailStatus::Passed
        } else {
            GuardrailStatus::Failed
        },
        message: if exposure_equal {
            format!("Every user observed over {} days", config.window_days)
        } else {
            format!(
                "Unequal exposure windows {:?}, expected {} days",
                window_days_observed, config.window_days
            )
        },
    };

    let checks = vec![srm_check, contamination_check, exposure_check];
    for check in checks.iter().filter(|c| c.status.is_failure()) {
        warn!(guardrail = %check.id, "{}", check.message);
    }

    GuardrailReport {
        users_a,
        users_b,
        expected_split: config.expected_split,
        srm_z: srm.z,
        srm_chi2: srm.chi2,
        srm_p_value: srm.p_value,
        srm_pass: !checks[0].status.is_failure(),
        contamination_count,
        contamination_pass: contamination_count == 0,
        window_days_observed,
        exposure_equal_pass: exposure_equal,
        checks,
    }
}

/// SRM statistics for observed arm sizes against an expected B share
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrmStatistics {
    pub z: Option<f64>,
    pub chi2: Option<f64>,
    pub p_value: Option<f64>,
}

/// One-sample proportion test of `users_b / N` against `expected_split`.
///
/// With two categories the chi-square goodness-of-fit statistic is `z²`.
pub fn sample_ratio_mismatch(users_a: u64, users_b: u64, expected_split: f64) -> SrmStatistics {
    let total = (users_a + users_b) as f64;
    let variance = total * expected_split * (1.0 - expected_split);
    if total == 0.0 || !(variance > 0.0) {
        return SrmStatistics {
            z: None,
            chi2: None,
            p_value: None,
        };
    }
    let z = (users_b as f64 - total * expected_split) / variance.sqrt();
    let chi2 = z * z;
    SrmStatistics {
        z: Some(z),
        chi2: Some(chi2),
        p_value: Some(chi_square_1df_sf(chi2)),
    }
}

fn srm_check(srm: &SrmStatistics, config: &GuardrailConfig) -> GuardrailCheck {
    let (status, message) = match (srm.z, srm.p_value) {
        (Some(z), Some(p)) if z.abs() > config.srm_threshold => (
            GuardrailStatus::Failed,
            format!(
                "Sample ratio mismatch: |z| = {:.2} > {:.2} (p = {:.4})",
                z.abs(),
                config.srm_threshold,
                p
            ),
        ),
        (Some(_), Some(p)) if p > SRM_REPORT_ALPHA => {
            (GuardrailStatus::Passed, "No SRM (p > 0.05)".to_string())
        }
        (Some(z), Some(p)) => (
            GuardrailStatus::Passed,
            format!(
                "Potential SRM (p = {:.4}) but |z| = {:.2} within threshold {:.2}",
                p,
                z.abs(),
                config.srm_threshold
            ),
        ),
        _ => (
            GuardrailStatus::Skipped {
                reason: "no users to compare".to_string(),
            },
            "SRM not evaluated: no users".to_string(),
        ),
    };
    GuardrailCheck {
        id: "srm".to_string(),
        status,
        message,
    }
}

/// Users that appear under more than one variant, ascending
pub fn contaminated_users(history: &[Assignment]) -> Vec<UserId> {
    let mut seen: FxHashMap<UserId, Variant> = FxHashMap::default();
    let mut contaminated: FxHashSet<UserId> = FxHashSet::default();
    for assignment in history {
        match seen.get(&assignment.user_id) {
            Some(&variant) if variant != assignment.variant => {
                contaminated.insert(assignment.user_id);
            }
            Some(_) => {}
            None => {
                seen.insert(assignment.user_id, assignment.variant);
            }
        }
    }
    let mut users: Vec<UserId> = contaminated.into_iter().collect();
    users.sort_unstable();
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
    }

    fn assignment(user_id: UserId, variant: Variant) -> Assignment {
        Assignment {
            user_id,
            variant,
            assigned_at: day0(),
        }
    }

    fn outcome(user_id: UserId, variant: Variant, window_days: u32) -> UserOutcome {
        UserOutcome {
            user_id,
            variant,
            assigned_at: day0(),
            window_days,
            events_in_window: 0,
            volume_in_window: 0,
            converted: false,
            retained: BTreeMap::new(),
            pre_events: 0,
            pre_volume: 0,
        }
    }

    fn population(a: u64, b: u64) -> (Vec<Assignment>, Vec<UserOutcome>) {
        let mut history = Vec::new();
        let mut outcomes = Vec::new();
        for id in 0..a + b {
            let variant = if id < a { Variant::A } else { Variant::B };
            history.push(assignment(id, variant));
            outcomes.push(outcome(id, variant, 28));
        }
        (history, outcomes)
    }

    #[test]
    fn test_balanced_population_passes() {
        let (history, outcomes) = population(500, 500);
        let report = validate_guardrails(&history, &outcomes, &GuardrailConfig::default());

        assert_eq!(report.srm_z, Some(0.0));
        assert!((report.srm_p_value.unwrap() - 1.0).abs() < 1e-12);
        assert!(report.all_pass());
        assert_eq!(report.checks[0].message, "No SRM (p > 0.05)");
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_srm_detected() {
        let (history, outcomes) = population(600, 400);
        let report = validate_guardrails(&history, &outcomes, &GuardrailConfig::default());

        // z = (400 - 500) / sqrt(250)
        let z = report.srm_z.unwrap();
        assert!((z + 6.3246).abs() < 1e-3);
        assert!((report.srm_chi2.unwrap() - 40.0).abs() < 1e-9);
        assert!(!report.srm_pass);
        assert!(!report.all_pass());
    }

    #[test]
    fn test_srm_against_uneven_split() {
        let (history, outcomes) = population(800, 200);
        let config = GuardrailConfig {
            expected_split: 0.2,
            ..Default::default()
        };
        let report = validate_guardrails(&history, &outcomes, &config);
        assert_eq!(report.srm_z, Some(0.0));
        assert!(report.srm_pass);
    }

    #[test]
    fn test_injected_contamination_detected() {
        let (mut history, outcomes) = population(10, 10);
        history.push(assignment(3, Variant::B));
        history.push(assignment(3, Variant::B));
        history.push(assignment(15, Variant::A));
        // repeated row with the same variant is not contamination
        history.push(assignment(7, Variant::A));

        let report = validate_guardrails(&history, &outcomes, &GuardrailConfig::default());
        assert_eq!(report.contamination_count, 2);
        assert!(!report.contamination_pass);
        assert!(!report.all_pass());
        assert_eq!(contaminated_users(&history), vec![3, 15]);
    }

    #[test]
    fn test_unequal_exposure_detected() {
        let (history, mut outcomes) = population(5, 5);
        outcomes[9].window_days = 14;
        let report = validate_guardrails(&history, &outcomes, &GuardrailConfig::default());

        assert!(!report.exposure_equal_pass);
        assert_eq!(report.window_days_observed, vec![14, 28]);
        assert!(report.srm_pass);
    }

    #[test]
    fn test_empty_population_skips_srm() {
        let report = validate_guardrails(&[], &[], &GuardrailConfig::default());
        assert_eq!(report.srm_z, None);
        assert!(matches!(
            report.checks[0].status,
            GuardrailStatus::Skipped { .. }
        ));
        assert!(report.all_pass());
    }
}
