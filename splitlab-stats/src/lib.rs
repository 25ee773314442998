#![warn(missing_docs)]
//! Splitlab Statistical Engine
//!
//! Inference over per-user experiment outcomes:
//! - Two-proportion z-test and Welch's t-test behind one [`SignificanceTest`] contract
//! - CUPED variance reduction with a pre-period covariate
//! - Seeded, parallel percentile bootstrap for per-variant and difference CIs
//! - Closed-form power, MDE and sample-size analysis
//! - Normal, Student t and chi-square reference distributions

pub mod bootstrap;
pub mod cuped;
pub mod distributions;
mod percentiles;
pub mod power;
pub mod significance;
mod summary;

pub use bootstrap::{
    bootstrap_difference, bootstrap_distribution, compute_bootstrap, percentile_interval,
    BootstrapConfig, BootstrapError, BootstrapResult, ConfidenceInterval,
};
pub use cuped::{cuped_adjust, variance_reduction, CupedAdjustment, CupedError};
pub use distributions::{
    chi_square_1df_sf, normal_cdf, normal_quantile, normal_two_sided_p, student_t_quantile,
    student_t_two_sided_p,
};
pub use percentiles::{compute_percentile, percentile_of_sorted};
pub use power::{
    achievable_power, minimum_detectable_effect, required_sample_size, PowerCalculator,
    PowerResult,
};
pub use significance::{
    lift, welch_degrees_of_freedom, SignificanceResult, SignificanceTest, TestConfig, TestKind,
    TwoProportionZTest, WelchTTest,
};
pub use summary::{mean, proportion, sample_covariance, sample_variance, ArmStatistics};

/// Default number of bootstrap replicates
pub const DEFAULT_BOOTSTRAP_REPLICATES: usize = 2_000;

/// Default confidence level (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
