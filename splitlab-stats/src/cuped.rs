//! CUPED Variance Reduction
//!
//! Regresses a pre-period covariate out of the outcome:
//!
//! ```text
//! theta      = Cov(Y, X) / Var(X)
//! Y_adjusted = Y - theta * (X - mean(X))
//! ```
//!
//! `theta` must be estimated on the pooled sample (both arms together) so the
//! adjustment is identical across arms and the treatment effect is unbiased.

use crate::summary::{mean, sample_covariance, sample_variance};
use thiserror::Error;

/// Errors from [`cuped_adjust`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CupedError {
    #[error("Outcome and covariate lengths differ: {outcome} vs {covariate}")]
    LengthMismatch { outcome: usize, covariate: usize },
}

/// Result of a CUPED adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct CupedAdjustment {
    /// Regression coefficient, 0 when the covariate has no variance
    pub theta: f64,
    /// Mean of the covariate over the pooled sample
    pub covariate_mean: f64,
    /// Adjusted outcome, aligned with the input
    pub adjusted: Vec<f64>,
}

/// Adjust `y` using covariate `x`.
///
/// With a constant (or single-valued) covariate `theta` is 0 and the outcome
/// is returned unchanged. An empty input yields an empty adjustment.
pub fn cuped_adjust(y: &[f64], x: &[f64]) -> Result<CupedAdjustment, CupedError> {
    if y.len() != x.len() {
        return Err(CupedError::LengthMismatch {
            outcome: y.len(),
            covariate: x.len(),
        });
    }

    let covariate_mean = mean(x).unwrap_or(0.0);
    let theta = match (sample_covariance(y, x), sample_variance(x)) {
        (Some(cov), Some(var)) if var > 0.0 => cov / var,
        _ => 0.0,
    };

    let adjusted = y
        .iter()
        .zip(x)
        .map(|(yi, xi)| yi - theta * (xi - covariate_mean))
        .collect();

    Ok(CupedAdjustment {
        theta,
        covariate_mean,
        adjusted,
    })
}

/// Variance reduction achieved by an adjustment, as a fraction in `[0, 1]`
/// for any useful covariate.
///
/// Each argument holds one slice per arm. The per-arm sample variances are
/// averaged, then `1 - adjusted / raw` is returned. `None` when the raw
/// variance is zero or undefined.
pub fn variance_reduction(raw: &[&[f64]], adjusted: &[&[f64]]) -> Option<f64> {
    let raw_var = pooled_variance(raw)?;
    let adj_var = pooled_variance(adjusted)?;
    if raw_var <= 0.0 {
        return None;
    }
    Some(1.0 - adj_var / raw_var)
}

fn pooled_variance(groups: &[&[f64]]) -> Option<f64> {
    let variances: Vec<f64> = groups.iter().filter_map(|g| sample_variance(g)).collect();
    mean(&variances)
}
