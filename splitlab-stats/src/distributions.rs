//! Reference Distributions
//!
//! Standard normal, Student's t and one-degree-of-freedom chi-square, enough
//! to turn z, t and SRM statistics into p-values and critical values. The
//! distribution functions come from `statrs`; this module only fixes the
//! parameterisation and the behavior at the edges of the domain.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// Student t with more degrees of freedom than this is evaluated as normal
const NORMAL_APPROX_DF: f64 = 50_000.0;

fn standard_normal(eval: impl FnOnce(&Normal) -> f64) -> f64 {
    Normal::new(0.0, 1.0).map(|n| eval(&n)).unwrap_or(f64::NAN)
}

fn students_t(df: f64) -> Option<StudentsT> {
    StudentsT::new(0.0, 1.0, df).ok()
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    standard_normal(|n| n.cdf(x))
}

/// Standard normal survival function, `1 - cdf(x)` without cancellation
pub fn normal_sf(x: f64) -> f64 {
    standard_normal(|n| n.sf(x))
}

/// Standard normal quantile (inverse CDF); infinite at 0 and 1
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    standard_normal(|n| n.inverse_cdf(p))
}

/// Two-sided p-value of a z statistic
pub fn normal_two_sided_p(z: f64) -> f64 {
    (2.0 * normal_sf(z.abs())).min(1.0)
}

/// Student t CDF with `df` degrees of freedom (real-valued df allowed).
///
/// `None` when `df` is not a positive number.
pub fn student_t_cdf(t: f64, df: f64) -> Option<f64> {
    if df > NORMAL_APPROX_DF {
        return Some(normal_cdf(t));
    }
    students_t(df).map(|dist| dist.cdf(t))
}

/// Two-sided p-value of a t statistic, `None` for an invalid `df`
pub fn student_t_two_sided_p(t: f64, df: f64) -> Option<f64> {
    if df > NORMAL_APPROX_DF {
        return Some(normal_two_sided_p(t));
    }
    students_t(df).map(|dist| (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Student t quantile, `None` for an invalid `df`
pub fn student_t_quantile(p: f64, df: f64) -> Option<f64> {
    if df > NORMAL_APPROX_DF {
        return Some(normal_quantile(p));
    }
    let dist = students_t(df)?;
    Some(if p.is_nan() {
        f64::NAN
    } else if p <= 0.0 {
        f64::NEG_INFINITY
    } else if p >= 1.0 {
        f64::INFINITY
    } else {
        dist.inverse_cdf(p)
    })
}

/// Upper tail of the chi-square distribution with one degree of freedom
pub fn chi_square_1df_sf(x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    ChiSquared::new(1.0)
        .map(|dist| dist.sf(x))
        .unwrap_or(f64::NAN)
}
