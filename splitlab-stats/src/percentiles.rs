//! Percentile Computation
//!
//! Linear interpolation between closest ranks, the same convention the
//! percentile bootstrap reports its bounds with.

/// Compute a single percentile (0-100) from samples
///
/// # Examples
///
/// ```ignore
/// # use splitlab_stats::compute_percentile;
/// let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let p50 = compute_percentile(&samples, 50.0);  // Median
/// let p975 = compute_percentile(&samples, 97.5);
/// ```
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_of_sorted(&sorted, percentile)
}

/// Same as [`compute_percentile`] for data that is already sorted ascending
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let n = sorted.len();
    let p = (percentile / 100.0).clamp(0.0, 1.0);

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((compute_percentile(&samples, 50.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolates_between_ranks() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        // rank = 0.025 * 99 = 2.475 -> 3 + 0.475
        assert!((compute_percentile(&samples, 2.5) - 3.475).abs() < 1e-9);
        assert!((compute_percentile(&samples, 97.5) - 97.525).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        assert!((compute_percentile(&[42.0], 5.0) - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_samples() {
        assert!((compute_percentile(&[], 50.0) - 0.0).abs() < f64::EPSILON);
    }
}
