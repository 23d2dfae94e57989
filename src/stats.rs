//! Statistical kernels shared by every analysis.
//!
//! All functions are pure and return `None` when a statistic is undefined
//! (too few values, zero variance, non-finite result) instead of a
//! placeholder number.

/// Correlations are clamped into this range so that downstream
/// t-statistics never divide by zero.
pub const MAX_CORRELATION: f64 = 0.99;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Mean and population standard deviation in one pass over the slice
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    Some((mean(values)?, std_dev(values)?))
}

/// Median (average of the two middle values for even lengths)
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Calculate Pearson correlation coefficient
///
/// Returns a value between -1 and 1, or `None` when the inputs differ in
/// length, are empty, have zero variance or produce a non-finite result.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }

    let n = x.len() as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

/// Clamp a correlation coefficient into [-0.99, 0.99]
pub fn clamp_correlation(r: f64) -> f64 {
    r.clamp(-MAX_CORRELATION, MAX_CORRELATION)
}

/// t-statistic for a correlation coefficient over `n` pairs
pub fn t_statistic(r: f64, n: usize) -> f64 {
    let r = clamp_correlation(r);
    let df = n.saturating_sub(2) as f64;
    r * (df / (1.0 - r * r)).sqrt()
}

/// Heuristic two-sided significance for a correlation.
///
/// Uses the closed-form approximation p ≈ exp(-0.717|t| - 0.416t²) of the
/// normal tail. It is a ranking signal, not a calibrated p-value: smaller
/// means more confident.
pub fn approximate_significance(r: f64, n: usize) -> f64 {
    let t = t_statistic(r, n).abs();
    (-0.717 * t - 0.416 * t * t).exp().clamp(0.0, 1.0)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_correlation_perfect_positive() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let r = pearson_correlation(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_correlation_perfect_negative() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![10.0, 8.0, 6.0, 4.0, 2.0];
        let r = pearson_correlation(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_correlation_is_symmetric() {
        let x = vec![3.0, 1.0, 4.0, 1.5, 5.0, 9.0, 2.0];
        let y = vec![2.0, 7.0, 1.0, 8.0, 2.5, 8.0, 1.0];
        let xy = pearson_correlation(&x, &y).unwrap();
        let yx = pearson_correlation(&y, &x).unwrap();
        assert!((xy - yx).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_correlation_undefined() {
        assert_eq!(pearson_correlation(&[], &[]), None);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), None);
        // Zero variance
        assert_eq!(
            pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            None
        );
        assert_eq!(
            pearson_correlation(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]),
            None
        );
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(std_dev(&values), Some(2.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_clamp_correlation() {
        assert_eq!(clamp_correlation(1.0), 0.99);
        assert_eq!(clamp_correlation(-1.0), -0.99);
        assert_eq!(clamp_correlation(0.42), 0.42);
    }

    #[test]
    fn test_significance_monotonic() {
        let weak = approximate_significance(0.3, 10);
        let strong = approximate_significance(0.9, 10);
        let strong_many = approximate_significance(0.9, 100);
        assert!(strong < weak);
        assert!(strong_many < strong);
        assert!((0.0..=1.0).contains(&weak));
        // Perfect correlation stays finite thanks to clamping
        assert!(approximate_significance(1.0, 30).is_finite());
    }
}
