//! Small descriptive statistics used by the fitter and reports.
//!
//! All functions ignore nothing: callers are expected to pass finite values.

use std::cmp::Ordering;

/// Percentile `p` (0–100) of `values` using linear interpolation between
/// closest ranks: `rank = p / 100 * (n - 1)`.
///
/// Returns `None` for empty input or `p` outside `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(percentile_sorted(&sorted, p))
}

/// Same as [`percentile`] for data that is already sorted ascending and non-empty.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared differences between two equal-length slices.
pub fn sum_squared_residuals(predicted: &[f64], observed: &[f64]) -> f64 {
    predicted
        .iter()
        .zip(observed.iter())
        .map(|(p, o)| (p - o) * (p - o))
        .sum()
}

/// `(min, max)` of the slice, or `None` when empty.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut it = values.iter().copied();
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let t: Vec<f64> = (0..9).map(f64::from).collect();
        assert!((percentile(&t, 10.0).unwrap() - 0.8).abs() < 1e-12);
        assert!((percentile(&t, 40.0).unwrap() - 3.2).abs() < 1e-12);
        assert!((percentile(&t, 80.0).unwrap() - 6.4).abs() < 1e-12);
        assert_eq!(percentile(&t, 0.0), Some(0.0));
        assert_eq!(percentile(&t, 100.0), Some(8.0));
    }

    #[test]
    fn percentile_ignores_input_order() {
        let a = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((percentile(&a, 50.0).unwrap() - 3.0).abs() < 1e-12);
        assert!((percentile(&a, 10.0).unwrap() - 1.4).abs() < 1e-12);
    }

    #[test]
    fn percentile_edge_cases() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[2.0], 90.0), Some(2.0));
        assert_eq!(percentile(&[1.0, 2.0], 101.0), None);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(5.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn min_max_basic() {
        assert_eq!(min_max(&[3.0, -1.0, 8.0]), Some((-1.0, 8.0)));
        assert_eq!(min_max(&[]), None);
    }
}
