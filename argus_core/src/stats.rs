// argus_core/src/stats.rs

//! Descriptive statistics used by the referential build.
//!
//! Every function is pure and stateless. Functions that cannot produce a meaningful
//! answer for their input (empty slices, degenerate regressions) return `None` and
//! leave the fallback decision to the caller.
//!
//! Currently implemented:
//! - Arithmetic mean (`mean`)
//! - Median (`median`)
//! - Quantile with linear interpolation between closest ranks (`quantile`)
//! - Mode with smallest-value tie break (`mode`)
//! - Ordinary least-squares slope of y on x (`ols_slope`)

use itertools::Itertools;

/// Computes the **arithmetic mean** of `values`.
///
/// # Returns
/// * `Some(f64)` - The mean.
/// * `None` - If `values` is empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() { return None; }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Computes the **median** of `values`.
/// For an even count the two middle values are averaged.
///
/// # Returns
/// * `Some(f64)` - The median.
/// * `None` - If `values` is empty.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Computes the `q`-th **quantile** of `values`, `q` in [0, 1].
///
/// The rank is `q * (n - 1)`; when it falls between two sorted values the result is
/// interpolated linearly between them.
///
/// # Arguments
/// * `values` - Unsorted sample.
/// * `q` - Quantile level. Values outside [0, 1] are clamped.
///
/// # Returns
/// * `Some(f64)` - The quantile.
/// * `None` - If `values` is empty.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() { return None; }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n == 1 { return Some(sorted[0]); }

    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let frac = rank - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
    }
}

/// Returns the most frequent value. Ties resolve to the smallest value.
///
/// # Returns
/// * `Some(T)` - The mode.
/// * `None` - If the iterator is empty.
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Ord + Copy + std::hash::Hash,
    I: IntoIterator<Item = T>,
{
    values
        .into_iter()
        .counts()
        .into_iter()
        .max_by(|(value_a, count_a), (value_b, count_b)| {
            count_a.cmp(count_b).then_with(|| value_b.cmp(value_a))
        })
        .map(|(value, _)| value)
}

/// Fits `y = a + b * x` by ordinary least squares and returns the slope `b`.
///
/// # Arguments
/// * `points` - `(x, y)` observations.
///
/// # Returns
/// * `Some(f64)` - The slope.
/// * `None` - If fewer than two points are given, `x` has no variance, or the
///   result is not finite.
pub fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 { return None; }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxy, sxx) = points
        .iter()
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

    if sxx <= f64::EPSILON * mean_x.abs().max(1.0) { return None; }

    let slope = sxy / sxx;
    slope.is_finite().then_some(slope)
}

/// Rounds `value` to `decimals` decimal places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10.0_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[5.0]), Some(5.0));
        assert!((mean(&[2.0, 4.0, 6.0]).unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 5.0, 2.0, 4.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        // Sorted: [1, 2, 3, 4, 5, 6, 7, 8]. q=0.25 -> rank 1.75 -> 2.75
        let values: Vec<f64> = (1..=8).map(|x| x as f64).collect();
        assert!((quantile(&values, 0.25).unwrap() - 2.75).abs() < 1e-10);
        assert!((quantile(&values, 0.75).unwrap() - 6.25).abs() < 1e-10);
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(8.0));
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(vec![90u32, 110, 110, 90, 130]), Some(90));
        assert_eq!(mode(vec![75u32, 110, 110]), Some(110));
        assert_eq!(mode(Vec::<u32>::new()), None);
    }

    #[test]
    fn test_ols_slope_exact_line() {
        // price = 20000 - 0.1 * km
        let points: Vec<(f64, f64)> = [10_000.0, 40_000.0, 80_000.0, 120_000.0]
            .iter()
            .map(|&km| (km, 20_000.0 - 0.1 * km))
            .collect();
        assert!((ols_slope(&points).unwrap() + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_ols_slope_degenerate() {
        assert_eq!(ols_slope(&[(1.0, 2.0)]), None);
        assert_eq!(ols_slope(&[(50_000.0, 9000.0), (50_000.0, 11000.0), (50_000.0, 10000.0)]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(-0.0123456, 5), -0.01235);
        assert_eq!(round_to(-0.05, 5), -0.05);
    }
}
