//! Missing-value aware statistics.
//!
//! Missing values are represented as `NaN`. Every helper here skips them, so a
//! column with a few holes still yields a usable mean or standard deviation.

/// Mean of the finite values in `values`, or `NaN` when there are none.
///
/// # Examples
///
/// ```
/// use faro_traits::stats::nan_mean;
///
/// assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
/// assert!(nan_mean(&[f64::NAN]).is_nan());
/// ```
pub fn nan_mean(values: &[f64]) -> f64 {
    nan_mean_iter(values.iter().copied())
}

/// Mean of the finite values produced by `values`, or `NaN` when there are none.
pub fn nan_mean_iter<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));

    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (N-1 denominator) of the finite values in
/// `values`. Returns `NaN` with fewer than two finite observations.
pub fn nan_std(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    let n = finite.len();
    if n < 2 {
        return f64::NAN;
    }

    let mean = finite.iter().sum::<f64>() / n as f64;
    let variance = finite.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Linearly interpolated quantile of an ascending-sorted slice.
///
/// `q` must lie in `[0, 1]`. Position `q * (n - 1)` is interpolated between
/// its two neighbours. Returns `NaN` for an empty slice.
pub fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let frac = pos - lo as f64;
                sorted[lo] + (sorted[hi] - sorted[lo]) * frac
            }
        }
    }
}
