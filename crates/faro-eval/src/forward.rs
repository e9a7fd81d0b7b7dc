//! Forward return computation.
//!
//! The forward return stored at date `D` for period `P` is the percent change
//! from `D` to `D + P`. Attributing the return back to `D` is what lets a
//! factor computed from information available at `D` be compared with the
//! return that followed it, without lookahead bias.

use faro_traits::stats::{nan_mean, nan_std};
use faro_traits::{Asset, Date, FaroError, ForwardReturns, PricePanel, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Configuration for forward return computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturnsConfig {
    /// Holding periods, in rows of the price panel.
    pub periods: Vec<usize>,
    /// Outlier threshold in standard deviations. Returns further than this
    /// from their mean are set to missing.
    ///
    /// Caution: the filter looks at the whole return history, so it
    /// introduces lookahead bias. Use it to suppress bad prints, never to
    /// build a signal.
    pub filter_zscore: Option<f64>,
}

impl Default for ForwardReturnsConfig {
    fn default() -> Self {
        Self {
            periods: vec![1, 5, 10],
            filter_zscore: Some(20.0),
        }
    }
}

/// Checks that `periods` is non-empty, positive and free of duplicates.
pub fn validate_periods(periods: &[usize]) -> Result<()> {
    if periods.is_empty() {
        return Err(FaroError::Configuration(
            "at least one forward return period is required".to_string(),
        ));
    }
    if periods.contains(&0) {
        return Err(FaroError::Configuration(
            "forward return periods must be positive".to_string(),
        ));
    }
    let distinct: HashSet<usize> = periods.iter().copied().collect();
    if distinct.len() != periods.len() {
        return Err(FaroError::Configuration(format!(
            "forward return periods must be distinct, got {periods:?}"
        )));
    }
    Ok(())
}

/// Forward percent change over `period` rows, stored at the earlier row.
///
/// The last `period` rows are `NaN`, as are returns whose endpoint prices
/// are missing or whose ratio is not finite. Missing prices are not padded
/// from the last valid price, so a gap at either end of the window yields
/// `NaN` rather than a return measured from a stale price.
pub fn forward_pct_change(prices: &PricePanel, period: usize) -> Array2<f64> {
    let values = prices.values();
    let (n_dates, n_assets) = values.dim();
    Array2::from_shape_fn((n_dates, n_assets), |(i, j)| {
        if i + period >= n_dates {
            return f64::NAN;
        }
        let change = values[[i + period, j]] / values[[i, j]] - 1.0;
        if change.is_finite() { change } else { f64::NAN }
    })
}

/// Sets to `NaN` every value further than `zscore` standard deviations from
/// its asset's mean. Statistics are computed per asset over the whole date
/// axis, before any value is removed.
pub fn filter_outliers(returns: &mut Array2<f64>, zscore: f64) -> usize {
    let mut removed = 0;
    for mut column in returns.columns_mut() {
        let values = column.to_vec();
        let mean = nan_mean(&values);
        let std = nan_std(&values);
        if !std.is_finite() {
            continue;
        }

        let limit = zscore * std;
        for v in column.iter_mut() {
            if v.is_finite() && (*v - mean).abs() > limit {
                *v = f64::NAN;
                removed += 1;
            }
        }
    }
    removed
}

/// Computes forward returns for each period in `periods`.
///
/// The output has one row per `(date, asset)` pair of the panel, date-major,
/// and one column per period, named by its length.
///
/// # Arguments
///
/// * `prices` - Wide price panel; must extend at least `max(periods)` rows
///   past the last date of interest
/// * `periods` - Positive, distinct holding periods
/// * `filter_zscore` - Optional outlier threshold (introduces lookahead bias)
///
/// # Example
///
/// ```rust,ignore
/// use faro_eval::compute_forward_returns;
///
/// let returns = compute_forward_returns(&prices, &[1, 5, 10], None)?;
/// let one_day = returns.period_column(1);
/// ```
pub fn compute_forward_returns(
    prices: &PricePanel,
    periods: &[usize],
    filter_zscore: Option<f64>,
) -> Result<ForwardReturns> {
    validate_periods(periods)?;
    if let Some(z) = filter_zscore
        && !(z.is_finite() && z > 0.0)
    {
        return Err(FaroError::Configuration(format!(
            "filter_zscore must be a positive number, got {z}"
        )));
    }

    let n_dates = prices.n_dates();
    let n_assets = prices.n_assets();
    let n_rows = n_dates * n_assets;
    let mut values = Array2::from_elem((n_rows, periods.len()), f64::NAN);

    for (k, &period) in periods.iter().enumerate() {
        let mut delta = forward_pct_change(prices, period);

        if let Some(z) = filter_zscore {
            let removed = filter_outliers(&mut delta, z);
            debug!(period, removed, "filtered forward return outliers");
        }

        for ((i, j), v) in delta.indexed_iter() {
            values[[i * n_assets + j, k]] = *v;
        }
    }

    let mut dates: Vec<Date> = Vec::with_capacity(n_rows);
    let mut assets: Vec<Asset> = Vec::with_capacity(n_rows);
    for date in prices.dates() {
        for asset in prices.assets() {
            dates.push(*date);
            assets.push(asset.clone());
        }
    }

    debug!(
        rows = n_rows,
        periods = ?periods,
        "computed forward returns"
    );

    Ok(ForwardReturns::new(dates, assets, periods.to_vec(), values)?
        .with_timezone(prices.timezone()))
}
