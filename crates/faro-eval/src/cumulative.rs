//! Compounding of multi-period returns and per-period conversions.

use faro_traits::{FaroError, Result};

/// Average one-period growth rate of an `period`-period return.
///
/// # Examples
///
/// ```
/// use faro_eval::rate_of_return;
///
/// assert!((rate_of_return(0.21, 2) - 0.1).abs() < 1e-12);
/// ```
pub fn rate_of_return(period_return: f64, period: usize) -> f64 {
    (1.0 + period_return).powf(1.0 / period as f64) - 1.0
}

/// One-period approximation of a `period`-period standard deviation (or
/// standard error).
pub fn std_conversion(period_std: f64, period: usize) -> f64 {
    period_std / (period as f64).sqrt()
}

/// Cumulative growth of one unit invested in returns measured over `period`
/// rows.
///
/// Missing returns count as zero. With `period = 1` the returns are simply
/// compounded. Otherwise `period` interleaved sub-portfolios are built, the
/// `k`-th starting at row `k` and rebalancing every `period` rows. Each
/// holds the most recent `period`-row return of its phase, converted to a
/// one-row rate, and the result is the mean growth across sub-portfolios.
pub fn cumulative_returns(returns: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 {
        return Err(FaroError::Configuration(
            "cumulative returns need a positive period".to_string(),
        ));
    }

    let returns: Vec<f64> = returns
        .iter()
        .map(|r| if r.is_finite() { *r } else { 0.0 })
        .collect();

    if period == 1 {
        return Ok(returns
            .iter()
            .scan(1.0, |growth, r| {
                *growth *= 1.0 + r;
                Some(*growth)
            })
            .collect());
    }

    let mut growth = vec![1.0; period];
    let mut cumulative = Vec::with_capacity(returns.len());
    for t in 0..returns.len() {
        for (phase, g) in growth.iter_mut().enumerate() {
            if t < phase {
                continue;
            }
            let entry = t - (t - phase) % period;
            *g *= 1.0 + rate_of_return(returns[entry], period);
        }
        cumulative.push(growth.iter().sum::<f64>() / period as f64);
    }

    Ok(cumulative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_period_compounds() {
        let cumulative = cumulative_returns(&[0.1, f64::NAN, -0.5], 1).unwrap();
        assert_relative_eq!(cumulative[0], 1.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[1], 1.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[2], 0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_interleaved_sub_portfolios() {
        let cumulative = cumulative_returns(&[0.21; 4], 2).unwrap();
        // Phase 0 grows from row 0, phase 1 only from row 1.
        assert_relative_eq!(cumulative[0], (1.1 + 1.0) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(cumulative[3], (1.4641 + 1.331) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_period() {
        assert!(matches!(
            cumulative_returns(&[0.1], 0),
            Err(FaroError::Configuration(_))
        ));
    }

    #[test]
    fn test_conversions() {
        assert_relative_eq!(rate_of_return(0.21, 2), 0.1, epsilon = 1e-12);
        assert_relative_eq!(rate_of_return(0.05, 1), 0.05, epsilon = 1e-12);
        assert_relative_eq!(std_conversion(0.2, 4), 0.1, epsilon = 1e-12);
    }
}
