//! Column classification.
//!
//! Forward-return columns are named by their holding period (`"1"`, `"5"`,
//! `"10"`), which lets a table mix return columns with auxiliary columns such
//! as `factor`, `group` or `factor_quantile` without a fixed schema.

/// Returns true when `label` names a forward-return period column, i.e. it is
/// non-empty and made only of decimal digits.
pub fn is_period_column(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_digit())
}

/// Returns the subset of `columns` that name forward-return periods,
/// preserving the input order.
///
/// # Example
///
/// ```
/// use faro_traits::columns::forward_returns_columns;
///
/// let cols = forward_returns_columns(["1", "5", "factor", "group", "10"]);
/// assert_eq!(cols, vec!["1", "5", "10"]);
/// ```
pub fn forward_returns_columns<I, S>(columns: I) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .filter(|c| is_period_column(c.as_ref()))
        .collect()
}

/// Parses the holding period out of a period column label.
pub fn period_of(label: &str) -> Option<usize> {
    if is_period_column(label) {
        label.parse().ok()
    } else {
        None
    }
}
