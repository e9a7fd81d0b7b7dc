//! Long tables keyed by `(date, asset)`: forward returns and the clean
//! factor data produced by the alignment pipeline.

use crate::columns::{forward_returns_columns, period_of};
use crate::convert::{
    key_columns, read_date_column, read_f64_column, read_str_column, read_u32_column,
};
use crate::error::{FaroError, Result};
use crate::types::{Asset, Date, KeyedRows};
use ndarray::{Array2, ArrayView1, Axis};
use polars::prelude::*;
use std::collections::HashSet;

/// Name of the raw factor value column.
pub const FACTOR_COLUMN: &str = "factor";
/// Name of the group label column.
pub const GROUP_COLUMN: &str = "group";
/// Name of the bucket id column.
pub const QUANTILE_COLUMN: &str = "factor_quantile";

/// Forward returns keyed by `(date, asset)`, one column per holding period.
///
/// The value at row `(D, A)` and period `P` is the return of `A` realized
/// from `D` to `D + P`, or `NaN` where it is undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardReturns {
    dates: Vec<Date>,
    assets: Vec<Asset>,
    periods: Vec<usize>,
    values: Array2<f64>,
    timezone: Option<String>,
}

impl ForwardReturns {
    /// Creates a table from row keys, period labels and a `rows × periods`
    /// value matrix.
    pub fn new(
        dates: Vec<Date>,
        assets: Vec<Asset>,
        periods: Vec<usize>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if dates.len() != assets.len() || values.nrows() != dates.len() {
            return Err(FaroError::InvalidData(format!(
                "forward returns have {} dates, {} assets and {} value rows",
                dates.len(),
                assets.len(),
                values.nrows()
            )));
        }
        if values.ncols() != periods.len() {
            return Err(FaroError::InvalidData(format!(
                "forward returns have {} periods but {} value columns",
                periods.len(),
                values.ncols()
            )));
        }
        let distinct: HashSet<usize> = periods.iter().copied().collect();
        if distinct.len() != periods.len() {
            return Err(FaroError::InvalidData(format!(
                "duplicate forward return periods in {periods:?}"
            )));
        }

        Ok(Self {
            dates,
            assets,
            periods,
            values,
            timezone: None,
        })
    }

    /// Sets the time-zone tag of the date axis.
    #[must_use]
    pub fn with_timezone<S: Into<String>>(mut self, timezone: Option<S>) -> Self {
        self.timezone = timezone.map(Into::into);
        self
    }

    /// Date of every row.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Asset of every row.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Holding periods, in column order.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// The `rows × periods` return matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Mutable access to the return matrix.
    pub const fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }

    /// Time-zone tag of the date axis, `None` when naive.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Returns column for `period`, if it was computed.
    pub fn period_column(&self, period: usize) -> Option<ArrayView1<'_, f64>> {
        let j = self.periods.iter().position(|&p| p == period)?;
        Some(self.values.column(j))
    }

    /// Column labels, one per period, named by the period length.
    pub fn column_names(&self) -> Vec<String> {
        self.periods.iter().map(ToString::to_string).collect()
    }

    /// Whether row `i` has a value for every period.
    pub fn is_row_complete(&self, i: usize) -> bool {
        self.values.row(i).iter().all(|v| v.is_finite())
    }

    /// Returns a new table holding only `rows`, in the given order.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            assets: rows.iter().map(|&i| self.assets[i].clone()).collect(),
            periods: self.periods.clone(),
            values: self.values.select(Axis(0), rows),
            timezone: self.timezone.clone(),
        }
    }

    /// Converts to a long DataFrame: `date`, `asset`, then one column per period.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = key_columns(&self.dates, &self.assets)?;
        for (j, period) in self.periods.iter().enumerate() {
            let values: Vec<f64> = self.values.column(j).to_vec();
            columns.push(Series::new(period.to_string().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

impl KeyedRows for ForwardReturns {
    fn key_dates(&self) -> &[Date] {
        &self.dates
    }

    fn key_assets(&self) -> &[Asset] {
        &self.assets
    }
}

/// Clean factor-and-returns table.
///
/// Columns: one per forward-return period, `factor`, optional `group`, and
/// `factor_quantile` (1-indexed bucket id). No missing values are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorData {
    returns: ForwardReturns,
    factor: Vec<f64>,
    group: Option<Vec<String>>,
    factor_quantile: Vec<u32>,
}

impl FactorData {
    /// Assembles clean factor data, checking that every column is complete.
    pub fn new(
        returns: ForwardReturns,
        factor: Vec<f64>,
        group: Option<Vec<String>>,
        factor_quantile: Vec<u32>,
    ) -> Result<Self> {
        let n = returns.len();
        let group_len = group.as_ref().map_or(n, Vec::len);
        if factor.len() != n || factor_quantile.len() != n || group_len != n {
            return Err(FaroError::InvalidData(format!(
                "factor data columns must all have {n} rows"
            )));
        }
        if returns.values().iter().any(|v| !v.is_finite()) {
            return Err(FaroError::InvalidData(
                "factor data contains missing forward returns".to_string(),
            ));
        }
        if factor.iter().any(|v| !v.is_finite()) {
            return Err(FaroError::InvalidData(
                "factor data contains missing factor values".to_string(),
            ));
        }
        if factor_quantile.contains(&0) {
            return Err(FaroError::InvalidData(
                "factor quantiles are 1-indexed".to_string(),
            ));
        }

        Ok(Self {
            returns,
            factor,
            group,
            factor_quantile,
        })
    }

    /// Reads a long DataFrame produced by [`FactorData::to_frame`] (or any
    /// frame with the same columns). Period columns are recognized by their
    /// all-digit names.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let (dates, timezone) = read_date_column(df, "date")?;
        let assets = read_str_column(df, "asset")?;

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let period_columns = forward_returns_columns(names.iter());
        if period_columns.is_empty() {
            return Err(FaroError::MissingColumn(
                "at least one forward return period column".to_string(),
            ));
        }

        let mut periods = Vec::with_capacity(period_columns.len());
        let mut columns = Vec::with_capacity(period_columns.len());
        for name in &period_columns {
            periods.push(period_of(name).ok_or_else(|| {
                FaroError::InvalidData(format!("period column '{name}' is out of range"))
            })?);
            columns.push(read_f64_column(df, name)?);
        }
        let values = Array2::from_shape_fn((dates.len(), periods.len()), |(i, j)| columns[j][i]);

        let factor = read_f64_column(df, FACTOR_COLUMN)?;
        let group = if names.iter().any(|n| n == GROUP_COLUMN) {
            Some(read_str_column(df, GROUP_COLUMN)?)
        } else {
            None
        };
        let factor_quantile = read_u32_column(df, QUANTILE_COLUMN)?;

        let returns = ForwardReturns::new(dates, assets, periods, values)?.with_timezone(timezone);
        Self::new(returns, factor, group, factor_quantile)
    }

    /// The forward-return columns.
    pub const fn returns(&self) -> &ForwardReturns {
        &self.returns
    }

    /// Date of every row.
    pub fn dates(&self) -> &[Date] {
        self.returns.dates()
    }

    /// Asset of every row.
    pub fn assets(&self) -> &[Asset] {
        self.returns.assets()
    }

    /// Holding periods, in column order.
    pub fn periods(&self) -> &[usize] {
        self.returns.periods()
    }

    /// Raw factor value of every row.
    pub fn factor(&self) -> &[f64] {
        &self.factor
    }

    /// Group label of every row, when groups were supplied.
    pub fn group(&self) -> Option<&[String]> {
        self.group.as_deref()
    }

    /// Bucket id (1-indexed) of every row.
    pub fn factor_quantile(&self) -> &[u32] {
        &self.factor_quantile
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Column labels: periods, `factor`, `group` when present, `factor_quantile`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.returns.column_names();
        names.push(FACTOR_COLUMN.to_string());
        if self.group.is_some() {
            names.push(GROUP_COLUMN.to_string());
        }
        names.push(QUANTILE_COLUMN.to_string());
        names
    }

    /// Converts to a long DataFrame keyed by `date` and `asset`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut df = self.returns.to_frame()?;
        df.with_column(Series::new(FACTOR_COLUMN.into(), self.factor.clone()))?;
        if let Some(group) = &self.group {
            df.with_column(Series::new(GROUP_COLUMN.into(), group.clone()))?;
        }
        df.with_column(Series::new(
            QUANTILE_COLUMN.into(),
            self.factor_quantile.clone(),
        ))?;
        Ok(df)
    }
}

impl KeyedRows for FactorData {
    fn key_dates(&self) -> &[Date] {
        self.returns.dates()
    }

    fn key_assets(&self) -> &[Asset] {
        self.returns.assets()
    }
}

/// A table carrying forward-return columns that can be demeaned.
pub trait ReturnsTable: KeyedRows + Clone {
    /// The forward-return columns.
    fn forward_returns(&self) -> &ForwardReturns;

    /// Mutable access to the forward-return columns.
    fn forward_returns_mut(&mut self) -> &mut ForwardReturns;

    /// Group label of every row, if the table has groups.
    fn groups(&self) -> Option<&[String]> {
        None
    }
}

impl ReturnsTable for ForwardReturns {
    fn forward_returns(&self) -> &ForwardReturns {
        self
    }

    fn forward_returns_mut(&mut self) -> &mut ForwardReturns {
        self
    }
}

impl ReturnsTable for FactorData {
    fn forward_returns(&self) -> &ForwardReturns {
        &self.returns
    }

    fn forward_returns_mut(&mut self) -> &mut ForwardReturns {
        &mut self.returns
    }

    fn groups(&self) -> Option<&[String]> {
        self.group.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::forward_returns_columns;
    use ndarray::array;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_returns() -> ForwardReturns {
        ForwardReturns::new(
            vec![d(2), d(2), d(3)],
            vec!["A".into(), "B".into(), "A".into()],
            vec![1, 5],
            array![[0.01, 0.05], [0.02, f64::NAN], [-0.01, 0.03]],
        )
        .unwrap()
    }

    #[test]
    fn test_forward_returns_accessors() {
        let returns = sample_returns();
        assert_eq!(returns.len(), 3);
        assert_eq!(returns.column_names(), vec!["1", "5"]);
        assert_eq!(returns.period_column(5).unwrap()[2], 0.03);
        assert!(returns.period_column(10).is_none());
        assert!(returns.is_row_complete(0));
        assert!(!returns.is_row_complete(1));
    }

    #[test]
    fn test_forward_returns_rejects_duplicate_periods() {
        let result = ForwardReturns::new(
            vec![d(2)],
            vec!["A".into()],
            vec![1, 1],
            array![[0.0, 0.0]],
        );
        assert!(matches!(result, Err(FaroError::InvalidData(_))));
    }

    #[test]
    fn test_select_rows() {
        let returns = sample_returns().select_rows(&[2, 0]);
        assert_eq!(returns.dates(), &[d(3), d(2)]);
        assert_eq!(returns.values()[[0, 0]], -0.01);
    }

    #[test]
    fn test_forward_returns_to_frame() {
        let df = sample_returns().to_frame().unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["date", "asset", "1", "5"]);
        assert_eq!(forward_returns_columns(names.iter()), vec!["1", "5"]);
    }

    #[test]
    fn test_factor_data_rejects_missing_values() {
        let result = FactorData::new(sample_returns(), vec![1.0, 2.0, 3.0], None, vec![1, 2, 1]);
        assert!(matches!(result, Err(FaroError::InvalidData(_))));
    }

    #[test]
    fn test_factor_data_frame_round_trip() {
        let returns = sample_returns().select_rows(&[0, 2]);
        let data = FactorData::new(
            returns,
            vec![0.5, -0.5],
            Some(vec!["Tech".into(), "Tech".into()]),
            vec![2, 1],
        )
        .unwrap();

        assert_eq!(
            data.column_names(),
            vec!["1", "5", "factor", "group", "factor_quantile"]
        );

        let df = data.to_frame().unwrap();
        let restored = FactorData::from_frame(&df).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_returns_table_groups() {
        let returns = sample_returns();
        assert!(returns.groups().is_none());
        assert_eq!(returns.forward_returns().len(), 3);
    }
}
