//! Input tables: the wide price panel and the long factor series.
//!
//! Both carry an optional time-zone tag on their date axis. The tag is never
//! used to convert dates; it only has to agree between the factor and the
//! prices before the two are aligned.

use crate::convert::{read_date_column, read_f64_column, read_str_column};
use crate::error::{FaroError, Result};
use chrono::Datelike;
use ndarray::Array2;
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// An asset identifier, typically a ticker such as `"AAPL"`.
pub type Asset = String;

/// Composite `(date, asset)` key of every long table.
pub type FactorKey = (Date, Asset);

/// Days between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converts days since the Unix epoch (Polars' `Date` encoding) into a date.
pub fn days_to_date(days: i32) -> Option<Date> {
    Date::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

/// Converts a date into days since the Unix epoch.
pub fn date_to_days(date: Date) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Formats an optional time-zone tag for messages.
pub fn timezone_label(timezone: Option<&str>) -> String {
    timezone.unwrap_or("naive").to_string()
}

/// Rows of a table keyed by `(date, asset)`.
///
/// Anything that exposes its keys as two parallel slices can be used as an
/// event table or a reference universe.
pub trait KeyedRows {
    /// Date component of every row key.
    fn key_dates(&self) -> &[Date];

    /// Asset component of every row key.
    fn key_assets(&self) -> &[Asset];

    /// Number of keyed rows.
    fn n_rows(&self) -> usize {
        self.key_dates().len()
    }
}

/// Wide price table: one row per date, one column per asset.
///
/// Dates are strictly increasing and assets unique. Missing prices are `NaN`.
///
/// # Example
///
/// ```
/// use faro_traits::{Date, PricePanel};
///
/// let d = |day| Date::from_ymd_opt(2024, 1, day).unwrap();
/// let panel = PricePanel::from_rows(
///     vec![d(2), d(3)],
///     vec!["AAPL".into(), "MSFT".into()],
///     vec![vec![100.0, 200.0], vec![101.0, 198.0]],
/// )
/// .unwrap();
///
/// assert_eq!(panel.price(d(3), "AAPL"), Some(101.0));
/// ```
#[derive(Debug, Clone)]
pub struct PricePanel {
    dates: Vec<Date>,
    assets: Vec<Asset>,
    prices: Array2<f64>,
    timezone: Option<String>,
    asset_lookup: HashMap<Asset, usize>,
}

impl PricePanel {
    /// Creates a panel from its date axis, asset axis and a `dates × assets`
    /// price matrix.
    pub fn new(dates: Vec<Date>, assets: Vec<Asset>, prices: Array2<f64>) -> Result<Self> {
        if prices.nrows() != dates.len() || prices.ncols() != assets.len() {
            return Err(FaroError::InvalidData(format!(
                "price matrix is {}x{}, expected {}x{} (dates x assets)",
                prices.nrows(),
                prices.ncols(),
                dates.len(),
                assets.len()
            )));
        }

        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(FaroError::InvalidData(format!(
                "price dates must be strictly increasing, found {} followed by {}",
                w[0], w[1]
            )));
        }

        let mut asset_lookup = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            if asset_lookup.insert(asset.clone(), i).is_some() {
                return Err(FaroError::InvalidData(format!(
                    "duplicate asset column '{asset}' in price panel"
                )));
            }
        }

        Ok(Self {
            dates,
            assets,
            prices,
            timezone: None,
            asset_lookup,
        })
    }

    /// Creates a panel from row-major price vectors, one per date.
    pub fn from_rows(dates: Vec<Date>, assets: Vec<Asset>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_assets = assets.len();
        if let Some(row) = rows.iter().find(|r| r.len() != n_assets) {
            return Err(FaroError::InvalidData(format!(
                "price row has {} values, expected {n_assets}",
                row.len()
            )));
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let prices = Array2::from_shape_vec((flat.len() / n_assets.max(1), n_assets), flat)?;
        Self::new(dates, assets, prices)
    }

    /// Reads a wide DataFrame: a `date` column plus one numeric column per
    /// asset. A time-zone aware `Datetime` date column sets the panel's zone.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let sorted = df.sort(["date"], Default::default())?;
        let (dates, timezone) = read_date_column(&sorted, "date")?;

        let assets: Vec<Asset> = sorted
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != "date")
            .map(|name| name.to_string())
            .collect();

        let columns = assets
            .iter()
            .map(|asset| read_f64_column(&sorted, asset))
            .collect::<Result<Vec<_>>>()?;

        let prices = Array2::from_shape_fn((dates.len(), assets.len()), |(i, j)| columns[j][i]);
        Ok(Self::new(dates, assets, prices)?.with_timezone(timezone))
    }

    /// Sets the time-zone tag of the date axis.
    #[must_use]
    pub fn with_timezone<S: Into<String>>(mut self, timezone: Option<S>) -> Self {
        self.timezone = timezone.map(Into::into);
        self
    }

    /// The date axis.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// The asset axis.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// The `dates × assets` price matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.prices
    }

    /// Time-zone tag of the date axis, `None` when naive.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Number of dates.
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Position of `date` on the date axis.
    pub fn date_position(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Position of `asset` on the asset axis.
    pub fn asset_position(&self, asset: &str) -> Option<usize> {
        self.asset_lookup.get(asset).copied()
    }

    /// Price of `asset` at `date`, if both are on the panel.
    pub fn price(&self, date: Date, asset: &str) -> Option<f64> {
        let i = self.date_position(date)?;
        let j = self.asset_position(asset)?;
        Some(self.prices[[i, j]])
    }

    /// Percent change over `periods` rows, stored at the later row.
    ///
    /// The first `periods` rows are `NaN`, as are changes whose endpoints
    /// are missing or whose ratio is not finite.
    pub fn pct_change(&self, periods: usize) -> Array2<f64> {
        let (n_dates, n_assets) = self.prices.dim();
        Array2::from_shape_fn((n_dates, n_assets), |(i, j)| {
            if i < periods {
                return f64::NAN;
            }
            let change = self.prices[[i, j]] / self.prices[[i - periods, j]] - 1.0;
            if change.is_finite() { change } else { f64::NAN }
        })
    }
}

/// Long factor table: one value per `(date, asset)` key, sorted by key.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSeries {
    dates: Vec<Date>,
    assets: Vec<Asset>,
    values: Vec<f64>,
    timezone: Option<String>,
}

impl FactorSeries {
    /// Creates a factor series from `(date, asset, value)` entries.
    ///
    /// Entries are sorted by key; duplicate keys are rejected.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Date, Asset, f64)>,
    {
        let mut entries: Vec<(Date, Asset, f64)> = entries.into_iter().collect();
        entries.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        if let Some(w) = entries
            .windows(2)
            .find(|w| w[0].0 == w[1].0 && w[0].1 == w[1].1)
        {
            return Err(FaroError::InvalidData(format!(
                "duplicate factor entry for ({}, {})",
                w[0].0, w[0].1
            )));
        }

        let mut dates = Vec::with_capacity(entries.len());
        let mut assets = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (date, asset, value) in entries {
            dates.push(date);
            assets.push(asset);
            values.push(value);
        }

        Ok(Self {
            dates,
            assets,
            values,
            timezone: None,
        })
    }

    /// Reads a long DataFrame with `date`, `asset` and `value_column` columns.
    pub fn from_frame(df: &DataFrame, value_column: &str) -> Result<Self> {
        let (dates, timezone) = read_date_column(df, "date")?;
        let assets = read_str_column(df, "asset")?;
        let values = read_f64_column(df, value_column)?;

        let entries = dates
            .into_iter()
            .zip(assets)
            .zip(values)
            .map(|((date, asset), value)| (date, asset, value));

        Ok(Self::new(entries)?.with_timezone(timezone))
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

    /// Factor value of every row.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Time-zone tag of the date axis, `None` when naive.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct assets referenced by the series.
    pub fn unique_assets(&self) -> BTreeSet<&str> {
        self.assets.iter().map(String::as_str).collect()
    }

    /// Iterates `(date, asset, value)` rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, &str, f64)> + '_ {
        self.dates
            .iter()
            .zip(&self.assets)
            .zip(&self.values)
            .map(|((date, asset), value)| (*date, asset.as_str(), *value))
    }
}

impl KeyedRows for FactorSeries {
    fn key_dates(&self) -> &[Date] {
        &self.dates
    }

    fn key_assets(&self) -> &[Asset] {
        &self.assets
    }
}
