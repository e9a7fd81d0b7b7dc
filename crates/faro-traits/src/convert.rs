//! Polars column helpers shared by the table types.

use crate::error::{FaroError, Result};
use crate::types::{Date, date_to_days, days_to_date};
use polars::prelude::*;

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| FaroError::MissingColumn(name.to_string()))
}

/// Reads a `Date` or `Datetime` column, returning the dates and the column's
/// time zone (`None` for naive columns).
pub(crate) fn read_date_column(df: &DataFrame, name: &str) -> Result<(Vec<Date>, Option<String>)> {
    let series = column(df, name)?.as_materialized_series();

    let (series, timezone) = match series.dtype() {
        DataType::Date => (series.clone(), None),
        DataType::Datetime(_, tz) => (
            series.cast(&DataType::Date)?,
            tz.as_ref().map(|tz| tz.to_string()),
        ),
        other => {
            return Err(FaroError::InvalidData(format!(
                "column '{name}' must hold dates, found {other}"
            )));
        }
    };

    let dates = series
        .date()?
        .into_iter()
        .map(|d: Option<i32>| {
            d.and_then(days_to_date).ok_or_else(|| {
                FaroError::InvalidData(format!("column '{name}' contains missing dates"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((dates, timezone))
}

/// Reads a string column; missing entries are rejected.
pub(crate) fn read_str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    column(df, name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|s: Option<&str>| {
            s.map(str::to_string).ok_or_else(|| {
                FaroError::InvalidData(format!("column '{name}' contains missing values"))
            })
        })
        .collect()
}

/// Reads a numeric column as `f64`; nulls become `NaN`.
pub(crate) fn read_f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column(df, name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    Ok(series
        .f64()?
        .into_iter()
        .map(|v: Option<f64>| v.unwrap_or(f64::NAN))
        .collect())
}

/// Reads an integer column as `u32`; missing entries are rejected.
pub(crate) fn read_u32_column(df: &DataFrame, name: &str) -> Result<Vec<u32>> {
    let series = column(df, name)?
        .as_materialized_series()
        .cast(&DataType::UInt32)?;

    series
        .u32()?
        .into_iter()
        .map(|v: Option<u32>| {
            v.ok_or_else(|| {
                FaroError::InvalidData(format!("column '{name}' contains missing values"))
            })
        })
        .collect()
}

/// Builds the `date` and `asset` key columns of a long table.
pub(crate) fn key_columns(dates: &[Date], assets: &[String]) -> Result<Vec<Column>> {
    let days: Vec<i32> = dates.iter().map(|d| date_to_days(*d)).collect();
    let date_series = Series::new("date".into(), days).cast(&DataType::Date)?;

    Ok(vec![
        date_series.into(),
        Series::new("asset".into(), assets.to_vec()).into(),
    ])
}
