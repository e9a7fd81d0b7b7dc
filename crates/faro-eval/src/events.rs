//! Event-window returns aligned on a common start.
//!
//! Every `(date, asset)` event contributes the returns of its asset in a
//! window of rows around the event date. Windows from different dates are
//! laid side by side on a shared axis of offsets, where `0` is the event
//! date, negative offsets precede it and positive offsets follow it.

use faro_traits::stats::nan_mean_iter;
use faro_traits::{Asset, Date, KeyedRows, PricePanel, Result};
use ndarray::{Array2, s};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Window options of the common-start aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonStartConfig {
    /// Rows loaded before the event date.
    pub before: usize,
    /// Rows loaded after the event date.
    pub after: usize,
    /// Return price paths rebased to zero at the event date instead of
    /// per-row returns.
    pub cumulative: bool,
    /// Collapse each date's assets into their mean series.
    pub mean_by_date: bool,
}

impl Default for CommonStartConfig {
    fn default() -> Self {
        Self {
            before: 10,
            after: 15,
            cumulative: false,
            mean_by_date: false,
        }
    }
}

/// One aligned return series.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    /// Event date.
    pub date: Date,
    /// Event asset, `None` for a per-date mean series.
    pub asset: Option<Asset>,
    /// One value per offset of the enclosing table.
    pub values: Vec<f64>,
}

impl AlignedColumn {
    /// Column label: the date, followed by the asset when there is one.
    pub fn label(&self) -> String {
        match &self.asset {
            Some(asset) => format!("{} {asset}", self.date),
            None => self.date.to_string(),
        }
    }
}

/// Return series indexed by offset from their event date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedReturns {
    offsets: Vec<i64>,
    columns: Vec<AlignedColumn>,
}

impl AlignedReturns {
    /// The offset axis, ascending and contiguous.
    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    /// The aligned series, ordered by event date.
    pub fn columns(&self) -> &[AlignedColumn] {
        &self.columns
    }

    /// Number of offsets.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether no event could be resolved.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Finds the series of `asset` at `date`, or the date's mean series when
    /// `asset` is `None`.
    pub fn column(&self, date: Date, asset: Option<&str>) -> Option<&AlignedColumn> {
        self.columns
            .iter()
            .find(|c| c.date == date && c.asset.as_deref() == asset)
    }

    /// Value of a series at `offset`.
    pub fn value(&self, column: &AlignedColumn, offset: i64) -> Option<f64> {
        let first = *self.offsets.first()?;
        let i = usize::try_from(offset - first).ok()?;
        column.values.get(i).copied()
    }

    /// Converts to a wide DataFrame: an `offset` column plus one column per
    /// series, named by [`AlignedColumn::label`].
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Series::new("offset".into(), self.offsets.clone()).into());
        for column in &self.columns {
            columns.push(Series::new(column.label().into(), column.values.clone()).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Groups keyed rows by date, keeping each date's assets in first-appearance
/// order without duplicates.
fn assets_by_date<K: KeyedRows + ?Sized>(rows: &K) -> BTreeMap<Date, Vec<&str>> {
    let mut by_date: BTreeMap<Date, Vec<&str>> = BTreeMap::new();
    for (date, asset) in rows.key_dates().iter().zip(rows.key_assets()) {
        let assets = by_date.entry(*date).or_default();
        if !assets.contains(&asset.as_str()) {
            assets.push(asset.as_str());
        }
    }
    by_date
}

/// Window rows `[start, end)` of `asset`, or all-missing when the asset is
/// not on the panel.
fn window(
    source: &Array2<f64>,
    prices: &PricePanel,
    asset: &str,
    start: usize,
    end: usize,
) -> Vec<f64> {
    match prices.asset_position(asset) {
        Some(j) => source.slice(s![start..end, j]).to_vec(),
        None => vec![f64::NAN; end - start],
    }
}

/// Builds event windows around every event date and aligns them on a common
/// offset axis.
///
/// Event dates absent from the panel are skipped. Windows are clipped at the
/// panel boundaries, so an event on the first panel row starts at offset 0.
/// With `demean`, the mean over that date's universe is subtracted from every
/// event series; a date missing from the universe has a missing mean.
///
/// # Arguments
///
/// * `events` - Event keys; only `(date, asset)` pairs are read
/// * `prices` - Wide price panel, with `before`/`after` rows of buffer
/// * `config` - Window size and aggregation options
/// * `demean` - Optional per-date reference universe
///
/// # Example
///
/// ```rust,ignore
/// use faro_eval::{CommonStartConfig, common_start_returns};
///
/// let config = CommonStartConfig { before: 5, after: 10, cumulative: true, mean_by_date: true };
/// let aligned = common_start_returns(&factor, &prices, &config, None::<&FactorSeries>)?;
/// ```
pub fn common_start_returns<E, U>(
    events: &E,
    prices: &PricePanel,
    config: &CommonStartConfig,
    demean: Option<&U>,
) -> Result<AlignedReturns>
where
    E: KeyedRows + ?Sized,
    U: KeyedRows + ?Sized,
{
    let source = if config.cumulative {
        prices.values().clone()
    } else {
        prices.pct_change(1)
    };
    let universe = demean.map(assets_by_date);
    let n_dates = prices.n_dates();

    let mut windows: Vec<(i64, Vec<AlignedColumn>)> = Vec::new();
    for (date, assets) in assets_by_date(events) {
        let Some(day_zero) = prices.date_position(date) else {
            debug!(%date, "event date not in price panel, skipping");
            continue;
        };
        let start = day_zero.saturating_sub(config.before);
        let end = day_zero
            .saturating_add(config.after)
            .saturating_add(1)
            .min(n_dates);
        let zero = day_zero - start;

        let rebase = |mut series: Vec<f64>| {
            if config.cumulative {
                let base = series[zero];
                series.iter_mut().for_each(|v| *v = *v / base - 1.0);
            }
            series
        };

        let mut series: Vec<(Asset, Vec<f64>)> = assets
            .iter()
            .map(|asset| {
                (
                    (*asset).to_string(),
                    rebase(window(&source, prices, asset, start, end)),
                )
            })
            .collect();

        if let Some(universe) = &universe {
            let members: Vec<Vec<f64>> = universe
                .get(&date)
                .map(|members| {
                    members
                        .iter()
                        .map(|asset| rebase(window(&source, prices, asset, start, end)))
                        .collect()
                })
                .unwrap_or_default();
            for k in 0..end - start {
                let mean = nan_mean_iter(members.iter().map(|m| m[k]));
                for (_, values) in &mut series {
                    values[k] -= mean;
                }
            }
        }

        let columns = if config.mean_by_date {
            let values = (0..end - start)
                .map(|k| nan_mean_iter(series.iter().map(|(_, v)| v[k])))
                .collect();
            vec![AlignedColumn {
                date,
                asset: None,
                values,
            }]
        } else {
            series
                .into_iter()
                .map(|(asset, values)| AlignedColumn {
                    date,
                    asset: Some(asset),
                    values,
                })
                .collect()
        };

        windows.push((start as i64 - day_zero as i64, columns));
    }

    let Some(first) = windows.iter().map(|(offset, _)| *offset).min() else {
        return Ok(AlignedReturns::default());
    };
    let last = windows
        .iter()
        .flat_map(|(offset, columns)| columns.iter().map(move |c| offset + c.values.len() as i64 - 1))
        .max()
        .unwrap_or(first);

    let width = (last - first + 1) as usize;
    let mut columns = Vec::new();
    for (offset, window_columns) in windows {
        let lead = (offset - first) as usize;
        for mut column in window_columns {
            let mut padded = vec![f64::NAN; width];
            padded[lead..lead + column.values.len()].copy_from_slice(&column.values);
            column.values = padded;
            columns.push(column);
        }
    }

    debug!(
        columns = columns.len(),
        first_offset = first,
        last_offset = last,
        "aligned event windows"
    );

    Ok(AlignedReturns {
        offsets: (first..=last).collect(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use faro_traits::FactorSeries;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn prices() -> PricePanel {
        PricePanel::from_rows(
            (1..=6).map(d).collect(),
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                vec![1.0, 10.0, 100.0],
                vec![2.0, 10.0, 110.0],
                vec![4.0, 10.0, 121.0],
                vec![8.0, 10.0, 133.1],
                vec![16.0, 10.0, 146.41],
                vec![32.0, 10.0, 161.051],
            ],
        )
        .unwrap()
    }

    fn events(keys: &[(u32, &str)]) -> FactorSeries {
        FactorSeries::new(keys.iter().map(|(day, a)| (d(*day), a.to_string(), 1.0))).unwrap()
    }

    fn config(before: usize, after: usize) -> CommonStartConfig {
        CommonStartConfig {
            before,
            after,
            cumulative: false,
            mean_by_date: false,
        }
    }

    #[test]
    fn test_window_clipped_at_first_row() {
        let aligned =
            common_start_returns(&events(&[(1, "A")]), &prices(), &config(2, 3), None::<&FactorSeries>)
                .unwrap();

        assert_eq!(aligned.offsets(), &[0, 1, 2, 3]);
        let column = aligned.column(d(1), Some("A")).unwrap();
        assert!(column.values[0].is_nan());
        assert_relative_eq!(column.values[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unbounded_window_clipped_at_last_row() {
        let aligned = common_start_returns(
            &events(&[(2, "B")]),
            &prices(),
            &config(usize::MAX, usize::MAX),
            None::<&FactorSeries>,
        )
        .unwrap();

        assert_eq!(aligned.offsets(), &[-1, 0, 1, 2, 3, 4]);
        let column = aligned.column(d(2), Some("B")).unwrap();
        assert_relative_eq!(column.values[5], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_windows_share_offset_axis() {
        let aligned = common_start_returns(
            &events(&[(1, "A"), (3, "A"), (3, "B")]),
            &prices(),
            &config(2, 3),
            None::<&FactorSeries>,
        )
        .unwrap();

        assert_eq!(aligned.offsets(), &[-2, -1, 0, 1, 2, 3]);
        assert_eq!(aligned.columns().len(), 3);

        let early = aligned.column(d(1), Some("A")).unwrap();
        assert!(aligned.value(early, -2).unwrap().is_nan());
        assert!(aligned.value(early, -1).unwrap().is_nan());
        assert_relative_eq!(aligned.value(early, 3).unwrap(), 1.0, epsilon = 1e-12);

        let b = aligned.column(d(3), Some("B")).unwrap();
        assert_relative_eq!(aligned.value(b, 1).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cumulative_rebased_at_event() {
        let cfg = CommonStartConfig {
            cumulative: true,
            ..config(2, 3)
        };
        let aligned =
            common_start_returns(&events(&[(3, "A")]), &prices(), &cfg, None::<&FactorSeries>)
                .unwrap();
        let column = aligned.column(d(3), Some("A")).unwrap();
        let expected = [-0.75, -0.5, 0.0, 1.0, 3.0, 7.0];
        for (v, e) in column.values.iter().zip(expected) {
            assert_relative_eq!(*v, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_demean_against_universe() {
        let universe = events(&[(3, "A"), (3, "B"), (3, "C")]);
        let aligned = common_start_returns(
            &events(&[(3, "A")]),
            &prices(),
            &config(1, 1),
            Some(&universe),
        )
        .unwrap();

        assert_eq!(aligned.columns().len(), 1);
        let column = aligned.column(d(3), Some("A")).unwrap();
        let mean = (1.0 + 0.0 + 0.1) / 3.0;
        assert_relative_eq!(aligned.value(column, 1).unwrap(), 1.0 - mean, epsilon = 1e-9);
    }

    #[test]
    fn test_date_missing_from_universe_has_missing_mean() {
        let universe = events(&[(4, "B")]);
        let aligned =
            common_start_returns(&events(&[(3, "A")]), &prices(), &config(1, 1), Some(&universe))
                .unwrap();
        let column = aligned.column(d(3), Some("A")).unwrap();
        assert!(column.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_mean_by_date() {
        let cfg = CommonStartConfig {
            mean_by_date: true,
            ..config(0, 2)
        };
        let aligned = common_start_returns(
            &events(&[(3, "A"), (3, "B")]),
            &prices(),
            &cfg,
            None::<&FactorSeries>,
        )
        .unwrap();

        assert_eq!(aligned.columns().len(), 1);
        let column = aligned.column(d(3), None).unwrap();
        assert_eq!(column.label(), "2024-01-03");
        assert_relative_eq!(column.values[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_dates_and_assets() {
        let aligned = common_start_returns(
            &events(&[(20, "A"), (2, "Z")]),
            &prices(),
            &config(1, 1),
            None::<&FactorSeries>,
        )
        .unwrap();

        assert_eq!(aligned.columns().len(), 1);
        let column = aligned.column(d(2), Some("Z")).unwrap();
        assert!(column.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_no_resolved_events() {
        let aligned =
            common_start_returns(&events(&[(20, "A")]), &prices(), &config(1, 1), None::<&FactorSeries>)
                .unwrap();
        assert!(aligned.is_empty());
        assert!(aligned.offsets().is_empty());
    }

    #[test]
    fn test_to_frame() {
        let aligned =
            common_start_returns(&events(&[(3, "A")]), &prices(), &config(1, 1), None::<&FactorSeries>)
                .unwrap();
        let df = aligned.to_frame().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 2);
        assert!(df.column("2024-01-03 A").is_ok());
    }
}
