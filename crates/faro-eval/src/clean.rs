//! Alignment of a factor with forward returns and group labels.
//!
//! [`get_clean_factor_and_forward_returns`] is the entry point every
//! downstream statistic starts from: it turns a raw factor series and a price
//! panel into a complete table keyed by `(date, asset)`.

use crate::forward::{ForwardReturnsConfig, compute_forward_returns};
use crate::quantize::{Bucketing, FactorView, quantize_factor};
use faro_traits::types::timezone_label;
use faro_traits::{
    Asset, Date, FactorData, FactorSeries, FaroError, ForwardReturns, PricePanel, Result,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Where group labels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSource {
    /// One group per asset, constant over time.
    Static(HashMap<Asset, String>),
    /// One group per `(date, asset)` row.
    PerRow(HashMap<(Date, Asset), String>),
}

/// Options of the clean pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Forward return holding periods.
    pub periods: Vec<usize>,
    /// Outlier threshold for forward returns, in standard deviations.
    pub filter_zscore: Option<f64>,
    /// Quantile or bin bucketing of the factor.
    pub bucketing: Bucketing,
    /// Bucket each group separately on every date.
    pub by_group: bool,
    /// Display names replacing group codes.
    pub group_labels: Option<HashMap<String, String>>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        let forward = ForwardReturnsConfig::default();
        Self {
            periods: forward.periods,
            filter_zscore: forward.filter_zscore,
            bucketing: Bucketing::default(),
            by_group: false,
            group_labels: None,
        }
    }
}

/// Fails unless the factor and the prices carry the same time zone.
pub fn check_timezones(factor: &FactorSeries, prices: &PricePanel) -> Result<()> {
    if factor.timezone() != prices.timezone() {
        return Err(FaroError::TimezoneMismatch {
            factor: timezone_label(factor.timezone()),
            prices: timezone_label(prices.timezone()),
        });
    }
    Ok(())
}

/// Forward returns restricted to the factor's rows, in factor order.
///
/// Rows whose date or asset is not on the panel get missing returns.
fn align_returns(
    factor: &FactorSeries,
    returns: &ForwardReturns,
    prices: &PricePanel,
) -> Result<ForwardReturns> {
    let n_assets = prices.n_assets();
    let source = returns.values();

    let mut values = Array2::from_elem((factor.len(), returns.periods().len()), f64::NAN);
    for (i, (date, asset, _)) in factor.iter().enumerate() {
        let (Some(t), Some(j)) = (prices.date_position(date), prices.asset_position(asset)) else {
            continue;
        };
        values.row_mut(i).assign(&source.row(t * n_assets + j));
    }

    Ok(ForwardReturns::new(
        factor.dates().to_vec(),
        factor.assets().to_vec(),
        returns.periods().to_vec(),
        values,
    )?
    .with_timezone(returns.timezone()))
}

/// Resolves a group source into one optional label per factor row.
fn resolve_groups(
    factor: &FactorSeries,
    source: &GroupSource,
    labels: Option<&HashMap<String, String>>,
) -> Result<Vec<Option<String>>> {
    let codes: Vec<Option<&String>> = match source {
        GroupSource::Static(mapping) => {
            let missing: Vec<String> = factor
                .unique_assets()
                .into_iter()
                .filter(|asset| !mapping.contains_key(*asset))
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(FaroError::MissingGroupAssets(missing));
            }
            factor.assets().iter().map(|asset| mapping.get(asset)).collect()
        }
        GroupSource::PerRow(mapping) => factor
            .dates()
            .iter()
            .zip(factor.assets())
            .map(|(date, asset)| mapping.get(&(*date, asset.clone())))
            .collect(),
    };

    let Some(labels) = labels else {
        return Ok(codes.into_iter().map(|c| c.cloned()).collect());
    };

    let used: BTreeSet<&String> = match source {
        GroupSource::Static(_) => codes.iter().flatten().copied().collect(),
        GroupSource::PerRow(mapping) => mapping.values().collect(),
    };
    let missing: Vec<String> = used
        .into_iter()
        .filter(|code| !labels.contains_key(*code))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(FaroError::MissingGroupLabels(missing));
    }

    Ok(codes
        .into_iter()
        .map(|code| code.and_then(|c| labels.get(c).cloned()))
        .collect())
}

/// Aligns a factor with forward returns, group labels and factor buckets.
///
/// Steps, in order: validate the bucketing, check that the factor and the
/// prices share a time zone, compute forward returns, attach the factor,
/// resolve groups, drop incomplete rows, bucket the factor, and drop rows
/// that could not be bucketed.
///
/// The price panel must extend at least `max(periods)` rows past the last
/// factor date, otherwise the trailing factor dates have no complete forward
/// returns and are dropped.
///
/// # Arguments
///
/// * `factor` - Factor values keyed by `(date, asset)`
/// * `prices` - Wide price panel covering the factor's dates
/// * `groupby` - Optional group source; required when `config.by_group` is set
/// * `config` - Periods, outlier filter, bucketing and label options
///
/// # Returns
///
/// Clean factor data with no missing values: one column per period,
/// `factor`, `group` when a group source was given, and `factor_quantile`.
///
/// # Example
///
/// ```rust,ignore
/// use faro_eval::{CleanConfig, get_clean_factor_and_forward_returns};
///
/// let data = get_clean_factor_and_forward_returns(&factor, &prices, None, &CleanConfig::default())?;
/// for (asset, bucket) in data.assets().iter().zip(data.factor_quantile()) {
///     println!("{asset}: {bucket}");
/// }
/// ```
pub fn get_clean_factor_and_forward_returns(
    factor: &FactorSeries,
    prices: &PricePanel,
    groupby: Option<&GroupSource>,
    config: &CleanConfig,
) -> Result<FactorData> {
    config.bucketing.validate()?;
    if config.by_group && groupby.is_none() {
        return Err(FaroError::Configuration(
            "by_group requires a group source".to_string(),
        ));
    }
    check_timezones(factor, prices)?;

    let forward = compute_forward_returns(prices, &config.periods, config.filter_zscore)?;
    let aligned = align_returns(factor, &forward, prices)?;

    let groups = groupby
        .map(|source| resolve_groups(factor, source, config.group_labels.as_ref()))
        .transpose()?;

    let complete: Vec<usize> = (0..factor.len())
        .filter(|&i| {
            aligned.is_row_complete(i)
                && factor.values()[i].is_finite()
                && groups.as_ref().is_none_or(|g| g[i].is_some())
        })
        .collect();
    debug!(
        factor_rows = factor.len(),
        complete_rows = complete.len(),
        "dropped incomplete factor rows"
    );

    let dates: Vec<Date> = complete.iter().map(|&i| factor.dates()[i]).collect();
    let values: Vec<f64> = complete.iter().map(|&i| factor.values()[i]).collect();
    let labels: Option<Vec<String>> = groups.map(|g| {
        complete
            .iter()
            .map(|&i| g[i].clone().unwrap_or_default())
            .collect()
    });

    let buckets = quantize_factor(
        FactorView {
            dates: &dates,
            factor: &values,
            groups: labels.as_deref(),
        },
        &config.bucketing,
        config.by_group,
    )?;

    let mut keep = Vec::with_capacity(complete.len());
    let mut factor_quantile = Vec::with_capacity(complete.len());
    for (k, bucket) in buckets.into_iter().enumerate() {
        if let Some(b) = bucket {
            keep.push(k);
            factor_quantile.push(b);
        }
    }
    debug!(
        bucketed_rows = keep.len(),
        unbucketed_rows = complete.len() - keep.len(),
        bucketing = %config.bucketing,
        "bucketed factor"
    );

    let rows: Vec<usize> = keep.iter().map(|&k| complete[k]).collect();
    FactorData::new(
        aligned.select_rows(&rows),
        keep.iter().map(|&k| values[k]).collect(),
        labels.map(|l| keep.iter().map(|&k| l[k].clone()).collect()),
        factor_quantile,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::BucketSpec;
    use approx::assert_relative_eq;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn prices() -> PricePanel {
        PricePanel::from_rows(
            (1..=5).map(d).collect(),
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                vec![10.0, 20.0, 30.0],
                vec![11.0, 19.0, 33.0],
                vec![12.0, 18.0, 36.0],
                vec![13.0, 17.0, 39.0],
                vec![14.0, 16.0, 42.0],
            ],
        )
        .unwrap()
    }

    fn factor() -> FactorSeries {
        FactorSeries::new(
            [1, 2, 3, 4, 5]
                .into_iter()
                .flat_map(|day| {
                    [("A", 1.0), ("B", 2.0), ("C", 3.0)]
                        .into_iter()
                        .map(move |(a, v)| (d(day), a.to_string(), v + f64::from(day)))
                })
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn config(periods: Vec<usize>, k: usize) -> CleanConfig {
        CleanConfig {
            periods,
            filter_zscore: None,
            bucketing: Bucketing::Quantiles(BucketSpec::Count(k)),
            ..CleanConfig::default()
        }
    }

    #[test]
    fn test_rows_limited_to_complete_windows() {
        let data =
            get_clean_factor_and_forward_returns(&factor(), &prices(), None, &config(vec![1, 2], 3))
                .unwrap();

        // Dates 4 and 5 lack a two-period forward return.
        assert_eq!(data.len(), 9);
        assert!(data.dates().iter().all(|date| *date <= d(3)));
        assert_eq!(data.column_names(), vec!["1", "2", "factor", "factor_quantile"]);
        assert_eq!(data.factor_quantile()[..3], [1, 2, 3]);
        assert_relative_eq!(data.returns().values()[[0, 0]], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_factor_rows_missing_from_panel_are_dropped() {
        let factor = FactorSeries::new(vec![
            (d(1), "A".to_string(), 1.0),
            (d(1), "B".to_string(), 2.0),
            (d(1), "Z".to_string(), 3.0),
            (d(9), "A".to_string(), 4.0),
        ])
        .unwrap();
        let data =
            get_clean_factor_and_forward_returns(&factor, &prices(), None, &config(vec![1], 2))
                .unwrap();
        assert_eq!(data.assets(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_timezone_mismatch() {
        let prices = prices().with_timezone(Some("UTC"));
        let err = get_clean_factor_and_forward_returns(&factor(), &prices, None, &config(vec![1], 3))
            .unwrap_err();
        match err {
            FaroError::TimezoneMismatch { factor, prices } => {
                assert_eq!(factor, "naive");
                assert_eq!(prices, "UTC");
            }
            other => panic!("expected TimezoneMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_matching_timezones_accepted() {
        let prices = prices().with_timezone(Some("America/New_York"));
        let factor = factor().with_timezone(Some("America/New_York"));
        assert!(
            get_clean_factor_and_forward_returns(&factor, &prices, None, &config(vec![1], 3)).is_ok()
        );
    }

    #[test]
    fn test_static_groups_with_labels() {
        let groups = GroupSource::Static(HashMap::from([
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
            ("C".to_string(), "1".to_string()),
        ]));
        let cfg = CleanConfig {
            group_labels: Some(HashMap::from([
                ("1".to_string(), "Tech".to_string()),
                ("2".to_string(), "Energy".to_string()),
            ])),
            ..config(vec![1], 1)
        };

        let data = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap();
        let group = data.group().unwrap();
        assert_eq!(&group[..3], &["Tech", "Energy", "Tech"]);
    }

    #[test]
    fn test_static_groups_missing_asset() {
        let groups = GroupSource::Static(HashMap::from([
            ("A".to_string(), "Tech".to_string()),
            ("C".to_string(), "Tech".to_string()),
        ]));
        let err =
            get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &config(vec![1], 2))
                .unwrap_err();
        match err {
            FaroError::MissingGroupAssets(assets) => assert_eq!(assets, vec!["B".to_string()]),
            other => panic!("expected MissingGroupAssets, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_group_labels() {
        let groups = GroupSource::Static(HashMap::from([
            ("A".to_string(), "x".to_string()),
            ("B".to_string(), "y".to_string()),
            ("C".to_string(), "z".to_string()),
        ]));
        let cfg = CleanConfig {
            group_labels: Some(HashMap::from([("x".to_string(), "X".to_string())])),
            ..config(vec![1], 2)
        };
        let err = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap_err();
        match err {
            FaroError::MissingGroupLabels(codes) => {
                assert_eq!(codes, vec!["y".to_string(), "z".to_string()]);
            }
            other => panic!("expected MissingGroupLabels, got {other:?}"),
        }
    }

    #[test]
    fn test_per_row_groups_drop_unmapped_rows() {
        let groups = GroupSource::PerRow(HashMap::from([
            ((d(1), "A".to_string()), "G1".to_string()),
            ((d(1), "B".to_string()), "G1".to_string()),
            ((d(2), "C".to_string()), "G2".to_string()),
        ]));
        let cfg = CleanConfig {
            bucketing: Bucketing::Bins(BucketSpec::Count(1)),
            ..config(vec![1], 1)
        };
        let data = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.group().unwrap(), &["G1", "G1", "G2"]);
    }

    #[test]
    fn test_per_row_groups_missing_label() {
        let groups = GroupSource::PerRow(HashMap::from([
            ((d(1), "A".to_string()), "G1".to_string()),
            ((d(1), "B".to_string()), "G1".to_string()),
            ((d(2), "C".to_string()), "G2".to_string()),
        ]));
        let cfg = CleanConfig {
            bucketing: Bucketing::Bins(BucketSpec::Count(1)),
            group_labels: Some(HashMap::from([("G1".to_string(), "Tech".to_string())])),
            ..config(vec![1], 1)
        };
        let err = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap_err();
        match err {
            FaroError::MissingGroupLabels(codes) => assert_eq!(codes, vec!["G2".to_string()]),
            other => panic!("expected MissingGroupLabels, got {other:?}"),
        }
    }

    #[test]
    fn test_by_group_bucketing() {
        let groups = GroupSource::Static(HashMap::from([
            ("A".to_string(), "X".to_string()),
            ("B".to_string(), "Y".to_string()),
            ("C".to_string(), "X".to_string()),
        ]));
        let cfg = CleanConfig {
            by_group: true,
            ..config(vec![1], 2)
        };
        let err = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap_err();
        // Group Y holds a single asset per date, so its two quantile edges coincide.
        assert!(err.is_non_unique_bin_edges());

        let cfg = CleanConfig {
            by_group: true,
            bucketing: Bucketing::Bins(BucketSpec::Count(2)),
            ..config(vec![1], 2)
        };
        let data = get_clean_factor_and_forward_returns(&factor(), &prices(), Some(&groups), &cfg)
            .unwrap();
        assert_eq!(&data.factor_quantile()[..3], &[1, 1, 2]);
    }

    #[test]
    fn test_by_group_without_groups() {
        let cfg = CleanConfig {
            by_group: true,
            ..config(vec![1], 2)
        };
        let result = get_clean_factor_and_forward_returns(&factor(), &prices(), None, &cfg);
        assert!(matches!(result, Err(FaroError::Configuration(_))));
    }

    #[test]
    fn test_invalid_bucketing_fails_first() {
        let prices = prices().with_timezone(Some("UTC"));
        let cfg = CleanConfig {
            bucketing: Bucketing::Quantiles(BucketSpec::Count(0)),
            ..config(vec![1], 2)
        };
        let result = get_clean_factor_and_forward_returns(&factor(), &prices, None, &cfg);
        assert!(matches!(result, Err(FaroError::Configuration(_))));
    }

    #[test]
    fn test_config_from_json() {
        let cfg: CleanConfig = serde_json::from_str(
            r#"{
                "periods": [1, 3],
                "filter_zscore": null,
                "bucketing": {"Bins": {"Edges": [-1.0, 0.0, 1.0]}},
                "by_group": false,
                "group_labels": {"1": "Tech"}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.periods, vec![1, 3]);
        assert_eq!(cfg.filter_zscore, None);
        assert_eq!(
            cfg.bucketing,
            Bucketing::Bins(BucketSpec::Edges(vec![-1.0, 0.0, 1.0]))
        );
        assert_eq!(cfg.group_labels.unwrap()["1"], "Tech");
    }

    #[test]
    fn test_default_config() {
        let cfg = CleanConfig::default();
        assert_eq!(cfg.periods, vec![1, 5, 10]);
        assert_eq!(cfg.filter_zscore, Some(20.0));
        assert_eq!(cfg.bucketing, Bucketing::Quantiles(BucketSpec::Count(5)));
        assert!(!cfg.by_group);
        assert!(cfg.group_labels.is_none());
    }
}
