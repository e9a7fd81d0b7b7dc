//! Factor bucketing.
//!
//! Factor values are partitioned per date (and optionally per group) into
//! 1-indexed buckets, either equal-frequency (quantiles) or equal-width
//! (bins). Each partition is bucketed independently of every other.

use derive_more::Display;
use faro_traits::stats::sorted_quantile;
use faro_traits::{Date, FactorData, FaroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Extended explanation logged when bucket edges collide.
pub const NON_UNIQUE_BIN_EDGES_HELP: &str = "\
The requested quantiles cannot be computed for this input.
This usually happens when the factor holds many identical values and a
single value spans more than one quantile: quantiles are meant to hold the
same number of records each, but one value cannot be split across buckets.
Possible workarounds:
    1 - Decrease the number of quantiles.
    2 - Pass custom quantile edges, e.g. [0, .50, .75, 1.], to get an
        unequal number of records per quantile.
    3 - Use bins instead of quantiles: bins are evenly spaced over the
        factor values themselves, while quantiles force every bucket to
        hold the same number of records.
    4 - For factors with discrete values, use bins with custom edges that
        create one range per discrete value.";

/// Bucket count or explicit bucket edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BucketSpec {
    /// Number of buckets.
    Count(usize),
    /// Explicit, non-decreasing bucket edges.
    Edges(Vec<f64>),
}

/// How factor values are split into buckets.
///
/// Exactly one of quantiles or bins is chosen; the enum makes any other
/// combination unrepresentable.
#[derive(Debug, Display, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bucketing {
    /// Equal-frequency buckets. Edges, when given, are quantile levels in
    /// `[0, 1]`, e.g. `[0, .1, .5, .9, 1]` or `[.05, .5, .95]`.
    #[display("quantiles")]
    Quantiles(BucketSpec),
    /// Equal-width buckets. Edges, when given, are in factor units, e.g.
    /// `[-4, -2, -0.5, 0, 10]`.
    #[display("bins")]
    Bins(BucketSpec),
}

impl Default for Bucketing {
    fn default() -> Self {
        Self::Quantiles(BucketSpec::Count(5))
    }
}

impl Bucketing {
    /// Builds a bucketing from two optional specs, exactly one of which must
    /// be present.
    pub fn from_options(quantiles: Option<BucketSpec>, bins: Option<BucketSpec>) -> Result<Self> {
        match (quantiles, bins) {
            (Some(spec), None) => Ok(Self::Quantiles(spec)),
            (None, Some(spec)) => Ok(Self::Bins(spec)),
            (Some(_), Some(_)) => Err(FaroError::Configuration(
                "only one of quantiles or bins can be provided".to_string(),
            )),
            (None, None) => Err(FaroError::Configuration(
                "either quantiles or bins should be provided".to_string(),
            )),
        }
    }

    /// The bucket count or edges.
    pub const fn spec(&self) -> &BucketSpec {
        match self {
            Self::Quantiles(spec) | Self::Bins(spec) => spec,
        }
    }

    /// Checks the bucket count or edges before any data is touched.
    pub fn validate(&self) -> Result<()> {
        match self.spec() {
            BucketSpec::Count(0) => Err(FaroError::Configuration(format!(
                "{self} count must be at least 1"
            ))),
            BucketSpec::Count(_) => Ok(()),
            BucketSpec::Edges(edges) => {
                if edges.len() < 2 {
                    return Err(FaroError::Configuration(format!(
                        "{self} edges need at least two values, got {edges:?}"
                    )));
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    return Err(FaroError::Configuration(format!(
                        "{self} edges must be finite, got {edges:?}"
                    )));
                }
                if edges.windows(2).any(|w| w[0] > w[1]) {
                    return Err(FaroError::Configuration(format!(
                        "{self} edges must increase monotonically, got {edges:?}"
                    )));
                }
                if matches!(self, Self::Quantiles(_))
                    && edges.iter().any(|q| !(0.0..=1.0).contains(q))
                {
                    return Err(FaroError::Configuration(format!(
                        "quantile levels must lie in [0, 1], got {edges:?}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Borrowed view of the columns the bucketer reads.
#[derive(Debug, Clone, Copy)]
pub struct FactorView<'a> {
    /// Date of every row.
    pub dates: &'a [Date],
    /// Factor value of every row.
    pub factor: &'a [f64],
    /// Group label of every row, when available.
    pub groups: Option<&'a [String]>,
}

impl<'a> From<&'a FactorData> for FactorView<'a> {
    fn from(data: &'a FactorData) -> Self {
        Self {
            dates: data.dates(),
            factor: data.factor(),
            groups: data.group(),
        }
    }
}

fn evenly_spaced(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=count)
        .map(|i| lo + (hi - lo) * i as f64 / count as f64)
        .collect();
    edges[count] = hi;
    edges
}

/// Edges of equal-frequency buckets over ascending-sorted `sorted` values.
fn quantile_edges(sorted: &[f64], spec: &BucketSpec) -> Vec<f64> {
    let levels = match spec {
        BucketSpec::Count(k) => evenly_spaced(0.0, 1.0, *k),
        BucketSpec::Edges(levels) => levels.clone(),
    };
    levels.iter().map(|&q| sorted_quantile(sorted, q)).collect()
}

/// Edges of equal-width buckets over ascending-sorted `sorted` values.
///
/// A counted range is widened slightly so its minimum falls inside the
/// first bucket; a constant range is widened symmetrically.
fn bin_edges(sorted: &[f64], spec: &BucketSpec) -> Vec<f64> {
    match spec {
        BucketSpec::Count(k) => {
            let (mut lo, mut hi) = (sorted[0], sorted[sorted.len() - 1]);
            if lo == hi {
                let pad = if lo == 0.0 { 0.001 } else { 0.001 * lo.abs() };
                lo -= pad;
                hi += pad;
                evenly_spaced(lo, hi, *k)
            } else {
                let mut edges = evenly_spaced(lo, hi, *k);
                edges[0] -= (hi - lo) * 0.001;
                edges
            }
        }
        BucketSpec::Edges(edges) => edges.clone(),
    }
}

/// Index of the right-closed interval of `edges` holding `value`.
fn locate(edges: &[f64], value: f64, include_lowest: bool) -> Option<u32> {
    let n_buckets = edges.len() - 1;
    let below = edges.partition_point(|&e| e < value);
    match below {
        0 if include_lowest && value == edges[0] => Some(1),
        i if (1..=n_buckets).contains(&i) => Some(i as u32),
        _ => None,
    }
}

/// Buckets one partition of factor values.
///
/// Missing values, and values outside the edges, get no bucket. An invalid
/// count or edge list fails with [`FaroError::Configuration`]; collided
/// edges fail with [`FaroError::NonUniqueBinEdges`].
pub fn assign_buckets(values: &[f64], bucketing: &Bucketing) -> Result<Vec<Option<u32>>> {
    bucketing.validate()?;
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Ok(vec![None; values.len()]);
    }
    sorted.sort_by(f64::total_cmp);

    let (edges, include_lowest) = match bucketing {
        Bucketing::Quantiles(spec) => (quantile_edges(&sorted, spec), true),
        Bucketing::Bins(spec) => (bin_edges(&sorted, spec), false),
    };

    if edges.windows(2).any(|w| w[0] == w[1]) {
        return Err(FaroError::NonUniqueBinEdges { edges });
    }

    Ok(values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                locate(&edges, v, include_lowest)
            } else {
                None
            }
        })
        .collect())
}

fn bucket_partitions(
    view: FactorView<'_>,
    bucketing: &Bucketing,
    by_group: bool,
) -> Result<Vec<Option<u32>>> {
    if view.dates.len() != view.factor.len() {
        return Err(FaroError::InvalidData(format!(
            "{} dates but {} factor values",
            view.dates.len(),
            view.factor.len()
        )));
    }

    let groups = match (by_group, view.groups) {
        (false, _) => None,
        (true, Some(groups)) if groups.len() == view.factor.len() => Some(groups),
        (true, Some(_)) => {
            return Err(FaroError::InvalidData(
                "group column length does not match factor".to_string(),
            ));
        }
        (true, None) => {
            return Err(FaroError::Configuration(
                "bucketing by group requires a group column".to_string(),
            ));
        }
    };

    let mut partitions: BTreeMap<(Date, Option<&str>), Vec<usize>> = BTreeMap::new();
    for (i, date) in view.dates.iter().enumerate() {
        let group = groups.map(|g| g[i].as_str());
        partitions.entry((*date, group)).or_default().push(i);
    }

    let mut buckets = vec![None; view.factor.len()];
    for rows in partitions.values() {
        let values: Vec<f64> = rows.iter().map(|&i| view.factor[i]).collect();
        let assigned = assign_buckets(&values, bucketing)?;
        for (&i, bucket) in rows.iter().zip(assigned) {
            buckets[i] = bucket;
        }
    }

    Ok(buckets)
}

/// Computes the bucket id of every row, per date (and per group when
/// `by_group` is set).
///
/// Rows that cannot be bucketed get `None`. When ties force two bucket
/// edges to coincide, an extended diagnostic is logged and the
/// [`FaroError::NonUniqueBinEdges`] error is returned unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use faro_eval::{quantize_factor, BucketSpec, Bucketing, FactorView};
///
/// let buckets = quantize_factor(
///     FactorView::from(&factor_data),
///     &Bucketing::Quantiles(BucketSpec::Count(5)),
///     false,
/// )?;
/// ```
pub fn quantize_factor(
    view: FactorView<'_>,
    bucketing: &Bucketing,
    by_group: bool,
) -> Result<Vec<Option<u32>>> {
    bucketing.validate()?;
    bucket_partitions(view, bucketing, by_group).inspect_err(|err| {
        if err.is_non_unique_bin_edges() {
            warn!("{NON_UNIQUE_BIN_EDGES_HELP}");
        }
    })
}
