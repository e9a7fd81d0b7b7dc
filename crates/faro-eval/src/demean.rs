//! Group-relative forward returns.

use derive_more::Display;
use faro_traits::stats::nan_mean_iter;
use faro_traits::{Date, FaroError, Result, ReturnsTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition within which forward returns are demeaned.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grouper {
    /// Every date across the whole universe.
    #[default]
    #[display("date")]
    Date,
    /// Every group on every date.
    #[display("date and group")]
    DateAndGroup,
    /// Every group, pooled over all dates.
    #[display("group")]
    Group,
}

impl Grouper {
    const fn uses_groups(self) -> bool {
        matches!(self, Self::DateAndGroup | Self::Group)
    }
}

/// Subtracts the partition mean from every forward-return column.
///
/// `None` demeans per date. Means skip missing values, and missing values
/// stay missing. The input is left untouched; a demeaned copy is returned.
///
/// Demeaning isolates a factor's relative performance within the partition,
/// which is the view a group-neutral portfolio would take.
pub fn demean_forward_returns<T: ReturnsTable>(table: &T, grouper: Option<Grouper>) -> Result<T> {
    let grouper = grouper.unwrap_or_default();
    let groups = match (grouper.uses_groups(), table.groups()) {
        (false, _) => None,
        (true, Some(groups)) => Some(groups),
        (true, None) => {
            return Err(FaroError::Configuration(format!(
                "demeaning by {grouper} requires a group column"
            )));
        }
    };

    let dates = table.key_dates();
    let mut partitions: BTreeMap<(Option<Date>, Option<&str>), Vec<usize>> = BTreeMap::new();
    for (i, date) in dates.iter().enumerate() {
        let key = match grouper {
            Grouper::Date => (Some(*date), None),
            Grouper::DateAndGroup => (Some(*date), groups.map(|g| g[i].as_str())),
            Grouper::Group => (None, groups.map(|g| g[i].as_str())),
        };
        partitions.entry(key).or_default().push(i);
    }

    let mut demeaned = table.clone();
    let values = demeaned.forward_returns_mut().values_mut();
    for rows in partitions.values() {
        for mut column in values.columns_mut() {
            let mean = nan_mean_iter(rows.iter().map(|&i| column[i]));
            for &i in rows {
                column[i] -= mean;
            }
        }
    }

    Ok(demeaned)
}
