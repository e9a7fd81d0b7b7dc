//! Factor alignment and return analysis for faro.
//!
//! This crate turns raw factor values and prices into the clean tables every
//! factor statistic starts from:
//! - Forward returns over several holding periods, with optional outlier filtering
//! - Quantile and bin bucketing of the factor, per date and optionally per group
//! - The clean pipeline joining factor, forward returns, groups and buckets
//! - Group demeaning of forward returns
//! - Event windows aligned on a common start
//! - Compounding of multi-period returns
//!
//! # Example
//!
//! ```rust,ignore
//! use faro_eval::{CleanConfig, demean_forward_returns, get_clean_factor_and_forward_returns};
//!
//! // Align the factor with 1, 5 and 10 day forward returns and quintiles
//! let data = get_clean_factor_and_forward_returns(&factor, &prices, None, &CleanConfig::default())?;
//!
//! // Returns relative to each date's cross-sectional mean
//! let relative = demean_forward_returns(&data, None)?;
//! ```

pub mod clean;
pub mod cumulative;
pub mod demean;
pub mod events;
pub mod forward;
pub mod quantize;

// Re-export main types
pub use clean::{CleanConfig, GroupSource, check_timezones, get_clean_factor_and_forward_returns};
pub use cumulative::{cumulative_returns, rate_of_return, std_conversion};
pub use demean::{Grouper, demean_forward_returns};
pub use events::{AlignedColumn, AlignedReturns, CommonStartConfig, common_start_returns};
pub use forward::{ForwardReturnsConfig, compute_forward_returns};
pub use quantize::{
    BucketSpec, Bucketing, FactorView, NON_UNIQUE_BIN_EDGES_HELP, quantize_factor,
};
