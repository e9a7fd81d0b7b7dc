#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/faro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # faro
//!
//! faro is an umbrella crate that re-exports all faro sub-crates for convenience.
//!
//! ## Quick Start
//!
//! ```ignore
//! use faro::prelude::*;
//!
//! # fn main() -> faro::Result<()> {
//! let prices = PricePanel::from_frame(&price_frame)?;
//! let factor = FactorSeries::from_frame(&factor_frame, "momentum")?;
//!
//! let config = CleanConfig {
//!     periods: vec![1, 5, 21],
//!     bucketing: Bucketing::Quantiles(BucketSpec::Count(5)),
//!     ..CleanConfig::default()
//! };
//! let data = get_clean_factor_and_forward_returns(&factor, &prices, None, &config)?;
//! let relative = demean_forward_returns(&data, None)?;
//! print_table(&relative, Some("Demeaned forward returns"), Some("{:.4}"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Data model, error type and column classifier
//! - [`eval`] - Forward returns, bucketing, the clean pipeline and the analyses on top of it
//! - [`output`] - Table rendering
//!
//! ## Data Flow
//!
//! 1. **Inputs**: a factor keyed by `(date, asset)` and a wide price panel
//! 2. **Forward returns** are computed per holding period and stored at the earlier date
//! 3. **Alignment** attaches the factor and optional groups, and drops incomplete rows
//! 4. **Bucketing** assigns every row a quantile or bin per date (and per group)
//! 5. **Analyses** such as demeaning and event windows read the clean table

/// Version information for the faro crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Data model shared by every faro crate.
///
/// - [`PricePanel`] - Wide price table, dates by assets
/// - [`FactorSeries`] - Factor values keyed by `(date, asset)`
/// - [`ForwardReturns`] - Forward returns keyed by `(date, asset)`
/// - [`FactorData`] - Clean factor, returns, group and bucket table
pub mod traits {
    pub use faro_traits::*;
}

// Re-export error types
pub use faro_traits::{FaroError, Result};

// Re-export common types
pub use faro_traits::{
    Asset, Date, FactorData, FactorSeries, ForwardReturns, KeyedRows, PricePanel, ReturnsTable,
};

// ============================================================================
// Analysis
// ============================================================================

/// Forward returns, bucketing, alignment and the analyses built on them.
///
/// ## Forward returns
///
/// The forward return stored at date `D` for period `P` is
///
/// ```text
/// r(D, P) = price(D + P) / price(D) - 1
/// ```
///
/// so a factor known at `D` is compared with what happened after `D`.
///
/// ## Bucketing
///
/// - **Quantiles** hold the same number of rows each
/// - **Bins** split the factor's range into equal widths
///
/// Heavily tied factors can make two quantile edges coincide. That fails
/// with [`FaroError::NonUniqueBinEdges`] after a diagnostic listing the
/// workarounds is logged.
///
/// # Example
///
/// ```ignore
/// use faro::eval::{CommonStartConfig, common_start_returns};
///
/// let config = CommonStartConfig { before: 5, after: 10, cumulative: true, mean_by_date: true };
/// let aligned = common_start_returns(&data, &prices, &config, Some(&data))?;
/// ```
pub mod eval {
    pub use faro_eval::*;
}

// ============================================================================
// Output
// ============================================================================

/// Plain-text and Markdown rendering of faro tables.
pub mod output {
    pub use faro_output::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use faro::prelude::*;
/// ```
pub mod prelude {
    pub use crate::eval::{
        BucketSpec, Bucketing, CleanConfig, CommonStartConfig, GroupSource, Grouper,
        common_start_returns, compute_forward_returns, demean_forward_returns,
        get_clean_factor_and_forward_returns, quantize_factor,
    };
    pub use crate::output::{RenderMode, TableView, print_table, render_table};
    pub use crate::{
        Asset, Date, FactorData, FactorSeries, FaroError, ForwardReturns, KeyedRows, PricePanel,
        Result, ReturnsTable,
    };
}

// ============================================================================
// Tests
// ============================================================================
