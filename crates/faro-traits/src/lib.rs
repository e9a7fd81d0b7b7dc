#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/faro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types for the Faro factor analysis toolkit.
//!
//! This crate provides the data model shared by the pipeline crates: the
//! price panel, the factor series, the forward-returns table and the clean
//! factor data, together with the error type and the column classifier.

/// The version of the faro-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod columns;
mod convert;
pub mod error;
pub mod frame;
pub mod stats;
pub mod types;

// Re-exports
pub use columns::{forward_returns_columns, is_period_column};
pub use error::{FaroError, Result};
pub use frame::{FactorData, ForwardReturns, ReturnsTable};
pub use types::{Asset, Date, FactorKey, FactorSeries, KeyedRows, PricePanel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
