#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/faro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod format;
pub mod render;
pub mod table;

pub use format::{FloatFormat, FloatFormatGuard, float_format, format_float, set_float_format};
pub use render::{RenderMode, print_table, render_table};
pub use table::{Cell, TableView};
