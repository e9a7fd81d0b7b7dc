//! Float display format with scoped overrides.
//!
//! Rendering reads the current thread's float format. [`FloatFormatGuard`]
//! swaps in a new format and puts the previous one back when dropped, on
//! every exit path.

use faro_traits::{FaroError, Result};
use std::cell::RefCell;
use std::str::FromStr;

/// Decimal places used when no float format is set.
pub const DEFAULT_PRECISION: usize = 6;

thread_local! {
    static FLOAT_FORMAT: RefCell<Option<FloatFormat>> = const { RefCell::new(None) };
}

/// A float pattern with a single placeholder, such as `"{:.2}%"` or `"${}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatFormat {
    prefix: String,
    precision: Option<usize>,
    suffix: String,
}

impl FloatFormat {
    /// Parses a pattern holding exactly one `{}` or `{:.N}` placeholder.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = || {
            FaroError::Configuration(format!(
                "float format '{pattern}' needs exactly one '{{}}' or '{{:.N}}' placeholder"
            ))
        };

        let open = pattern.find('{').ok_or_else(invalid)?;
        let close = open + pattern[open..].find('}').ok_or_else(invalid)?;
        let (prefix, spec, suffix) = (
            &pattern[..open],
            &pattern[open + 1..close],
            &pattern[close + 1..],
        );
        if prefix.contains(['{', '}']) || suffix.contains(['{', '}']) {
            return Err(invalid());
        }

        let precision = match spec {
            "" | ":" => None,
            _ => {
                let digits = spec.strip_prefix(":.").ok_or_else(invalid)?;
                Some(digits.parse::<usize>().map_err(|_| invalid())?)
            }
        };

        Ok(Self {
            prefix: prefix.to_string(),
            precision,
            suffix: suffix.to_string(),
        })
    }

    /// Fixed-point format with `precision` decimals and no decoration.
    pub const fn with_precision(precision: usize) -> Self {
        Self {
            prefix: String::new(),
            precision: Some(precision),
            suffix: String::new(),
        }
    }

    /// Formats `value`; missing values print as `NaN` without decoration.
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        match self.precision {
            Some(p) => format!("{}{value:.p$}{}", self.prefix, self.suffix),
            None => format!("{}{value}{}", self.prefix, self.suffix),
        }
    }
}

impl FromStr for FloatFormat {
    type Err = FaroError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The current thread's float format, if one is set.
pub fn float_format() -> Option<FloatFormat> {
    FLOAT_FORMAT.with(|current| current.borrow().clone())
}

/// Replaces the current thread's float format, returning the previous one.
pub fn set_float_format(format: Option<FloatFormat>) -> Option<FloatFormat> {
    FLOAT_FORMAT.with(|current| current.replace(format))
}

/// Formats `value` with the current float format.
pub fn format_float(value: f64) -> String {
    FLOAT_FORMAT.with(|current| match current.borrow().as_ref() {
        Some(format) => format.format(value),
        None => FloatFormat::with_precision(DEFAULT_PRECISION).format(value),
    })
}

/// Overrides the float format until dropped.
#[derive(Debug)]
#[must_use = "the previous format is restored as soon as the guard is dropped"]
pub struct FloatFormatGuard {
    previous: Option<FloatFormat>,
}

impl FloatFormatGuard {
    /// Installs `format` and remembers the one it replaces.
    pub fn set(format: Option<FloatFormat>) -> Self {
        Self {
            previous: set_float_format(format),
        }
    }
}

impl Drop for FloatFormatGuard {
    fn drop(&mut self) {
        set_float_format(self.previous.take());
    }
}
