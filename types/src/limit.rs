//! Concurrency limit newtype.
//!
//! A limit of zero would make every submission wait forever, so it is
//! unrepresentable: every constructor clamps non-positive input to 1.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Maximum number of tasks allowed to run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "i64")]
pub struct ConcurrencyLimit(NonZeroUsize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("concurrency limit must be an integer (got {raw:?})")]
pub struct ParseLimitError {
    raw: String,
}

impl ConcurrencyLimit {
    pub const MIN: ConcurrencyLimit = ConcurrencyLimit(NonZeroUsize::MIN);

    /// Build a limit from an unsigned count, treating 0 as 1.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        NonZeroUsize::new(limit).map_or(Self::MIN, Self)
    }

    /// Build a limit from a signed count, treating anything `<= 0` as 1.
    #[must_use]
    pub fn clamped(limit: i64) -> Self {
        match usize::try_from(limit) {
            Ok(limit) => Self::new(limit),
            Err(_) => Self::MIN,
        }
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<usize> for ConcurrencyLimit {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl From<i64> for ConcurrencyLimit {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = ParseLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self::clamped)
            .map_err(|_| ParseLimitError { raw: s.to_string() })
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
