//! Split scheme selection.
//!
//! `SplitKind` is what a configuration file names (`"by_date"`,
//! `"randomly"`); `SplitMethod` is the fully parameterised scheme.

use crate::error::{Result, SplitError};
use data_loader::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a splitting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    ByDate,
    Randomly,
}

impl FromStr for SplitKind {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "by_date" => Ok(SplitKind::ByDate),
            "randomly" => Ok(SplitKind::Randomly),
            other => Err(SplitError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitKind::ByDate => write!(f, "by_date"),
            SplitKind::Randomly => write!(f, "randomly"),
        }
    }
}

/// A splitting scheme with its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitMethod {
    /// Interactions at or after `test_start` go to test
    ByDate { test_start: Timestamp },
    /// A seeded random `test_size` fraction goes to test
    Randomly { test_size: f64, seed: u64 },
}

impl SplitMethod {
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitMethod::ByDate { .. } => SplitKind::ByDate,
            SplitMethod::Randomly { .. } => SplitKind::Randomly,
        }
    }
}
