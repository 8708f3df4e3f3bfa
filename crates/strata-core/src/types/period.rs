//! Reporting period index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reporting period, identified by its 1-based index within a run.
///
/// Periods are plain ordinals rather than calendar dates: the engine only
/// cares about ordering and offsets (`CASH[t-1]` is "one period earlier").
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Period(pub i32);

impl Period {
    /// Create a new period.
    #[must_use]
    pub fn new(index: i32) -> Self {
        Self(index)
    }

    /// The period `k` steps away (negative `k` goes backwards).
    #[must_use]
    pub fn offset(self, k: i32) -> Self {
        Self(self.0 + k)
    }

    /// Raw index.
    #[must_use]
    pub fn index(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<i32> for Period {
    fn from(index: i32) -> Self {
        Self(index)
    }
}
