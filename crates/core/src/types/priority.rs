//! Note priority.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Sort rank given to notes whose stored priority is missing or unrecognized.
pub const UNRANKED: u8 = 4;

/// Error returned when a string is not one of the known priority labels.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct PriorityError(pub String);

/// How urgent a note is.
///
/// Stored as its label (`High`, `Medium`, `Low`) so that rows written by
/// older clients with other labels remain readable; those sort after `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    /// All priorities in rank order.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Parse a priority label. Matching is exact, as stored.
    ///
    /// # Errors
    ///
    /// Returns `PriorityError` for any other label.
    pub fn parse(s: &str) -> Result<Self, PriorityError> {
        match s {
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            other => Err(PriorityError(other.to_owned())),
        }
    }

    /// The stored label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Sort rank: High=1, Medium=2, Low=3.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Rank of an optional priority, with [`UNRANKED`] for `None`.
    #[must_use]
    pub fn rank_of(priority: Option<Self>) -> u8 {
        priority.map_or(UNRANKED, |p| p.rank())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
