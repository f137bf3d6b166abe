//! Observation classification.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of observation captured during a coding session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ObservationType {
    /// Architectural or design decision
    Decision,
    /// A bug was found and fixed
    Bugfix,
    /// New capability implemented
    Feature,
    /// Structure changed without behavior change
    Refactor,
    /// Learning how existing code or an API works
    Discovery,
    /// General change that fits no other kind
    Change,
}

impl ObservationType {
    pub const ALL_VARIANTS_STR: &'static str =
        "decision|bugfix|feature|refactor|discovery|change";

    /// Returns the string stored in the `type` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Decision => "decision",
            Self::Bugfix => "bugfix",
            Self::Feature => "feature",
            Self::Refactor => "refactor",
            Self::Discovery => "discovery",
            Self::Change => "change",
        }
    }
}

impl FromStr for ObservationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "decision" => Ok(Self::Decision),
            "bugfix" => Ok(Self::Bugfix),
            "feature" => Ok(Self::Feature),
            "refactor" => Ok(Self::Refactor),
            "discovery" => Ok(Self::Discovery),
            "change" => Ok(Self::Change),
            other => Err(CoreError::InvalidObservationType(other.to_owned())),
        }
    }
}

impl std::fmt::Display for ObservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
