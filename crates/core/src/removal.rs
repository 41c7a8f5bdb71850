//! Removal policies for entities that other entities reference.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How to treat dependents when removing a referenced entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoveMode {
    /// Refuse the removal while any dependent exists.
    #[default]
    Restrict,
    /// Remove dependents first, children before parents.
    Cascade,
}

impl RemoveMode {
    /// Map an operator "force" flag onto a policy.
    pub fn from_force(force: bool) -> Self {
        if force { Self::Cascade } else { Self::Restrict }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restrict => "restrict",
            Self::Cascade => "cascade",
        }
    }
}

impl FromStr for RemoveMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "restrict" => Ok(Self::Restrict),
            "cascade" => Ok(Self::Cascade),
            other => Err(Error::InvalidRemoveMode(other.to_string())),
        }
    }
}

impl fmt::Display for RemoveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
