//! Lifecycle states for backups, restores and dumps, plus the other
//! enumerated backup attributes.
//!
//! States are persisted as lowercase snake_case strings. Parsing is strict:
//! anything outside the known set is rejected before it reaches the store.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! status_strings {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Every state, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(Error::InvalidValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Backup artifact status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Pending,
    InProgress,
    Paused,
    Success,
    Error,
    Deleting,
    FailedToDelete,
    CleanupInProgress,
}

status_strings!(BackupStatus, "backup status", {
    Pending => "pending",
    InProgress => "in_progress",
    Paused => "paused",
    Success => "success",
    Error => "error",
    Deleting => "deleting",
    FailedToDelete => "failed_to_delete",
    CleanupInProgress => "cleanup_in_progress",
});

impl BackupStatus {
    /// The backup job has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::FailedToDelete)
    }

    /// Transient states entered while an artifact is being torn down.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Deleting | Self::CleanupInProgress)
    }

    /// Whether an artifact in this state may move to `next`.
    ///
    /// A finished backup never restarts; it can only be torn down.
    pub fn can_transition_to(&self, next: BackupStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Pending | Self::InProgress | Self::Paused => true,
            Self::Success | Self::Error | Self::FailedToDelete => next.is_removal(),
            Self::Deleting => matches!(next, Self::FailedToDelete | Self::CleanupInProgress),
            Self::CleanupInProgress => matches!(next, Self::Deleting | Self::FailedToDelete),
        }
    }

    pub fn validate_transition(&self, next: BackupStatus) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                kind: "backup status",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Restore operation status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStatus {
    InProgress,
    Success,
    Error,
}

status_strings!(RestoreStatus, "restore status", {
    InProgress => "in_progress",
    Success => "success",
    Error => "error",
});

impl RestoreStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    pub fn validate_transition(&self, next: RestoreStatus) -> Result<()> {
        if *self == next || !self.is_terminal() {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                kind: "restore status",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Diagnostic dump status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpStatus {
    InProgress,
    Success,
    Error,
}

status_strings!(DumpStatus, "dump status", {
    InProgress => "in_progress",
    Success => "success",
    Error => "error",
});

impl DumpStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// How a backup captures data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataModel {
    Physical,
    Logical,
}

status_strings!(DataModel, "data model", {
    Physical => "physical",
    Logical => "logical",
});

/// Backup scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMode {
    Snapshot,
    Incremental,
    Pitr,
}

status_strings!(BackupMode, "backup mode", {
    Snapshot => "snapshot",
    Incremental => "incremental",
    Pitr => "pitr",
});
