//! Metadata store error types.

use std::fmt;
use thiserror::Error;

/// Class of dependent that blocked a restricted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependentKind {
    Artifacts,
    RestoreHistoryItems,
    ScheduledTasks,
}

impl DependentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artifacts => "artifacts",
            Self::RestoreHistoryItems => "restore history items",
            Self::ScheduledTasks => "scheduled tasks",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error classification for callers translating into their own
/// status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    FailedPrecondition,
    InvalidOperation,
    Internal,
}

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backup location with ID {location_id:?} has {blocker} ({count})")]
    FailedPrecondition {
        location_id: String,
        blocker: DependentKind,
        count: usize,
    },

    #[error("role {role_id} is the default role and cannot be removed")]
    IsDefaultRole { role_id: i64 },

    #[error("{op} {target}: {source}")]
    Store {
        op: &'static str,
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::FailedPrecondition { .. } => ErrorKind::FailedPrecondition,
            Self::IsDefaultRole { .. } => ErrorKind::InvalidOperation,
            Self::Store { .. }
            | Self::Database(_)
            | Self::Config(_)
            | Self::Constraint(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Attach the failing operation and its target to a raw store error.
    ///
    /// Typed errors pass through untouched.
    pub fn context(self, op: &'static str, target: impl fmt::Display) -> Self {
        match self {
            Self::Database(source) => Self::Store {
                op,
                target: target.to_string(),
                source,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<keepsafe_core::Error> for MetadataError {
    fn from(e: keepsafe_core::Error) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("json column: {e}"))
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
