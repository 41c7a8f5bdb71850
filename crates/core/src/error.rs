//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {kind}: {value:?}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("invalid {kind} transition: {from} -> {to}")]
    InvalidTransition {
        kind: &'static str,
        from: String,
        to: String,
    },

    #[error("invalid location config: {0}")]
    InvalidLocationConfig(String),

    #[error("invalid remove mode: {0:?}")]
    InvalidRemoveMode(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
