//! Core error types.

use thiserror::Error;

/// Errors raised while constructing core types from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A user identifier was empty or whitespace.
    #[error("user id must not be empty")]
    EmptyUserId,

    /// A role string was not recognised.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
