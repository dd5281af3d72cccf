//! Permission error types.

use thiserror::Error;

/// Errors that can occur while reading or writing profiles.
///
/// None of these ever reach a navigation decision: the resolver turns them
/// into a fail-open grant.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The profile backend failed.
    #[error("profile store error: {0}")]
    StorageError(String),

    /// A stored profile could not be decoded.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// No profile exists for the user.
    #[error("profile not found: {user_id}")]
    ProfileNotFound {
        /// The user whose profile is missing.
        user_id: String,
    },
}

impl From<opsdesk_storage::StorageError> for PermissionError {
    fn from(err: opsdesk_storage::StorageError) -> Self {
        match err {
            opsdesk_storage::StorageError::Serialization(msg) => Self::SerializationError(msg),
            other => Self::StorageError(other.to_string()),
        }
    }
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;
