//! Audit-related error types.

use thiserror::Error;

/// Errors that can occur with audit logging.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An entry with the same id already exists.
    #[error("audit entry already exists: {entry_id}")]
    DuplicateEntry {
        /// The conflicting entry ID.
        entry_id: String,
    },

    /// Page number or page size of zero.
    #[error("invalid page request: page {page}, page size {page_size}")]
    InvalidPage {
        /// Requested page (1-indexed).
        page: usize,
        /// Requested page size.
        page_size: usize,
    },

    /// Client IP lookup failed.
    #[error("ip lookup failed: {0}")]
    IpLookup(String),

    /// Action type string not recognized.
    #[error("unknown action type: {0}")]
    UnknownActionType(String),
}

impl From<opsdesk_storage::StorageError> for AuditError {
    fn from(err: opsdesk_storage::StorageError) -> Self {
        match err {
            opsdesk_storage::StorageError::Serialization(msg) => Self::SerializationError(msg),
            opsdesk_storage::StorageError::AlreadyExists { key, .. } => {
                Self::DuplicateEntry { entry_id: key }
            },
            other => Self::StorageError(other.to_string()),
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
