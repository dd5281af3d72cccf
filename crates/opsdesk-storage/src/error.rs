//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The backing file could not be read or written.
    #[error("io error on {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A write-once key was already present.
    #[error("key already exists: {namespace}/{key}")]
    AlreadyExists {
        /// Namespace of the conflicting key.
        namespace: String,
        /// The conflicting key.
        key: String,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
