//! Configuration error types.

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the file (or `<embedded defaults>`).
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A value failed validation.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Failed to render the resolved configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(String),

    /// No home directory could be determined.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
