#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for OpsDesk.
//!
//! # Usage
//!
//! ```rust,no_run
//! use opsdesk_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("page size: {}", resolved.config.query.default_page_size);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** (`opsdesk --config <path>`)
//! 2. **User** (`~/.opsdesk/config.toml`, else `$OPSDESK_HOME/config.toml`)
//! 3. **System** (`/etc/opsdesk/config.toml`)
//! 4. **Environment variables** (`OPSDESK_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml`)
//!
//! # Design
//!
//! This crate has no dependencies on other OpsDesk crates. The binary maps
//! sections onto domain types (`DetectorConfig`, `LogConfig`, ...) at
//! startup.

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// File discovery and layered loading.
pub mod loader;
/// Layer merging with source tracking.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::LoadOptions;
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load with the full precedence chain, optionally adding an explicit
    /// file on top.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed, the explicit file
    /// is missing, or the result fails validation.
    pub fn load(explicit_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        let mut options = LoadOptions::from_environment()?;
        options.explicit_file = explicit_file.map(std::path::Path::to_path_buf);
        loader::load(&options)
    }

    /// Load with `home_dir` standing in for `~/.opsdesk`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_with_home(
        explicit_file: Option<&std::path::Path>,
        home_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        let options = LoadOptions {
            system_path: Some(loader::SYSTEM_CONFIG_PATH.into()),
            user_dir: Some(home_dir.to_path_buf()),
            explicit_file: explicit_file.map(std::path::Path::to_path_buf),
            env_vars: env::collect_env_vars(),
        };
        loader::load(&options)
    }

    /// Load a single file with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, malformed or
    /// invalid.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
