//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml`
//! 2. Merge `/etc/opsdesk/config.toml`
//! 3. Merge `~/.opsdesk/config.toml`, or `$OPSDESK_HOME/config.toml` when
//!    the former is absent
//! 4. Merge the explicit `--config` file, which must exist
//! 5. Apply `OPSDESK_*` fallbacks to fields no file set
//! 6. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{HOME_VAR, apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/opsdesk/config.toml";

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Inputs to [`load`].
///
/// [`LoadOptions::from_environment`] is what the binary uses; tests build
/// one by hand so nothing touches the real home directory or process env.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// System config path. `None` skips the layer.
    pub system_path: Option<PathBuf>,
    /// Directory holding the user `config.toml` (normally `~/.opsdesk`).
    pub user_dir: Option<PathBuf>,
    /// Explicit file. Missing is an error, unlike the other layers.
    pub explicit_file: Option<PathBuf>,
    /// `OPSDESK_*` variables.
    pub env_vars: HashMap<String, String>,
}

impl LoadOptions {
    /// Options from the real environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no home directory can be found.
    pub fn from_environment() -> ConfigResult<Self> {
        Ok(Self {
            system_path: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            user_dir: Some(home_directory()?.join(".opsdesk")),
            explicit_file: None,
            env_vars: collect_env_vars(),
        })
    }

    /// Use `dir` as the `.opsdesk` directory, bypassing discovery.
    #[must_use]
    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    /// Merge `path` above the user layer.
    #[must_use]
    pub fn with_explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Set one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }
}

/// Load the layered configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any file is unreadable, oversized or
/// malformed, the explicit file is missing, or the merged result fails
/// validation.
pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    let mut apply = |overlay: &toml::Value, path: &Path, layer: ConfigLayer| {
        deep_merge_tracking(&mut merged, overlay, "", layer, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), layer = layer.tag(), "loaded config file");
    };

    if let Some(system_path) = &options.system_path {
        if let Some(overlay) = try_load_file(system_path)? {
            apply(&overlay, system_path, ConfigLayer::System);
        }
    }

    if let Some((overlay, path)) = load_user_layer(options)? {
        apply(&overlay, &path, ConfigLayer::User);
    }

    if let Some(explicit) = &options.explicit_file {
        let overlay = try_load_file(explicit)?.ok_or_else(|| ConfigError::ReadError {
            path: explicit.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        apply(&overlay, explicit, ConfigLayer::Explicit);
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &options.env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// `~/.opsdesk/config.toml`, falling back to `$OPSDESK_HOME/config.toml`.
fn load_user_layer(options: &LoadOptions) -> ConfigResult<Option<(toml::Value, PathBuf)>> {
    if let Some(dir) = &options.user_dir {
        let path = dir.join("config.toml");
        if let Some(overlay) = try_load_file(&path)? {
            return Ok(Some((overlay, path)));
        }
    }

    let Some(raw) = options.env_vars.get(HOME_VAR) else {
        return Ok(None);
    };
    let Some(dir) = PathBuf::from(raw).canonicalize().ok().filter(|p| p.is_dir()) else {
        tracing::warn!(path = %raw, "OPSDESK_HOME is not a directory; ignoring");
        return Ok(None);
    };
    let path = dir.join("config.toml");
    Ok(try_load_file(&path)?.map(|overlay| (overlay, path)))
}

/// Load a single file with no layering, env fallbacks or defaults merge.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, oversized,
/// malformed or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Size is checked after the read so there is no stat/read race.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Determine the user's home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if none can be found.
pub fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_defaults_only() {
        let resolved = load(&LoadOptions::default()).unwrap();
        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources["query.default_page_size"],
            ConfigLayer::Defaults
        );
    }

    #[test]
    fn test_layer_precedence() {
        let system = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        let explicit = tempfile::tempdir().unwrap();

        let system_path = write(
            system.path(),
            "config.toml",
            "[query]\ndefault_page_size = 10\nmax_page_size = 100\n",
        );
        write(user.path(), "config.toml", "[query]\ndefault_page_size = 20\n");
        let explicit_path = write(explicit.path(), "ops.toml", "[logging]\nlevel = \"warn\"\n");

        let options = LoadOptions {
            system_path: Some(system_path),
            ..LoadOptions::default()
        }
        .with_user_dir(user.path())
        .with_explicit_file(&explicit_path);

        let resolved = load(&options).unwrap();

        assert_eq!(resolved.config.query.default_page_size, 20);
        assert_eq!(resolved.config.query.max_page_size, 100);
        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.loaded_files.len(), 3);
        assert_eq!(resolved.field_sources["query.default_page_size"], ConfigLayer::User);
        assert_eq!(resolved.field_sources["query.max_page_size"], ConfigLayer::System);
        assert_eq!(resolved.field_sources["logging.level"], ConfigLayer::Explicit);
    }

    #[test]
    fn test_env_is_fallback_only() {
        let user = tempfile::tempdir().unwrap();
        write(user.path(), "config.toml", "[logging]\nlevel = \"warn\"\n");

        let options = LoadOptions::default()
            .with_user_dir(user.path())
            .with_env("OPSDESK_LOG_LEVEL", "trace")
            .with_env("OPSDESK_LOG_FORMAT", "json")
            .with_env("OPSDESK_DATA_PATH", "/srv/opsdesk/data.json");

        let resolved = load(&options).unwrap();

        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.config.logging.format, "json");
        assert_eq!(
            resolved.config.storage.data_path.as_deref(),
            Some("/srv/opsdesk/data.json")
        );
        assert_eq!(resolved.field_sources["logging.format"], ConfigLayer::Environment);
    }

    #[test]
    fn test_opsdesk_home_used_when_user_file_absent() {
        let empty = tempfile::tempdir().unwrap();
        let alt = tempfile::tempdir().unwrap();
        write(alt.path(), "config.toml", "[audit]\nip_lookup_enabled = false\n");

        let options = LoadOptions::default()
            .with_user_dir(empty.path())
            .with_env(HOME_VAR, alt.path().display().to_string());

        let resolved = load(&options).unwrap();
        assert!(!resolved.config.audit.ip_lookup_enabled);
        assert_eq!(resolved.loaded_files.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let options = LoadOptions::default().with_explicit_file("/nonexistent/opsdesk.toml");
        assert!(matches!(load(&options), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.toml", "[query\n");
        let options = LoadOptions::default().with_explicit_file(&path);
        assert!(matches!(load(&options), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_merged_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ops.toml", "[query]\ndefault_page_size = 0\n");
        let options = LoadOptions::default().with_explicit_file(&path);
        assert!(matches!(
            load(&options),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("# padding\n");
        body.push_str(&"#".repeat(1_048_577));
        let path = write(dir.path(), "big.toml", &body);
        assert!(matches!(
            try_load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_file_single() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ops.toml", "[detector]\nvolume_threshold = 0\n");
        let config = load_file(&path).unwrap();
        assert_eq!(config.detector.volume_threshold, 0);
        assert_eq!(config.detector.window_entries, 100);
    }
}
