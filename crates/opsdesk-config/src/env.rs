//! Environment variable fallbacks.
//!
//! Env vars are fallback, not override: a mapping only applies to a field
//! that no config file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Prefix of every variable this crate reads.
pub const ENV_PREFIX: &str = "OPSDESK_";

/// Environment variable naming an alternate `~/.opsdesk` directory.
pub const HOME_VAR: &str = "OPSDESK_HOME";

/// Mapping from environment variable name to config field path.
#[derive(Debug, Clone, Copy)]
pub struct EnvMapping {
    /// Variable name.
    pub var_name: &'static str,
    /// Dotted field path it fills.
    pub field_path: &'static str,
}

/// All supported `OPSDESK_*` mappings.
pub const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "OPSDESK_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "OPSDESK_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "OPSDESK_IP_LOOKUP_URL",
        field_path: "audit.ip_lookup_url",
    },
    EnvMapping {
        var_name: "OPSDESK_IP_LOOKUP_TIMEOUT_SECS",
        field_path: "audit.ip_lookup_timeout_secs",
    },
    EnvMapping {
        var_name: "OPSDESK_DATA_PATH",
        field_path: "storage.data_path",
    },
];

/// Apply fallbacks to fields not set by any config file.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.get(mapping.field_path).is_some_and(|l| l.is_file()) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a field in the TOML tree from a string, creating parent tables.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let value = coerce_to_toml_value(path, val);
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Coerce a string to the TOML type a known field expects.
///
/// Unparseable numbers stay strings so validation reports them.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if path == "audit.ip_lookup_timeout_secs" {
        if let Ok(i) = val.trim().parse::<i64>() {
            return toml::Value::Integer(i);
        }
    }
    toml::Value::String(val.to_owned())
}

/// Collect the `OPSDESK_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}
