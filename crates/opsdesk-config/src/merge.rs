//! Layered merging with per-field source tracking.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/opsdesk/config.toml`).
    System,
    /// User-level configuration (`~/.opsdesk/config.toml`).
    User,
    /// File passed explicitly (`--config`).
    Explicit,
    /// Environment variable fallback.
    Environment,
}

impl ConfigLayer {
    /// Short tag used in annotated output.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Defaults => "defaults",
            Self::System => "system",
            Self::User => "user",
            Self::Explicit => "explicit",
            Self::Environment => "env",
        }
    }

    /// Whether the value was set by a file rather than defaults or env.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, Self::System | Self::User | Self::Explicit)
    }
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/opsdesk/config.toml)"),
            Self::User => write!(f, "user (~/.opsdesk/config.toml)"),
            Self::Explicit => write!(f, "explicit file (--config)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each leaf field, keyed by dotted path.
pub type FieldSources = HashMap<String, ConfigLayer>;

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Deep-merge `overlay` into `base`, recording `layer` as the source of
/// every leaf the overlay sets.
///
/// Tables merge per key. Scalars and arrays replace.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = child_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record every leaf under `val` as coming from `layer`.
pub fn record_leaves(val: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &child_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse(
            r#"
            [query]
            default_page_size = 50
            max_page_size = 500
            "#,
        );
        let overlay = parse("[query]\ndefault_page_size = 20\n");
        let mut sources = FieldSources::new();
        record_leaves(&base, "", ConfigLayer::Defaults, &mut sources);

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        assert_eq!(base["query"]["default_page_size"].as_integer(), Some(20));
        assert_eq!(base["query"]["max_page_size"].as_integer(), Some(500));
        assert_eq!(sources["query.default_page_size"], ConfigLayer::User);
        assert_eq!(sources["query.max_page_size"], ConfigLayer::Defaults);
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=info\"]\n");
        let overlay = parse("[logging]\ndirectives = [\"c=trace\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::Explicit, &mut sources);

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(sources["logging.directives"], ConfigLayer::Explicit);
    }

    #[test]
    fn test_new_section_records_all_leaves() {
        let mut base = parse("[query]\nmax_page_size = 500\n");
        let overlay = parse("[storage]\ndata_path = \"/srv/opsdesk.json\"\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::System, &mut sources);

        assert_eq!(
            base["storage"]["data_path"].as_str(),
            Some("/srv/opsdesk.json")
        );
        assert_eq!(sources["storage.data_path"], ConfigLayer::System);
    }

    #[test]
    fn test_layer_is_file() {
        assert!(ConfigLayer::User.is_file());
        assert!(ConfigLayer::Explicit.is_file());
        assert!(!ConfigLayer::Defaults.is_file());
        assert!(!ConfigLayer::Environment.is_file());
    }
}
