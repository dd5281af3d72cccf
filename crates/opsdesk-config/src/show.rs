//! Source-annotated display for `config show`.

use std::fmt::Write as _;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Config files that were loaded, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowFormat {
    /// TOML with a trailing comment naming each value's layer.
    #[default]
    Toml,
    /// JSON, unannotated.
    Json,
}

fn serialize_err(e: impl std::fmt::Display) -> ConfigError {
    ConfigError::SerializeError(e.to_string())
}

impl ResolvedConfig {
    /// Render the configuration, optionally limited to one section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails or
    /// `section` does not exist.
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => self.show_toml(section),
            ShowFormat::Json => self.show_json(section),
        }
    }

    fn section_value(&self, name: &str) -> ConfigResult<toml::Value> {
        let val = toml::Value::try_from(&self.config).map_err(serialize_err)?;
        val.get(name)
            .cloned()
            .ok_or_else(|| ConfigError::SerializeError(format!("unknown section '{name}'")))
    }

    fn show_toml(&self, section: Option<&str>) -> ConfigResult<String> {
        let toml_str = match section {
            Some(name) => toml::to_string_pretty(&self.section_value(name)?),
            None => toml::to_string_pretty(&self.config),
        }
        .map_err(serialize_err)?;

        let mut output = String::new();
        output.push_str("# Resolved OpsDesk configuration\n");
        output.push_str("# Source annotations: [defaults] [system] [user] [explicit] [env]\n");

        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (lowest precedence first):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                let _ = writeln!(output, "#   {}. {path}", i.saturating_add(1));
            }
        }
        output.push('\n');

        let mut current = section.unwrap_or("").to_owned();
        for line in toml_str.lines() {
            let trimmed = line.trim();
            if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
                header.clone_into(&mut current);
            }
            match self.annotate_line(trimmed, &current) {
                Some(tag) => {
                    let _ = writeln!(output, "{line}  # [{tag}]");
                },
                None => {
                    output.push_str(line);
                    output.push('\n');
                },
            }
        }

        Ok(output)
    }

    fn show_json(&self, section: Option<&str>) -> ConfigResult<String> {
        match section {
            Some(name) => serde_json::to_string_pretty(&self.section_value(name)?),
            None => serde_json::to_string_pretty(&self.config),
        }
        .map_err(serialize_err)
    }

    fn annotate_line(&self, trimmed: &str, section: &str) -> Option<&'static str> {
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let key = trimmed.split('=').next()?.trim();
        let path = if section.is_empty() {
            key.to_owned()
        } else {
            format!("{section}.{key}")
        };
        self.field_sources.get(&path).map(|layer| layer.tag())
    }

    /// Every file checked during loading, lowest precedence first.
    #[must_use]
    pub fn config_paths(home_dir: Option<&str>) -> Vec<String> {
        vec![
            crate::loader::SYSTEM_CONFIG_PATH.to_owned(),
            home_dir.map_or_else(
                || "~/.opsdesk/config.toml".to_owned(),
                |home| format!("{home}/.opsdesk/config.toml"),
            ),
            "$OPSDESK_HOME/config.toml".to_owned(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut field_sources = FieldSources::new();
        field_sources.insert("query.default_page_size".to_owned(), ConfigLayer::User);
        field_sources.insert("logging.level".to_owned(), ConfigLayer::Environment);
        ResolvedConfig {
            config: Config::default(),
            field_sources,
            loaded_files: vec!["/home/ana/.opsdesk/config.toml".to_owned()],
        }
    }

    #[test]
    fn test_show_toml_annotates_by_section() {
        let output = resolved().show(ShowFormat::Toml, None).unwrap();
        assert!(output.contains("Resolved OpsDesk configuration"));
        assert!(output.contains("1. /home/ana/.opsdesk/config.toml"));
        assert!(output.contains("default_page_size = 50  # [user]"));
        assert!(output.contains("# [env]"));
    }

    #[test]
    fn test_show_json_is_valid() {
        let output = resolved().show(ShowFormat::Json, None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["query"]["max_page_size"], 500);
    }

    #[test]
    fn test_show_section() {
        let output = resolved().show(ShowFormat::Toml, Some("query")).unwrap();
        assert!(output.contains("max_page_size"));
        assert!(!output.contains("ip_lookup_url"));
        assert!(output.contains("default_page_size = 50  # [user]"));
    }

    #[test]
    fn test_unknown_section() {
        let err = resolved().show(ShowFormat::Json, Some("model")).unwrap_err();
        assert!(matches!(err, ConfigError::SerializeError(_)));
    }

    #[test]
    fn test_config_paths() {
        let paths = ResolvedConfig::config_paths(Some("/home/ana"));
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], "/etc/opsdesk/config.toml");
        assert_eq!(paths[1], "/home/ana/.opsdesk/config.toml");
    }
}
