//! CLI handlers for the `opsdesk config` subcommand.

use std::path::Path;

use anyhow::Result;
use opsdesk_config::env::ENV_MAPPINGS;
use opsdesk_config::{Config, ResolvedConfig, ShowFormat};

use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(explicit: Option<&Path>, format: &str, section: Option<&str>) -> Result<()> {
    let resolved = Config::load(explicit)?;

    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    println!("{}", resolved.show(show_format, section)?);
    Ok(())
}

/// Validate the current configuration. Returns whether it is valid.
pub(crate) fn validate_config(explicit: Option<&Path>) -> bool {
    match Config::load(explicit) {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid."));
            if !resolved.loaded_files.is_empty() {
                println!("\nLoaded files:");
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            true
        },
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("Configuration error: {e}")));
            false
        },
    }
}

/// Show all config file paths that are checked.
pub(crate) fn show_paths() {
    let home = directories::BaseDirs::new().map(|d| d.home_dir().to_string_lossy().to_string());
    let paths = ResolvedConfig::config_paths(home.as_deref());

    println!("Configuration files checked (lowest precedence first):\n");
    for (i, path) in paths.iter().enumerate() {
        let status = if Path::new(path).exists() {
            "found"
        } else {
            "not found"
        };
        println!("  {}. {path}  {}", i.saturating_add(1), Theme::dimmed(&format!("[{status}]")));
    }
    println!("  {}. --config <path>", paths.len().saturating_add(1));

    println!("\nEnvironment variable fallbacks:");
    for mapping in ENV_MAPPINGS {
        println!("  {}", Theme::kv(mapping.var_name, mapping.field_path));
    }
}
