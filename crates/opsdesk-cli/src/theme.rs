//! CLI theme and styling.

use colored::Colorize;
use opsdesk_audit::Severity;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(72).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format an access outcome.
    pub(crate) fn decision(allowed: bool) -> String {
        if allowed {
            "ALLOWED".green().bold().to_string()
        } else {
            "DENIED".red().bold().to_string()
        }
    }

    /// Format an alert severity.
    pub(crate) fn severity(level: Severity) -> String {
        let label = level.to_string().to_uppercase();
        match level {
            Severity::Low => label.blue().to_string(),
            Severity::Medium => label.yellow().to_string(),
            Severity::High => label.red().bold().to_string(),
        }
    }

    /// Format an entry id (shortened).
    pub(crate) fn short_id(id: &str) -> String {
        let short: String = id.chars().take(8).collect();
        format!("{}", short.cyan())
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
        dt.format("%Y-%m-%d %H:%M:%S").to_string().dimmed().to_string()
    }
}
