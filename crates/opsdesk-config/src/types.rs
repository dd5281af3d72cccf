//! Configuration struct definitions.
//!
//! Every section uses `#[serde(default)]` so a partial file deserializes
//! cleanly; the defaults mirror `defaults.toml`.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where profiles and audit entries are persisted.
    pub storage: StorageSection,
    /// Audit recording.
    pub audit: AuditSection,
    /// Audit log reads.
    pub query: QuerySection,
    /// Suspicious-activity thresholds.
    pub detector: DetectorSection,
    /// Logging.
    pub logging: LoggingSection,
}

/// `[storage]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Data file path. `None` means `~/.opsdesk/data.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

/// `[audit]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Whether the public IP is looked up at all.
    pub ip_lookup_enabled: bool,
    /// Endpoint answering `{"ip": "..."}`.
    pub ip_lookup_url: String,
    /// HTTP timeout for the lookup.
    pub ip_lookup_timeout_secs: u64,
    /// IP recorded when the lookup fails or is disabled.
    pub unknown_ip: String,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            ip_lookup_enabled: true,
            ip_lookup_url: "https://api.ipify.org?format=json".to_owned(),
            ip_lookup_timeout_secs: 5,
            unknown_ip: "unknown".to_owned(),
        }
    }
}

/// `[query]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySection {
    /// Page size when none is given.
    pub default_page_size: usize,
    /// Upper bound on a requested page size.
    pub max_page_size: usize,
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

/// `[detector]`
///
/// Thresholds of zero disable the corresponding check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    /// Most recent entries examined per scan.
    pub window_entries: usize,
    /// How far back a scan looks.
    pub lookback_hours: u32,
    /// Failed actions within `failed_action_interval_mins`.
    pub failed_action_threshold: usize,
    /// Window for failed actions.
    pub failed_action_interval_mins: u32,
    /// Secret views within `secret_access_interval_mins`.
    pub secret_access_threshold: usize,
    /// Window for secret views.
    pub secret_access_interval_mins: u32,
    /// Actions of any kind within `volume_interval_mins`.
    pub volume_threshold: usize,
    /// Window for overall volume.
    pub volume_interval_mins: u32,
    /// Deletions within the lookback.
    pub deletion_threshold: usize,
    /// Distinct known IPs within the lookback.
    pub distinct_ip_threshold: usize,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            window_entries: 100,
            lookback_hours: 24,
            failed_action_threshold: 5,
            failed_action_interval_mins: 15,
            secret_access_threshold: 10,
            secret_access_interval_mins: 5,
            volume_threshold: 50,
            volume_interval_mins: 10,
            deletion_threshold: 10,
            distinct_ip_threshold: 3,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level: trace, debug, info, warn or error.
    pub level: String,
    /// Output format: pretty, compact, json or full.
    pub format: String,
    /// Per-target overrides such as `opsdesk_audit=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
