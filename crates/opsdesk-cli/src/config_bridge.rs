//! Bridge from `opsdesk_config::Config` to domain types.
//!
//! The config crate knows nothing about the domain crates; everything that
//! turns a config section into a runtime value lives here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use opsdesk_audit::{DetectorConfig, HttpIpLookup, IpResolver};
use opsdesk_config::Config;
use opsdesk_telemetry::{LogConfig, LogFormat};

/// Data file used when `storage.data_path` is unset.
const DEFAULT_DATA_FILE: &str = "data.json";

/// Convert config to [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    // Runs before the subscriber exists; validation already rejects bad formats.
    let format = cfg.logging.format.parse::<LogFormat>().unwrap_or_default();

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    log_config
}

/// Convert config to [`DetectorConfig`].
pub(crate) fn to_detector_config(cfg: &Config) -> DetectorConfig {
    let d = &cfg.detector;
    DetectorConfig {
        window_entries: d.window_entries,
        lookback: TimeDelta::hours(i64::from(d.lookback_hours)),
        failed_action_threshold: d.failed_action_threshold,
        failed_action_interval: TimeDelta::minutes(i64::from(d.failed_action_interval_mins)),
        secret_access_threshold: d.secret_access_threshold,
        secret_access_interval: TimeDelta::minutes(i64::from(d.secret_access_interval_mins)),
        volume_threshold: d.volume_threshold,
        volume_interval: TimeDelta::minutes(i64::from(d.volume_interval_mins)),
        deletion_threshold: d.deletion_threshold,
        distinct_ip_threshold: d.distinct_ip_threshold,
    }
}

/// Build the IP resolver from `[audit]`.
///
/// A lookup client that cannot be built degrades to a disabled resolver;
/// the audit trail then records the unknown sentinel.
pub(crate) fn to_ip_resolver(cfg: &Config) -> IpResolver {
    let audit = &cfg.audit;
    if !audit.ip_lookup_enabled {
        return IpResolver::disabled().with_unknown(&audit.unknown_ip);
    }

    match HttpIpLookup::new(
        &audit.ip_lookup_url,
        Duration::from_secs(audit.ip_lookup_timeout_secs),
    ) {
        Ok(lookup) => IpResolver::new(Arc::new(lookup)).with_unknown(&audit.unknown_ip),
        Err(e) => {
            tracing::warn!(error = %e, "IP lookup client unavailable; recording unknown IP");
            IpResolver::disabled().with_unknown(&audit.unknown_ip)
        },
    }
}

/// Resolve the data file: `storage.data_path`, else `~/.opsdesk/data.json`.
///
/// # Errors
///
/// Returns an error if no path is configured and no home directory exists.
pub(crate) fn data_path(cfg: &Config) -> anyhow::Result<PathBuf> {
    if let Some(path) = &cfg.storage.data_path {
        return Ok(PathBuf::from(path));
    }
    let home = opsdesk_config::loader::home_directory()?;
    Ok(home.join(".opsdesk").join(DEFAULT_DATA_FILE))
}

/// Requested page size, defaulted and clamped to `[query]` bounds.
pub(crate) fn page_size(cfg: &Config, requested: Option<usize>) -> usize {
    requested
        .unwrap_or(cfg.query.default_page_size)
        .clamp(1, cfg.query.max_page_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_mapping() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.directives = vec!["opsdesk_audit=trace".to_owned()];

        let lc = to_log_config(&cfg);
        assert_eq!(lc.level, "debug");
        assert_eq!(lc.format, LogFormat::Json);
        assert_eq!(lc.directives, vec!["opsdesk_audit=trace"]);
    }

    #[test]
    fn test_log_format_uses_telemetry_parser() {
        let mut cfg = Config::default();
        cfg.logging.format = " Compact ".to_owned();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);

        cfg.logging.format = "fancy".to_owned();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Pretty);
    }

    #[test]
    fn test_detector_defaults_match() {
        let mapped = to_detector_config(&Config::default());
        assert_eq!(mapped, DetectorConfig::default());
    }

    #[test]
    fn test_detector_overrides() {
        let mut cfg = Config::default();
        cfg.detector.volume_threshold = 0;
        cfg.detector.lookback_hours = 2;
        let mapped = to_detector_config(&cfg);
        assert_eq!(mapped.volume_threshold, 0);
        assert_eq!(mapped.lookback, TimeDelta::hours(2));
    }

    #[test]
    fn test_explicit_data_path() {
        let mut cfg = Config::default();
        cfg.storage.data_path = Some("/srv/opsdesk/data.json".to_owned());
        assert_eq!(
            data_path(&cfg).unwrap(),
            PathBuf::from("/srv/opsdesk/data.json")
        );
    }

    #[test]
    fn test_page_size_clamped() {
        let cfg = Config::default();
        assert_eq!(page_size(&cfg, None), 50);
        assert_eq!(page_size(&cfg, Some(0)), 1);
        assert_eq!(page_size(&cfg, Some(10_000)), 500);
    }

    #[tokio::test]
    async fn test_disabled_lookup_uses_unknown_sentinel() {
        let mut cfg = Config::default();
        cfg.audit.ip_lookup_enabled = false;
        cfg.audit.unknown_ip = "n/a".to_owned();
        assert_eq!(to_ip_resolver(&cfg).resolve().await, "n/a");
    }
}
