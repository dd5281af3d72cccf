//! Configuration validation rules.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest page size a config may allow.
const PAGE_SIZE_CEILING: usize = 10_000;

/// Longest IP lookup timeout accepted.
const MAX_LOOKUP_TIMEOUT_SECS: u64 = 60;

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first bad field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_storage(config)?;
    validate_audit(config)?;
    validate_query(config)?;
    validate_detector(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    if config
        .storage
        .data_path
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(invalid("storage.data_path", "must not be empty when set"));
    }
    Ok(())
}

fn validate_audit(config: &Config) -> ConfigResult<()> {
    let audit = &config.audit;

    if audit.ip_lookup_timeout_secs == 0 || audit.ip_lookup_timeout_secs > MAX_LOOKUP_TIMEOUT_SECS
    {
        return Err(invalid(
            "audit.ip_lookup_timeout_secs",
            format!(
                "must be between 1 and {MAX_LOOKUP_TIMEOUT_SECS}, got {}",
                audit.ip_lookup_timeout_secs
            ),
        ));
    }

    if audit.ip_lookup_enabled
        && !(audit.ip_lookup_url.starts_with("https://")
            || audit.ip_lookup_url.starts_with("http://"))
    {
        return Err(invalid(
            "audit.ip_lookup_url",
            format!("must be an http(s) URL, got '{}'", audit.ip_lookup_url),
        ));
    }

    if audit.unknown_ip.trim().is_empty() {
        return Err(invalid("audit.unknown_ip", "must not be empty"));
    }

    Ok(())
}

fn validate_query(config: &Config) -> ConfigResult<()> {
    let query = &config.query;

    if query.default_page_size == 0 {
        return Err(invalid("query.default_page_size", "must be at least 1"));
    }
    if query.max_page_size > PAGE_SIZE_CEILING {
        return Err(invalid(
            "query.max_page_size",
            format!("must not exceed {PAGE_SIZE_CEILING}"),
        ));
    }
    if query.default_page_size > query.max_page_size {
        return Err(invalid(
            "query.default_page_size",
            format!(
                "{} exceeds max_page_size {}",
                query.default_page_size, query.max_page_size
            ),
        ));
    }

    Ok(())
}

fn validate_detector(config: &Config) -> ConfigResult<()> {
    let detector = &config.detector;

    if detector.window_entries == 0 {
        return Err(invalid("detector.window_entries", "must be at least 1"));
    }
    if detector.lookback_hours == 0 {
        return Err(invalid("detector.lookback_hours", "must be at least 1"));
    }

    let intervals = [
        ("detector.failed_action_interval_mins", detector.failed_action_interval_mins),
        ("detector.secret_access_interval_mins", detector.secret_access_interval_mins),
        ("detector.volume_interval_mins", detector.volume_interval_mins),
    ];
    for (field, minutes) in intervals {
        if minutes == 0 {
            return Err(invalid(field, "must be at least 1 minute"));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = Config::default();
        config.query.default_page_size = 0;
        assert_eq!(field_of(validate(&config)), "query.default_page_size");
    }

    #[test]
    fn test_default_page_size_above_max() {
        let mut config = Config::default();
        config.query.default_page_size = 600;
        assert_eq!(field_of(validate(&config)), "query.default_page_size");
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.audit.ip_lookup_timeout_secs = 0;
        assert_eq!(field_of(validate(&config)), "audit.ip_lookup_timeout_secs");

        config.audit.ip_lookup_timeout_secs = 61;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_lookup_url_checked_only_when_enabled() {
        let mut config = Config::default();
        config.audit.ip_lookup_url = "ftp://example.com".to_owned();
        assert_eq!(field_of(validate(&config)), "audit.ip_lookup_url");

        config.audit.ip_lookup_enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_threshold_allowed_zero_interval_rejected() {
        let mut config = Config::default();
        config.detector.volume_threshold = 0;
        assert!(validate(&config).is_ok());

        config.detector.volume_interval_mins = 0;
        assert_eq!(field_of(validate(&config)), "detector.volume_interval_mins");
    }

    #[test]
    fn test_invalid_log_level_and_format() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_blank_data_path() {
        let mut config = Config::default();
        config.storage.data_path = Some("  ".to_owned());
        assert_eq!(field_of(validate(&config)), "storage.data_path");
    }
}
