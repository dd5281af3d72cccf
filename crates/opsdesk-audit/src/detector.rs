//! Heuristics over a user's recent audit entries.
//!
//! Alerts are advisory and recomputed on every check; nothing is persisted.
//! A store failure produces an empty report and a warning rather than an
//! error, so callers can run the check on page load without guarding it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use opsdesk_core::UserId;
use serde::{Deserialize, Serialize};

use crate::client::UNKNOWN_IP;
use crate::entry::{ActionType, AuditLogEntry};
use crate::error::AuditResult;
use crate::filter::{LogFilter, PageRequest};
use crate::storage::AuditStore;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a look.
    Low,
    /// Unusual.
    Medium,
    /// Likely abuse.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Which heuristic fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Clustered failed logins or denied navigations.
    FailedActions,
    /// Many password reveals or copies in a short time.
    SecretAccessBurst,
    /// Abnormal number of actions in a short time.
    HighVolume,
    /// Many deletions.
    MassDeletion,
    /// Activity from several IP addresses.
    MultipleIps,
}

/// A derived security alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAlert {
    /// Heuristic that produced the alert.
    pub kind: AlertKind,
    /// Human-readable explanation.
    pub message: String,
    /// How serious it is.
    pub severity: Severity,
}

/// Result of a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Whether any alert fired.
    pub has_alerts: bool,
    /// Alerts, most severe first.
    pub alerts: Vec<SecurityAlert>,
}

impl ActivityReport {
    fn from_alerts(mut alerts: Vec<SecurityAlert>) -> Self {
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        Self {
            has_alerts: !alerts.is_empty(),
            alerts,
        }
    }
}

/// Thresholds for the heuristics. A threshold of zero disables its
/// heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Most recent entries examined.
    pub window_entries: usize,
    /// How far back entries are considered.
    pub lookback: TimeDelta,
    /// Failed actions that trigger [`AlertKind::FailedActions`].
    pub failed_action_threshold: usize,
    /// Interval the failed actions must fall within.
    pub failed_action_interval: TimeDelta,
    /// Secret accesses that trigger [`AlertKind::SecretAccessBurst`].
    pub secret_access_threshold: usize,
    /// Interval the secret accesses must fall within.
    pub secret_access_interval: TimeDelta,
    /// Actions that trigger [`AlertKind::HighVolume`].
    pub volume_threshold: usize,
    /// Interval the actions must fall within.
    pub volume_interval: TimeDelta,
    /// Deletions in the window that trigger [`AlertKind::MassDeletion`].
    pub deletion_threshold: usize,
    /// Distinct known IPs in the window that trigger
    /// [`AlertKind::MultipleIps`].
    pub distinct_ip_threshold: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_entries: 100,
            lookback: TimeDelta::hours(24),
            failed_action_threshold: 5,
            failed_action_interval: TimeDelta::minutes(15),
            secret_access_threshold: 10,
            secret_access_interval: TimeDelta::minutes(5),
            volume_threshold: 50,
            volume_interval: TimeDelta::minutes(10),
            deletion_threshold: 10,
            distinct_ip_threshold: 3,
        }
    }
}

/// Largest number of timestamps falling within any closed interval of
/// length `interval`.
fn max_in_interval(mut times: Vec<DateTime<Utc>>, interval: TimeDelta) -> usize {
    times.sort_unstable();
    let mut best = 0usize;
    let mut start = 0usize;
    for end in 0..times.len() {
        while start < end && times[end].signed_duration_since(times[start]) > interval {
            start = start.saturating_add(1);
        }
        best = best.max(end.saturating_sub(start).saturating_add(1));
    }
    best
}

/// Scans recent entries for suspicious patterns.
#[derive(Clone)]
pub struct SuspiciousActivityDetector {
    store: Arc<dyn AuditStore>,
    config: DetectorConfig,
}

impl fmt::Debug for SuspiciousActivityDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspiciousActivityDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SuspiciousActivityDetector {
    /// Create a detector with the given thresholds.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, config: DetectorConfig) -> Self {
        Self { store, config }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Check a user's activity as of now.
    pub async fn check(&self, user_id: &UserId) -> ActivityReport {
        self.check_at(user_id, Utc::now()).await
    }

    /// Check a user's activity as of `now`.
    pub async fn check_at(&self, user_id: &UserId, now: DateTime<Utc>) -> ActivityReport {
        match self.recent_entries(user_id, now).await {
            Ok(entries) => {
                let report = self.evaluate(&entries);
                if report.has_alerts {
                    tracing::info!(
                        user_id = %user_id,
                        alerts = report.alerts.len(),
                        "suspicious activity detected"
                    );
                }
                report
            },
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "suspicious activity check failed");
                ActivityReport::default()
            },
        }
    }

    async fn recent_entries(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AuditResult<Vec<AuditLogEntry>> {
        let since = now.checked_sub_signed(self.config.lookback);
        let filter = LogFilter::all()
            .user(user_id.clone())
            .between(since, Some(now));
        let window = PageRequest::new(1, self.config.window_entries.max(1))?;
        self.store.query(&filter, Some(window)).await
    }

    /// Run the heuristics over an already loaded window.
    #[must_use]
    pub fn evaluate(&self, entries: &[AuditLogEntry]) -> ActivityReport {
        let c = &self.config;
        let mut alerts = Vec::new();

        let times_of = |pred: &dyn Fn(ActionType) -> bool| -> Vec<DateTime<Utc>> {
            entries
                .iter()
                .filter(|e| pred(e.action_type))
                .map(|e| e.created_at)
                .collect()
        };

        if c.failed_action_threshold > 0 {
            let n = max_in_interval(times_of(&ActionType::is_failure), c.failed_action_interval);
            if n >= c.failed_action_threshold {
                alerts.push(SecurityAlert {
                    kind: AlertKind::FailedActions,
                    message: format!(
                        "{n} failed actions within {} minutes",
                        c.failed_action_interval.num_minutes()
                    ),
                    severity: Severity::High,
                });
            }
        }

        if c.secret_access_threshold > 0 {
            let n = max_in_interval(
                times_of(&ActionType::is_secret_access),
                c.secret_access_interval,
            );
            if n >= c.secret_access_threshold {
                alerts.push(SecurityAlert {
                    kind: AlertKind::SecretAccessBurst,
                    message: format!(
                        "{n} password views or copies within {} minutes",
                        c.secret_access_interval.num_minutes()
                    ),
                    severity: Severity::High,
                });
            }
        }

        if c.volume_threshold > 0 {
            let n = max_in_interval(times_of(&|_: ActionType| true), c.volume_interval);
            if n >= c.volume_threshold {
                alerts.push(SecurityAlert {
                    kind: AlertKind::HighVolume,
                    message: format!(
                        "{n} actions within {} minutes",
                        c.volume_interval.num_minutes()
                    ),
                    severity: Severity::Medium,
                });
            }
        }

        if c.deletion_threshold > 0 {
            let n = entries
                .iter()
                .filter(|e| e.action_type == ActionType::Delete)
                .count();
            if n >= c.deletion_threshold {
                alerts.push(SecurityAlert {
                    kind: AlertKind::MassDeletion,
                    message: format!("{n} records deleted recently"),
                    severity: Severity::Medium,
                });
            }
        }

        if c.distinct_ip_threshold > 0 {
            let ips: BTreeSet<&str> = entries
                .iter()
                .map(|e| e.ip_address.as_str())
                .filter(|ip| *ip != UNKNOWN_IP && !ip.is_empty())
                .collect();
            if ips.len() >= c.distinct_ip_threshold {
                alerts.push(SecurityAlert {
                    kind: AlertKind::MultipleIps,
                    message: format!("activity from {} different IP addresses", ips.len()),
                    severity: Severity::Low,
                });
            }
        }

        ActivityReport::from_alerts(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientInfo, DeviceClass};
    use crate::entry::AuditMetadata;
    use crate::error::AuditError;
    use crate::storage::KvAuditStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use opsdesk_core::Principal;

    struct Down;

    #[async_trait]
    impl AuditStore for Down {
        async fn insert(&self, _entry: &AuditLogEntry) -> AuditResult<()> {
            Ok(())
        }

        async fn query(
            &self,
            _filter: &LogFilter,
            _window: Option<PageRequest>,
        ) -> AuditResult<Vec<AuditLogEntry>> {
            Err(AuditError::StorageError("unreachable".into()))
        }

        async fn count(&self, _filter: &LogFilter) -> AuditResult<usize> {
            Err(AuditError::StorageError("unreachable".into()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn at(minutes_ago: i64) -> DateTime<Utc> {
        now().checked_sub_signed(TimeDelta::minutes(minutes_ago)).unwrap()
    }

    fn entry(user: &str, action: ActionType, when: DateTime<Utc>, ip: &str) -> AuditLogEntry {
        let principal = Principal::new(UserId::new(user).unwrap(), format!("{user}@example.com"));
        AuditLogEntry::create_at(
            &principal,
            action,
            None,
            "x",
            AuditMetadata::new(),
            ClientInfo {
                ip_address: ip.to_owned(),
                device: DeviceClass::Desktop,
                user_agent: None,
            },
            when,
        )
    }

    async fn detector_with(entries: Vec<AuditLogEntry>) -> SuspiciousActivityDetector {
        let store = KvAuditStore::in_memory().unwrap();
        for e in &entries {
            store.insert(e).await.unwrap();
        }
        SuspiciousActivityDetector::new(Arc::new(store), DetectorConfig::default())
    }

    fn kinds(report: &ActivityReport) -> Vec<AlertKind> {
        report.alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_max_in_interval_sliding() {
        let times = vec![at(60), at(14), at(10), at(5), at(0)];
        assert_eq!(max_in_interval(times.clone(), TimeDelta::minutes(15)), 4);
        assert_eq!(max_in_interval(times, TimeDelta::minutes(5)), 2);
        assert_eq!(max_in_interval(Vec::new(), TimeDelta::minutes(5)), 0);
    }

    #[tokio::test]
    async fn test_quiet_user_has_no_alerts() {
        let d = detector_with(vec![
            entry("u-1", ActionType::Login, at(30), "10.0.0.1"),
            entry("u-1", ActionType::Update, at(20), "10.0.0.1"),
        ])
        .await;
        let report = d.check_at(&UserId::new("u-1").unwrap(), now()).await;
        assert!(!report.has_alerts);
        assert!(report.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_clustered_failures_alert_high() {
        let failures = (0..5)
            .map(|i| entry("u-1", ActionType::LoginFailed, at(i), "10.0.0.1"))
            .collect();
        let d = detector_with(failures).await;
        let report = d.check_at(&UserId::new("u-1").unwrap(), now()).await;

        assert_eq!(kinds(&report), vec![AlertKind::FailedActions]);
        assert_eq!(report.alerts[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_spread_out_failures_do_not_alert() {
        let failures = (0..5)
            .map(|i| entry("u-1", ActionType::AccessDenied, at(i * 60), "10.0.0.1"))
            .collect();
        let d = detector_with(failures).await;
        assert!(!d.check_at(&UserId::new("u-1").unwrap(), now()).await.has_alerts);
    }

    #[tokio::test]
    async fn test_multiple_alerts_sorted_by_severity() {
        let mut entries: Vec<_> = (0..10)
            .map(|i| entry("u-1", ActionType::Delete, at(i * 30), "10.0.0.1"))
            .collect();
        entries.push(entry("u-1", ActionType::Login, at(1), "10.0.0.2"));
        entries.push(entry("u-1", ActionType::Login, at(2), "10.0.0.3"));
        entries.extend((0..10).map(|_| entry("u-1", ActionType::PasswordCopied, at(0), UNKNOWN_IP)));
        let d = detector_with(entries).await;
        let report = d.check_at(&UserId::new("u-1").unwrap(), now()).await;

        assert_eq!(
            kinds(&report),
            vec![
                AlertKind::SecretAccessBurst,
                AlertKind::MassDeletion,
                AlertKind::MultipleIps,
            ]
        );
    }

    #[tokio::test]
    async fn test_other_users_and_old_entries_ignored() {
        let mut entries: Vec<_> = (0..5)
            .map(|i| entry("u-2", ActionType::LoginFailed, at(i), "10.0.0.1"))
            .collect();
        entries.extend((0..5).map(|i| entry("u-1", ActionType::LoginFailed, at(2000 + i), "10.0.0.1")));
        let d = detector_with(entries).await;
        assert!(!d.check_at(&UserId::new("u-1").unwrap(), now()).await.has_alerts);
    }

    #[tokio::test]
    async fn test_store_failure_yields_no_alerts() {
        let d = SuspiciousActivityDetector::new(Arc::new(Down), DetectorConfig::default());
        let report = d.check(&UserId::new("u-1").unwrap()).await;
        assert_eq!(report, ActivityReport::default());
    }

    #[test]
    fn test_zero_threshold_disables_heuristic() {
        let config = DetectorConfig {
            deletion_threshold: 0,
            ..DetectorConfig::default()
        };
        let d = SuspiciousActivityDetector::new(Arc::new(Down), config);
        let entries: Vec<_> = (0..20)
            .map(|i| entry("u-1", ActionType::Delete, at(i * 30), "10.0.0.1"))
            .collect();
        assert!(!d.evaluate(&entries).has_alerts);
    }
}
