//! Service wiring shared by every command.

use std::path::Path;
use std::sync::Arc;

use opsdesk_audit::{
    AuditQuery, AuditRecorder, IpResolver, KvAuditStore, Notice, Notifier,
    SuspiciousActivityDetector,
};
use opsdesk_config::Config;
use opsdesk_permissions::{KvProfileStore, PermissionResolver};
use opsdesk_storage::{FileKvStore, KvStore};

use crate::config_bridge;
use crate::theme::Theme;

/// Prints user notices to stderr so stdout stays clean for exports.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}", Theme::error(&notice.title));
        eprintln!("  {}", Theme::dimmed(&notice.detail));
    }
}

/// Everything a command needs, built over one key-value backend.
pub(crate) struct Services {
    pub(crate) config: Config,
    pub(crate) profiles: Arc<KvProfileStore>,
    pub(crate) resolver: PermissionResolver,
    pub(crate) recorder: AuditRecorder,
    pub(crate) query: AuditQuery,
    pub(crate) detector: SuspiciousActivityDetector,
}

impl Services {
    /// Open the data file at `path`.
    pub(crate) fn open(config: Config, path: &Path) -> anyhow::Result<Self> {
        let kv = FileKvStore::open(path)?;
        tracing::debug!(path = %path.display(), "opened data file");
        let ip = config_bridge::to_ip_resolver(&config);
        Self::over(Arc::new(kv), config, ip, Arc::new(TerminalNotifier))
    }

    /// Wire the services over an arbitrary backend.
    pub(crate) fn over(
        kv: Arc<dyn KvStore>,
        config: Config,
        ip: IpResolver,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let profiles = Arc::new(KvProfileStore::new(Arc::clone(&kv))?);
        let audit_store = Arc::new(KvAuditStore::new(kv)?);

        Ok(Self {
            resolver: PermissionResolver::new(profiles.clone()),
            recorder: AuditRecorder::new(audit_store.clone(), ip)
                .with_user_agent(concat!("opsdesk-cli/", env!("CARGO_PKG_VERSION"))),
            query: AuditQuery::new(audit_store.clone(), notifier),
            detector: SuspiciousActivityDetector::new(
                audit_store,
                config_bridge::to_detector_config(&config),
            ),
            profiles,
            config,
        })
    }
}
