//! Shared test harness for integration tests.

use std::sync::Arc;

use opsdesk_audit::{
    AuditQuery, AuditRecorder, AuditStore, DetectorConfig, IpResolver, KvAuditStore, Notifier,
    SuspiciousActivityDetector,
};
use opsdesk_permissions::{KvProfileStore, PermissionResolver, ProfileStore};
use opsdesk_storage::{KvStore, MemoryKvStore};
use opsdesk_test::{RecordingNotifier, TEST_USER_AGENT};

/// Permission and audit services sharing one key-value store.
#[allow(dead_code)]
pub struct Harness {
    /// Backing store.
    pub kv: Arc<dyn KvStore>,
    /// Profile store.
    pub profiles: Arc<KvProfileStore>,
    /// Permission resolver over `profiles`.
    pub resolver: PermissionResolver,
    /// Audit store.
    pub audit: Arc<dyn AuditStore>,
    /// Recorder writing to `audit`.
    pub recorder: AuditRecorder,
    /// Query facade over `audit`.
    pub query: AuditQuery,
    /// Detector over `audit`.
    pub detector: SuspiciousActivityDetector,
    /// Notices raised by `query`.
    pub notices: Arc<RecordingNotifier>,
}

#[allow(dead_code)]
impl Harness {
    /// Harness over a fresh in-memory store with IP lookup disabled.
    pub fn in_memory() -> Self {
        Self::over(Arc::new(MemoryKvStore::new()), IpResolver::disabled())
    }

    /// Harness over `kv`.
    pub fn over(kv: Arc<dyn KvStore>, ip: IpResolver) -> Self {
        let profiles = Arc::new(KvProfileStore::new(Arc::clone(&kv)).expect("profile store"));
        let audit: Arc<dyn AuditStore> =
            Arc::new(KvAuditStore::new(Arc::clone(&kv)).expect("audit store"));
        let notices = Arc::new(RecordingNotifier::new());

        Self {
            resolver: PermissionResolver::new(Arc::clone(&profiles) as Arc<dyn ProfileStore>),
            recorder: AuditRecorder::new(Arc::clone(&audit), ip).with_user_agent(TEST_USER_AGENT),
            query: AuditQuery::new(
                Arc::clone(&audit),
                Arc::clone(&notices) as Arc<dyn Notifier>,
            ),
            detector: SuspiciousActivityDetector::new(
                Arc::clone(&audit),
                DetectorConfig::default(),
            ),
            kv,
            profiles,
            audit,
            notices,
        }
    }
}
