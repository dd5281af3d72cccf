//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use opsdesk_audit::{
    AuditError, AuditLogEntry, AuditResult, AuditStore, IpLookup, KvAuditStore, LogFilter, Notice,
    Notifier, PageRequest,
};
use opsdesk_core::UserId;
use opsdesk_permissions::{PermissionError, PermissionResult, Profile, ProfileStore};

/// Profile store whose backend is always unreachable.
#[derive(Debug, Default)]
pub struct FailingProfileStore {
    calls: AtomicUsize,
}

impl FailingProfileStore {
    /// Create a failing store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> PermissionResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PermissionError::StorageError("network unreachable".to_owned()))
    }
}

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn get_profile(&self, _user_id: &UserId) -> PermissionResult<Option<Profile>> {
        self.fail()
    }

    async fn put_profile(&self, _profile: &Profile) -> PermissionResult<()> {
        self.fail()
    }

    async fn list_profiles(&self) -> PermissionResult<Vec<Profile>> {
        self.fail()
    }
}

/// In-memory audit store whose reads and writes can be made to fail.
#[derive(Debug)]
pub struct MockAuditStore {
    inner: KvAuditStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    inserts: AtomicUsize,
}

impl MockAuditStore {
    /// A working in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory backend cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: KvAuditStore::in_memory().expect("in-memory audit store"),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            inserts: AtomicUsize::new(0),
        }
    }

    /// A store rejecting every read and write.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::new();
        store.set_fail_writes(true);
        store.set_fail_reads(true);
        store
    }

    /// Make inserts fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make queries and counts fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Successful inserts so far.
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> AuditResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AuditError::StorageError("read timed out".to_owned()));
        }
        Ok(())
    }
}

impl Default for MockAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MockAuditStore {
    async fn insert(&self, entry: &AuditLogEntry) -> AuditResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuditError::StorageError("insert rejected".to_owned()));
        }
        self.inner.insert(entry).await?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(
        &self,
        filter: &LogFilter,
        window: Option<PageRequest>,
    ) -> AuditResult<Vec<AuditLogEntry>> {
        self.check_reads()?;
        self.inner.query(filter, window).await
    }

    async fn count(&self, filter: &LogFilter) -> AuditResult<usize> {
        self.check_reads()?;
        self.inner.count(filter).await
    }
}

/// IP lookup that counts calls and returns a fixed answer or fails.
#[derive(Debug)]
pub struct CountingIpLookup {
    answer: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl CountingIpLookup {
    /// Lookup answering `ip`.
    #[must_use]
    pub fn answering(ip: impl Into<String>) -> Self {
        Self {
            answer: Some(ip.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Lookup that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, readable after the lookup is moved into a resolver.
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl IpLookup for CountingIpLookup {
    async fn lookup(&self) -> AuditResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| AuditError::IpLookup("lookup service unavailable".to_owned()))
    }
}

/// Notifier that keeps every notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
