//! Audit log storage trait and key-value implementation.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use opsdesk_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::entry::AuditLogEntry;
use crate::error::AuditResult;
use crate::filter::{LogFilter, PageRequest};

/// Storage backend for audit logs.
///
/// Append-only: there is deliberately no update or delete. Implementations
/// must be thread-safe and return query results newest first (see
/// [`newest_first`]).
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a new entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted or its id is taken.
    async fn insert(&self, entry: &AuditLogEntry) -> AuditResult<()>;

    /// Entries matching `filter`, newest first, optionally windowed.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn query(
        &self,
        filter: &LogFilter,
        window: Option<PageRequest>,
    ) -> AuditResult<Vec<AuditLogEntry>>;

    /// Number of entries matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn count(&self, filter: &LogFilter) -> AuditResult<usize>;
}

/// Ordering used by every query: `created_at` descending, then id.
#[must_use]
pub fn newest_first(a: &AuditLogEntry, b: &AuditLogEntry) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Filter, order and window a set of entries.
#[must_use]
pub fn select(
    entries: Vec<AuditLogEntry>,
    filter: &LogFilter,
    window: Option<PageRequest>,
) -> Vec<AuditLogEntry> {
    let mut matching: Vec<_> = entries.into_iter().filter(|e| filter.matches(e)).collect();
    matching.sort_by(newest_first);

    match window {
        Some(page) => matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect(),
        None => matching,
    }
}

const NS_ENTRIES: &str = "audit:entries";

/// Audit store on top of a [`KvStore`], one JSON document per entry keyed
/// by entry id.
#[derive(Clone)]
pub struct KvAuditStore {
    entries: ScopedKvStore,
}

impl std::fmt::Debug for KvAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvAuditStore").finish_non_exhaustive()
    }
}

impl KvAuditStore {
    /// Create a store sharing an existing key-value backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry namespace cannot be bound.
    pub fn new(store: Arc<dyn KvStore>) -> AuditResult<Self> {
        Ok(Self {
            entries: ScopedKvStore::new(store, NS_ENTRIES)?,
        })
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the entry namespace cannot be bound.
    pub fn in_memory() -> AuditResult<Self> {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    async fn load_all(&self) -> AuditResult<Vec<AuditLogEntry>> {
        Ok(self.entries.scan_json().await?)
    }
}

#[async_trait]
impl AuditStore for KvAuditStore {
    async fn insert(&self, entry: &AuditLogEntry) -> AuditResult<()> {
        self.entries
            .insert_json(&entry.id.to_string(), entry)
            .await?;
        tracing::trace!(entry_id = %entry.id, action = %entry.action_type, "audit entry stored");
        Ok(())
    }

    async fn query(
        &self,
        filter: &LogFilter,
        window: Option<PageRequest>,
    ) -> AuditResult<Vec<AuditLogEntry>> {
        Ok(select(self.load_all().await?, filter, window))
    }

    async fn count(&self, filter: &LogFilter) -> AuditResult<usize> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .filter(|e| filter.matches(e))
            .count())
    }
}
