//! Reading the audit trail: filtered, paginated queries and CSV export.
//!
//! The interactive operations never fail. When the store cannot be read
//! they log a warning, push a [`Notice`] to the [`Notifier`] so the user
//! learns why the list is empty, and return an empty result. The `try_*`
//! variants return the underlying error instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::AuditLogEntry;
use crate::error::AuditResult;
use crate::export::to_csv;
use crate::filter::{LogFilter, LogPage, PageRequest, total_pages};
use crate::storage::AuditStore;

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Short headline.
    pub title: String,
    /// Detail line.
    pub detail: String,
}

/// Sink for user-visible error messages (toast, status line, ...).
pub trait Notifier: Send + Sync {
    /// Show a notice to the user.
    fn notify(&self, notice: Notice);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        tracing::info!(title = %notice.title, detail = %notice.detail, "user notice");
    }
}

/// Query facade over an [`AuditStore`].
#[derive(Clone)]
pub struct AuditQuery {
    store: Arc<dyn AuditStore>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for AuditQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditQuery").finish_non_exhaustive()
    }
}

impl AuditQuery {
    /// Create a query facade reporting read failures through `notifier`.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Create a query facade that only logs read failures.
    #[must_use]
    pub fn with_tracing(store: Arc<dyn AuditStore>) -> Self {
        Self::new(store, Arc::new(TracingNotifier))
    }

    fn report(&self, operation: &str, error: &crate::error::AuditError) {
        tracing::warn!(operation, error = %error, "failed to read audit log");
        self.notifier.notify(Notice {
            title: "Could not load audit log".to_owned(),
            detail: error.to_string(),
        });
    }

    /// One page of matching entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn try_fetch_logs(
        &self,
        filter: &LogFilter,
        page: PageRequest,
    ) -> AuditResult<Vec<AuditLogEntry>> {
        self.store.query(filter, Some(page)).await
    }

    /// One page of matching entries, newest first. A page past the end is
    /// empty.
    pub async fn fetch_logs(&self, filter: &LogFilter, page: PageRequest) -> Vec<AuditLogEntry> {
        self.try_fetch_logs(filter, page)
            .await
            .unwrap_or_else(|e| {
                self.report("fetch_logs", &e);
                Vec::new()
            })
    }

    /// Number of matching entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn try_count_logs(&self, filter: &LogFilter) -> AuditResult<usize> {
        self.store.count(filter).await
    }

    /// Number of matching entries, zero on failure.
    pub async fn count_logs(&self, filter: &LogFilter) -> usize {
        self.try_count_logs(filter).await.unwrap_or_else(|e| {
            self.report("count_logs", &e);
            0
        })
    }

    /// A page of entries with totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn try_fetch_page(
        &self,
        filter: &LogFilter,
        page: PageRequest,
    ) -> AuditResult<LogPage> {
        let total_count = self.store.count(filter).await?;
        let entries = self.store.query(filter, Some(page)).await?;
        Ok(LogPage {
            entries,
            total_count,
            total_pages: total_pages(total_count, page.page_size()),
            page: page.page(),
        })
    }

    /// A page of entries with totals, empty on failure.
    pub async fn fetch_page(&self, filter: &LogFilter, page: PageRequest) -> LogPage {
        self.try_fetch_page(filter, page).await.unwrap_or_else(|e| {
            self.report("fetch_page", &e);
            LogPage::empty(page.page())
        })
    }

    /// Every matching entry as CSV, newest first, no pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn try_export_csv(&self, filter: &LogFilter) -> AuditResult<String> {
        let entries = self.store.query(filter, None).await?;
        tracing::debug!(rows = entries.len(), "exporting audit log");
        Ok(to_csv(&entries))
    }

    /// Every matching entry as CSV. Empty string on failure.
    pub async fn export_csv(&self, filter: &LogFilter) -> String {
        self.try_export_csv(filter).await.unwrap_or_else(|e| {
            self.report("export_csv", &e);
            String::new()
        })
    }
}
