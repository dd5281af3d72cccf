//! Request context for correlating log lines of one operation.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data carried through one operation (a CLI command, a page
/// check, an export).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique id of this request.
    pub request_id: Uuid,
    /// Shared by a request and all of its children.
    pub correlation_id: Uuid,
    /// Parent request, if this is a sub-request.
    pub parent_id: Option<Uuid>,
    /// Acting user, once known.
    pub user_id: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Component that created the context (`cli`, `audit`, ...).
    pub component: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// Free-form context.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// A fresh root context.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            user_id: None,
            started_at: Utc::now(),
            component: component.into(),
            operation: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A child context sharing this context's correlation id and user.
    #[must_use]
    pub fn child(&self, component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            user_id: self.user_id.clone(),
            started_at: Utc::now(),
            component: component.into(),
            operation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the acting user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add a metadata pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Elapsed milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// First eight hex digits of the request id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// A span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.short_id(),
            correlation_id = %self.correlation_id,
            component = %self.component,
            operation = self.operation.as_deref(),
            user_id = self.user_id.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Enters a context's span and logs its duration on drop.
///
/// Synchronous scopes only; for async work use
/// `tracing::Instrument::instrument(fut, ctx.span())`.
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}
