//! The audit recorder: turns a sensitive action into a stored entry.

use std::sync::Arc;

use opsdesk_core::Principal;

use crate::client::{ClientInfo, DeviceClass, IpResolver};
use crate::entry::{ActionType, AuditLogEntry, AuditMetadata};
use crate::error::AuditResult;
use crate::storage::AuditStore;

/// Records audit entries for the signed-in session.
///
/// Each call produces one independent entry with a fresh id, so concurrent
/// calls never merge or overwrite each other.
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    ip: IpResolver,
    user_agent: Option<String>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("ip", &self.ip)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl AuditRecorder {
    /// Create a recorder writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, ip: IpResolver) -> Self {
        Self {
            store,
            ip,
            user_agent: None,
        }
    }

    /// Set the client user agent recorded on every entry.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Capture the current client fingerprint.
    pub async fn client_info(&self) -> ClientInfo {
        ClientInfo {
            ip_address: self.ip.resolve().await,
            device: DeviceClass::from_user_agent(self.user_agent.as_deref()),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Record an action, returning the stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the entry.
    pub async fn try_log_action(
        &self,
        principal: &Principal,
        action_type: ActionType,
        subject_id: Option<&str>,
        description: &str,
        metadata: AuditMetadata,
    ) -> AuditResult<AuditLogEntry> {
        let client = self.client_info().await;
        let entry = AuditLogEntry::create(
            principal,
            action_type,
            subject_id.map(str::to_owned),
            description,
            metadata,
            client,
        );
        self.store.insert(&entry).await?;

        tracing::debug!(
            entry_id = %entry.id,
            user_id = %entry.user_id,
            action = %entry.action_type,
            record_id = entry.record_id.as_deref().unwrap_or(""),
            "audit entry recorded"
        );
        Ok(entry)
    }

    /// Record an action on a best-effort basis.
    ///
    /// A failed write is logged and swallowed: the user's action has already
    /// happened and must not be reported as failed because its audit row
    /// could not be written. Returns the entry when it was stored.
    pub async fn log_action(
        &self,
        principal: &Principal,
        action_type: ActionType,
        subject_id: Option<&str>,
        description: &str,
        metadata: AuditMetadata,
    ) -> Option<AuditLogEntry> {
        match self
            .try_log_action(principal, action_type, subject_id, description, metadata)
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    user_id = %principal.id,
                    action = %action_type,
                    record_id = subject_id.unwrap_or(""),
                    error = %e,
                    "failed to record audit entry"
                );
                None
            },
        }
    }

    /// Clear session-scoped state. Call when the user signs out.
    pub fn on_sign_out(&self) {
        self.ip.invalidate();
        tracing::debug!("audit recorder session state cleared");
    }
}
