//! Audit entry types and actions.
//!
//! Every sensitive operation on the dashboard is recorded as an
//! [`AuditLogEntry`]. Entries are written once and never changed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use opsdesk_core::{Principal, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ClientInfo, DeviceClass};
use crate::error::AuditError;

/// Open JSON object used for before/after snapshots.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Kinds of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// A record was created.
    Create,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
    /// A stored password was revealed.
    PasswordViewed,
    /// A stored password was copied to the clipboard.
    PasswordCopied,
    /// The user signed in.
    Login,
    /// The user signed out.
    Logout,
    /// A sign-in attempt failed.
    LoginFailed,
    /// Data was exported.
    Export,
    /// Data was imported.
    Import,
    /// A user's role or page permissions changed.
    PermissionChanged,
    /// Navigation to a restricted page was refused.
    AccessDenied,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::PasswordViewed,
        Self::PasswordCopied,
        Self::Login,
        Self::Logout,
        Self::LoginFailed,
        Self::Export,
        Self::Import,
        Self::PermissionChanged,
        Self::AccessDenied,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::PasswordViewed => "PASSWORD_VIEWED",
            Self::PasswordCopied => "PASSWORD_COPIED",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Export => "EXPORT",
            Self::Import => "IMPORT",
            Self::PermissionChanged => "PERMISSION_CHANGED",
            Self::AccessDenied => "ACCESS_DENIED",
        }
    }

    /// Whether this records a failed or refused action.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::LoginFailed | Self::AccessDenied)
    }

    /// Whether this records access to a stored secret.
    #[must_use]
    pub fn is_secret_access(self) -> bool {
        matches!(self, Self::PasswordViewed | Self::PasswordCopied)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| AuditError::UnknownActionType(s.to_owned()))
    }
}

/// Caller-supplied details of an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditMetadata {
    /// Table or collection the record lives in.
    pub table_name: Option<String>,
    /// Record state before the action.
    pub old_data: Option<Snapshot>,
    /// Record state after the action.
    pub new_data: Option<Snapshot>,
    /// Explicit list of changed fields; computed from the snapshots if absent.
    pub changed_fields: Option<BTreeSet<String>>,
    /// Free-form context, stored as `new_data` when no snapshot is given.
    pub extra: Snapshot,
}

impl AuditMetadata {
    /// Empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table name.
    #[must_use]
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Set the before snapshot.
    #[must_use]
    pub fn old_data(mut self, data: Snapshot) -> Self {
        self.old_data = Some(data);
        self
    }

    /// Set the after snapshot.
    #[must_use]
    pub fn new_data(mut self, data: Snapshot) -> Self {
        self.new_data = Some(data);
        self
    }

    /// Override the changed field list.
    #[must_use]
    pub fn changed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add a free-form context value.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// When the action was recorded.
    pub created_at: DateTime<Utc>,
    /// Acting user.
    pub user_id: UserId,
    /// Acting user's display name (falls back to email).
    pub user_name: String,
    /// Acting user's email.
    pub user_email: String,
    /// What happened.
    pub action_type: ActionType,
    /// Table the affected record lives in.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Affected record.
    #[serde(default)]
    pub record_id: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Record state before the action.
    #[serde(default)]
    pub old_data: Option<Snapshot>,
    /// Record state after the action.
    #[serde(default)]
    pub new_data: Option<Snapshot>,
    /// Top-level fields that differ between the snapshots.
    #[serde(default)]
    pub changed_fields: BTreeSet<String>,
    /// Client IP, or the unknown sentinel.
    pub ip_address: String,
    /// Coarse device class.
    pub device: DeviceClass,
    /// Raw user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl AuditLogEntry {
    /// Build a new entry stamped with a fresh id and the current time.
    #[must_use]
    pub fn create(
        principal: &Principal,
        action_type: ActionType,
        record_id: Option<String>,
        description: impl Into<String>,
        metadata: AuditMetadata,
        client: ClientInfo,
    ) -> Self {
        Self::create_at(
            principal,
            action_type,
            record_id,
            description,
            metadata,
            client,
            Utc::now(),
        )
    }

    /// Like [`create`](Self::create) with an explicit timestamp.
    #[must_use]
    pub fn create_at(
        principal: &Principal,
        action_type: ActionType,
        record_id: Option<String>,
        description: impl Into<String>,
        metadata: AuditMetadata,
        client: ClientInfo,
        created_at: DateTime<Utc>,
    ) -> Self {
        let AuditMetadata {
            table_name,
            old_data,
            new_data,
            changed_fields,
            extra,
        } = metadata;

        let new_data = match new_data {
            Some(data) => Some(data),
            None if !extra.is_empty() => Some(extra),
            None => None,
        };
        let changed_fields = changed_fields
            .unwrap_or_else(|| diff_fields(old_data.as_ref(), new_data.as_ref()));

        Self {
            id: Uuid::new_v4(),
            created_at,
            user_id: principal.id.clone(),
            user_name: principal.display_name().to_owned(),
            user_email: principal.email.clone(),
            action_type,
            table_name,
            record_id,
            description: description.into(),
            old_data,
            new_data,
            changed_fields,
            ip_address: client.ip_address,
            device: client.device,
            user_agent: client.user_agent,
        }
    }
}

/// Top-level keys whose values differ between two snapshots.
///
/// A key present on one side only counts as changed. With only one snapshot
/// there is nothing to compare against and the result is empty.
#[must_use]
pub fn diff_fields(old: Option<&Snapshot>, new: Option<&Snapshot>) -> BTreeSet<String> {
    let (Some(old), Some(new)) = (old, new) else {
        return BTreeSet::new();
    };

    old.keys()
        .chain(new.keys())
        .filter(|key| old.get(*key) != new.get(*key))
        .cloned()
        .collect()
}
