//! Profile storage.
//!
//! A profile is the per-user row holding the dashboard role and the raw
//! `page_permissions` column. The column is kept as untyped JSON because the
//! backend never validated it; [`Profile::permission_set`] is where it gets
//! cleaned up.

use std::sync::Arc;

use async_trait::async_trait;
use opsdesk_core::{Role, UserId};
use opsdesk_storage::{KvStore, MemoryKvStore, ScopedKvStore};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PermissionError, PermissionResult};
use crate::set::PermissionSet;

const NS_PROFILES: &str = "profiles:by_user";

/// A user's profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Owner of the profile.
    pub user_id: UserId,
    /// Dashboard role.
    #[serde(default)]
    pub role: Role,
    /// Raw allow-list. `None` means unrestricted.
    #[serde(default, deserialize_with = "lenient_allow_list")]
    pub page_permissions: Option<Vec<serde_json::Value>>,
    /// Full name shown in the UI and audit trail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Accept any JSON for the allow-list column. A non-array value becomes a
/// one-element list so its entry goes through the same filtering as array
/// entries; it never discards the rest of the row.
fn lenient_allow_list<'de, D>(deserializer: D) -> Result<Option<Vec<serde_json::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(values)) => Some(values),
        Some(other) => {
            tracing::debug!(value = %other, "page_permissions is not a list, wrapping it");
            Some(vec![other])
        },
    })
}

impl Profile {
    /// A fresh profile with no allow-list.
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            page_permissions: None,
            full_name: None,
        }
    }

    /// Replace the allow-list with the given routes (`None` lifts the
    /// restriction).
    #[must_use]
    pub fn with_page_permissions<I, S>(mut self, paths: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_permissions = paths.map(|p| {
            p.into_iter()
                .map(|s| serde_json::Value::String(s.into()))
                .collect()
        });
        self
    }

    /// Attach a full name.
    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// The cleaned-up permission set for this profile.
    #[must_use]
    pub fn permission_set(&self) -> PermissionSet {
        PermissionSet::from_raw(self.role, self.page_permissions.as_deref())
    }
}

/// Backend holding user profiles.
///
/// Implementations must be thread-safe. Role changes are made by
/// administrators through [`put_profile`](Self::put_profile); the resolver
/// only reads.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by user id. `Ok(None)` means no such profile.
    async fn get_profile(&self, user_id: &UserId) -> PermissionResult<Option<Profile>>;

    /// Create or overwrite a profile.
    async fn put_profile(&self, profile: &Profile) -> PermissionResult<()>;

    /// List all profiles.
    async fn list_profiles(&self) -> PermissionResult<Vec<Profile>>;

    /// Replace a user's allow-list, keeping the role.
    ///
    /// Returns [`PermissionError::ProfileNotFound`] if the user has no
    /// profile yet.
    async fn set_page_permissions(
        &self,
        user_id: &UserId,
        paths: Option<Vec<String>>,
    ) -> PermissionResult<Profile> {
        let profile = self
            .get_profile(user_id)
            .await?
            .ok_or_else(|| PermissionError::ProfileNotFound {
                user_id: user_id.to_string(),
            })?
            .with_page_permissions(paths);
        self.put_profile(&profile).await?;
        Ok(profile)
    }
}

/// Profile store on top of a [`KvStore`], one JSON document per user.
#[derive(Clone)]
pub struct KvProfileStore {
    profiles: ScopedKvStore,
}

impl KvProfileStore {
    /// Create a store sharing an existing key-value backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile namespace cannot be bound.
    pub fn new(store: Arc<dyn KvStore>) -> PermissionResult<Self> {
        Ok(Self {
            profiles: ScopedKvStore::new(store, NS_PROFILES)?,
        })
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the profile namespace cannot be bound.
    pub fn in_memory() -> PermissionResult<Self> {
        Self::new(Arc::new(MemoryKvStore::new()))
    }
}

impl std::fmt::Debug for KvProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvProfileStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProfileStore for KvProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> PermissionResult<Option<Profile>> {
        Ok(self.profiles.get_json(user_id.as_str()).await?)
    }

    async fn put_profile(&self, profile: &Profile) -> PermissionResult<()> {
        self.profiles
            .set_json(profile.user_id.as_str(), profile)
            .await?;
        Ok(())
    }

    async fn list_profiles(&self) -> PermissionResult<Vec<Profile>> {
        Ok(self.profiles.scan_json().await?)
    }
}
