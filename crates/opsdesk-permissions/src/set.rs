//! Permission sets: a role plus an optional allow-list.

use std::collections::BTreeSet;

use opsdesk_core::Role;

use crate::path::{normalize, normalize_allow_list};

/// The effective page permissions of one user, as loaded for a single check.
///
/// `allowed_paths` holds normalized routes. `None` and an empty set both
/// mean "unrestricted".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    /// Role from the profile.
    pub role: Role,
    /// Normalized allow-list, if one was configured.
    pub allowed_paths: Option<BTreeSet<String>>,
}

impl PermissionSet {
    /// Build a set from raw route strings, normalizing them.
    pub fn new<I, S>(role: Role, allowed: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            role,
            allowed_paths: allowed.map(|paths| {
                paths
                    .into_iter()
                    .filter(|p| !p.as_ref().trim().is_empty())
                    .map(|p| normalize(p.as_ref()))
                    .collect()
            }),
        }
    }

    /// A set with no allow-list.
    #[must_use]
    pub fn unrestricted(role: Role) -> Self {
        Self {
            role,
            allowed_paths: None,
        }
    }

    /// Build a set from the raw JSON `page_permissions` column, dropping
    /// malformed entries.
    #[must_use]
    pub fn from_raw(role: Role, page_permissions: Option<&[serde_json::Value]>) -> Self {
        Self {
            role,
            allowed_paths: page_permissions.map(|raw| normalize_allow_list(raw.iter())),
        }
    }

    /// Whether the allow-list actually limits navigation.
    ///
    /// Admins are never restricted; users are restricted only by a
    /// non-empty list.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !self.role.is_admin()
            && self
                .allowed_paths
                .as_ref()
                .is_some_and(|paths| !paths.is_empty())
    }
}
