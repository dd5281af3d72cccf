//! Access decisions.
//!
//! [`evaluate`] is the pure rule; [`PermissionResolver`] loads the profile
//! and applies it. The resolver fails open: if the profile cannot be read the
//! user is let through and a single warning is logged. Pages still enforce
//! their own data access server-side, so the guard is a navigation aid, not
//! the last line of defence.

use std::fmt;
use std::sync::Arc;

use opsdesk_core::Principal;
use serde::{Deserialize, Serialize};

use crate::path::normalize;
use crate::profile::ProfileStore;
use crate::set::PermissionSet;

/// Why a check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The user is an administrator.
    AdminOverride,
    /// No allow-list, or an empty one.
    Unrestricted,
    /// The path is on the allow-list.
    Listed,
    /// The path is not on a non-empty allow-list.
    NotListed,
    /// The profile could not be loaded; access granted.
    ProfileUnavailable,
}

impl DecisionReason {
    /// Stable snake-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminOverride => "admin_override",
            Self::Unrestricted => "unrestricted",
            Self::Listed => "listed",
            Self::NotListed => "not_listed",
            Self::ProfileUnavailable => "profile_unavailable",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether navigation may proceed.
    pub allowed: bool,
    /// Which rule produced the outcome.
    pub reason: DecisionReason,
    /// The normalized path that was checked.
    pub path: String,
}

impl AccessDecision {
    fn new(allowed: bool, reason: DecisionReason, path: String) -> Self {
        Self {
            allowed,
            reason,
            path,
        }
    }
}

/// Decide whether `set` grants access to `path`.
///
/// Admins always pass. A missing or empty allow-list passes. Otherwise the
/// normalized path must be on the list; matching is exact, `/nvr` does not
/// grant `/nvr/hd`.
#[must_use]
pub fn evaluate(set: &PermissionSet, path: &str) -> AccessDecision {
    let path = normalize(path);

    if set.role.is_admin() {
        return AccessDecision::new(true, DecisionReason::AdminOverride, path);
    }

    match &set.allowed_paths {
        Some(paths) if !paths.is_empty() => {
            if paths.contains(&path) {
                AccessDecision::new(true, DecisionReason::Listed, path)
            } else {
                AccessDecision::new(false, DecisionReason::NotListed, path)
            }
        },
        _ => AccessDecision::new(true, DecisionReason::Unrestricted, path),
    }
}

/// Shorthand for `evaluate(set, path).allowed`.
#[must_use]
pub fn has_permission(set: &PermissionSet, path: &str) -> bool {
    evaluate(set, path).allowed
}

/// Loads profiles and answers "may this user open this page?".
#[derive(Clone)]
pub struct PermissionResolver {
    profiles: Arc<dyn ProfileStore>,
}

impl fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

impl PermissionResolver {
    /// Create a resolver over a profile store.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Check whether `principal` may navigate to `path`.
    ///
    /// Never fails. A store error or a missing profile yields an allowed
    /// decision with [`DecisionReason::ProfileUnavailable`] and exactly one
    /// warning.
    pub async fn check(&self, principal: &Principal, path: &str) -> AccessDecision {
        match self.profiles.get_profile(&principal.id).await {
            Ok(Some(profile)) => {
                let decision = evaluate(&profile.permission_set(), path);
                tracing::debug!(
                    user_id = %principal.id,
                    path = %decision.path,
                    allowed = decision.allowed,
                    reason = %decision.reason,
                    "page permission checked"
                );
                decision
            },
            Ok(None) => {
                tracing::warn!(
                    user_id = %principal.id,
                    path,
                    "no profile found, allowing access"
                );
                AccessDecision::new(true, DecisionReason::ProfileUnavailable, normalize(path))
            },
            Err(e) => {
                tracing::warn!(
                    user_id = %principal.id,
                    path,
                    error = %e,
                    "failed to load profile, allowing access"
                );
                AccessDecision::new(true, DecisionReason::ProfileUnavailable, normalize(path))
            },
        }
    }

    /// Load the effective permission set for a principal, if a profile
    /// exists.
    ///
    /// # Errors
    ///
    /// Propagates profile store errors.
    pub async fn permission_set(
        &self,
        principal: &Principal,
    ) -> crate::error::PermissionResult<Option<PermissionSet>> {
        Ok(self
            .profiles
            .get_profile(&principal.id)
            .await?
            .map(|p| p.permission_set()))
    }
}
