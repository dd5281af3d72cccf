//! Navigation guard.
//!
//! Every protected navigation starts a new check. Checks are async and may
//! resolve out of order; a result is applied only while its ticket is still
//! the active one, so a slow answer for an old route can never flip the
//! state of the page the user is looking at now.

use std::sync::{Arc, Mutex, MutexGuard};

use opsdesk_core::{Principal, UserId};
use serde::{Deserialize, Serialize};

use crate::path::normalize;
use crate::resolver::{AccessDecision, PermissionResolver};

/// State of the guard for the active navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// A check is in flight; render nothing protected.
    #[default]
    Checking,
    /// The page may be shown.
    Allowed,
    /// The user must be sent back to the default page.
    Denied,
}

/// Handle for one in-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardTicket {
    user_id: UserId,
    path: String,
    generation: u64,
}

impl GuardTicket {
    /// Normalized path this ticket was issued for.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// User this ticket was issued for.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

#[derive(Debug, Default)]
struct GuardInner {
    generation: u64,
    active: Option<(UserId, String)>,
    state: GuardState,
    decision: Option<AccessDecision>,
}

/// `Checking → Allowed | Denied` state machine for protected routes.
#[derive(Debug)]
pub struct RouteGuard {
    resolver: PermissionResolver,
    inner: Arc<Mutex<GuardInner>>,
}

impl RouteGuard {
    /// Create a guard in the `Checking` state.
    #[must_use]
    pub fn new(resolver: PermissionResolver) -> Self {
        Self {
            resolver,
            inner: Arc::new(Mutex::new(GuardInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardInner> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::warn!("route guard lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GuardState {
        self.lock().state
    }

    /// Last applied decision, if the active check has completed.
    #[must_use]
    pub fn decision(&self) -> Option<AccessDecision> {
        self.lock().decision.clone()
    }

    /// Start a check for `principal` navigating to `path`.
    ///
    /// Resets the state to `Checking` and invalidates every earlier ticket.
    pub fn begin(&self, principal: &Principal, path: &str) -> GuardTicket {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        let path = normalize(path);
        inner.active = Some((principal.id.clone(), path.clone()));
        inner.state = GuardState::Checking;
        inner.decision = None;

        GuardTicket {
            user_id: principal.id.clone(),
            path,
            generation: inner.generation,
        }
    }

    /// Apply a decision for `ticket`.
    ///
    /// Returns `false` and leaves the state untouched if the ticket has been
    /// superseded by a later [`begin`](Self::begin) or a [`reset`](Self::reset).
    pub fn complete(&self, ticket: &GuardTicket, decision: AccessDecision) -> bool {
        let mut inner = self.lock();
        let current = inner.generation == ticket.generation
            && inner
                .active
                .as_ref()
                .is_some_and(|(user, path)| *user == ticket.user_id && *path == ticket.path);

        if !current {
            tracing::debug!(
                path = %ticket.path,
                generation = ticket.generation,
                "discarding stale permission result"
            );
            return false;
        }

        inner.state = if decision.allowed {
            GuardState::Allowed
        } else {
            GuardState::Denied
        };
        inner.decision = Some(decision);
        true
    }

    /// Run a full check: `begin`, resolve, `complete`.
    ///
    /// Returns the state after the call. If a newer navigation started while
    /// this one was resolving, that navigation's state is returned.
    pub async fn guard(&self, principal: &Principal, path: &str) -> GuardState {
        let ticket = self.begin(principal, path);
        let decision = self.resolver.check(principal, path).await;
        if !decision.allowed {
            tracing::info!(
                user_id = %principal.id,
                path = %decision.path,
                "navigation denied"
            );
        }
        self.complete(&ticket, decision);
        self.state()
    }

    /// Drop the active check (sign-out). Outstanding tickets become stale.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.active = None;
        inner.state = GuardState::Checking;
        inner.decision = None;
    }
}
