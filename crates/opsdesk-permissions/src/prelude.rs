//! Prelude module - commonly used types for convenient import.
//!
//! Use `use opsdesk_permissions::prelude::*;` to import all essential types.

// Errors
pub use crate::{PermissionError, PermissionResult};

// Paths
pub use crate::{normalize, normalize_allow_list};

// Decisions
pub use crate::{AccessDecision, DecisionReason, PermissionResolver, PermissionSet};
pub use crate::{evaluate, has_permission};

// Navigation
pub use crate::{GuardState, GuardTicket, RouteGuard};

// Profiles
pub use crate::{KvProfileStore, Profile, ProfileStore};
