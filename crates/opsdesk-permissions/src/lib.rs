//! OpsDesk Permissions - Page-level authorization for the dashboard.
//!
//! This crate provides:
//! - A total, idempotent route [`normalize`]r
//! - [`PermissionSet`]: a role plus an optional per-path allow-list
//! - The pure decision function [`has_permission`] / [`evaluate`]
//! - [`PermissionResolver`]: fetches the profile and applies the decision
//! - [`RouteGuard`]: the `Checking → Allowed | Denied` navigation state machine
//! - The [`ProfileStore`] seam with a key-value backed implementation
//!
//! # Access Model
//!
//! - `admin` sees every page.
//! - A user with no allow-list (absent or empty) sees every page. Access is
//!   unrestricted until an administrator explicitly restricts it.
//! - A user with a non-empty allow-list sees exactly those pages.
//!
//! # Fail-Open on Profile Errors
//!
//! If the profile cannot be fetched, or does not exist, the resolver grants
//! access and logs one warning. This keeps accounts usable during backend
//! outages at the price of weaker enforcement while the outage lasts.
//! Changing this to fail-closed changes observable behavior and must be a
//! deliberate decision, not a refactor.
//!
//! # Example
//!
//! ```
//! use opsdesk_core::Role;
//! use opsdesk_permissions::{PermissionSet, has_permission};
//!
//! let restricted = PermissionSet::new(Role::User, Some(["/senhas", "/home"]));
//! assert!(has_permission(&restricted, "/Senhas/"));
//! assert!(!has_permission(&restricted, "/configuracoes"));
//!
//! let admin = PermissionSet::new(Role::Admin, Some(["/home"]));
//! assert!(has_permission(&admin, "/configuracoes"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod guard;
mod path;
mod profile;
mod resolver;
mod set;

pub use error::{PermissionError, PermissionResult};
pub use guard::{GuardState, GuardTicket, RouteGuard};
pub use path::{normalize, normalize_allow_list};
pub use profile::{KvProfileStore, Profile, ProfileStore};
pub use resolver::{AccessDecision, DecisionReason, PermissionResolver, evaluate, has_permission};
pub use set::PermissionSet;
