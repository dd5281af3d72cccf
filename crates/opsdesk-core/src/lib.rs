//! OpsDesk Core - Foundation types shared by the access and audit crates.
//!
//! This crate provides:
//! - Identifier newtypes ([`UserId`])
//! - The authenticated [`Principal`] supplied by the identity provider
//! - The dashboard [`Role`] model
//!
//! It has no I/O and no async code; the stores that give these types
//! meaning live in `opsdesk-permissions` and `opsdesk-audit`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod principal;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use principal::{Principal, Role};
pub use types::UserId;
