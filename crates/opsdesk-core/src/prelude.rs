//! Prelude module - commonly used types for convenient import.
//!
//! Use `use opsdesk_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Identity
pub use crate::{Principal, Role, UserId};
