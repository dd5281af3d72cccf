//! OpsDesk Storage - namespaced key-value persistence.
//!
//! The profile store and the audit store both sit on the [`KvStore`] trait:
//! byte-level `get`/`set`/`scan` scoped to a namespace. Two backends ship:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryKvStore`] | Tests, ephemeral sessions |
//! | [`FileKvStore`] | Single JSON document on disk, used by the `opsdesk` CLI |
//!
//! [`ScopedKvStore`] pre-binds a namespace and adds typed JSON helpers.
//!
//! There is intentionally no `delete` on the trait. Audit rows are
//! append-only and profiles are only ever overwritten.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use file::FileKvStore;
pub use kv::{KvEntry, KvStore, MemoryKvStore, ScopedKvStore};
