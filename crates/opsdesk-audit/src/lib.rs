//! OpsDesk Audit - Append-only audit trail for sensitive dashboard actions.
//!
//! This crate provides:
//! - [`AuditLogEntry`]: who did what to which record, from where
//! - [`AuditRecorder`]: captures the principal, client IP and device and
//!   stores an entry per action
//! - [`AuditQuery`]: filtered, paginated reads and CSV export
//! - [`SuspiciousActivityDetector`]: severity-tagged heuristics over a
//!   user's recent entries
//! - The [`AuditStore`] seam with a key-value backed implementation
//!
//! # Best-Effort Recording
//!
//! Audit completeness is best effort. [`AuditRecorder::log_action`] logs a
//! warning and returns `None` when the store rejects an entry; the action
//! being audited is never failed because its audit row could not be
//! written. Callers that must know use [`AuditRecorder::try_log_action`].
//!
//! Entries are append-only. The store exposes no update or delete.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use opsdesk_audit::{
//!     ActionType, AuditMetadata, AuditQuery, AuditRecorder, IpResolver, KvAuditStore,
//!     LogFilter, PageRequest,
//! };
//! use opsdesk_core::{Principal, UserId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(KvAuditStore::in_memory().unwrap());
//! let recorder = AuditRecorder::new(store.clone(), IpResolver::disabled());
//! let principal = Principal::new(UserId::new("u-1").unwrap(), "ana@example.com");
//!
//! recorder
//!     .log_action(
//!         &principal,
//!         ActionType::PasswordViewed,
//!         Some("pw-7"),
//!         "Viewed VPN password",
//!         AuditMetadata::new().table("passwords"),
//!     )
//!     .await;
//!
//! let query = AuditQuery::with_tracing(store);
//! let page = PageRequest::new(1, 50).unwrap();
//! let logs = query.fetch_logs(&LogFilter::all(), page).await;
//! assert_eq!(logs.len(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod client;
mod detector;
mod entry;
mod error;
mod export;
mod filter;
mod query;
mod recorder;
mod storage;

pub use client::{
    ClientInfo, DeviceClass, HttpIpLookup, IpCache, IpLookup, IpResolver, StaticIpLookup,
    UNKNOWN_IP,
};
pub use detector::{
    ActivityReport, AlertKind, DetectorConfig, SecurityAlert, Severity, SuspiciousActivityDetector,
};
pub use entry::{ActionType, AuditLogEntry, AuditMetadata, Snapshot, diff_fields};
pub use error::{AuditError, AuditResult};
pub use export::{CSV_COLUMNS, quote, to_csv};
pub use filter::{LogFilter, LogPage, PageRequest, total_pages};
pub use query::{AuditQuery, Notice, Notifier, TracingNotifier};
pub use recorder::AuditRecorder;
pub use storage::{AuditStore, KvAuditStore, newest_first, select};
