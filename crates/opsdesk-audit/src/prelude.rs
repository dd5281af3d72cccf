//! Prelude module - commonly used types for convenient import.
//!
//! Use `use opsdesk_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Entries
pub use crate::{ActionType, AuditLogEntry, AuditMetadata, Snapshot};

// Recording
pub use crate::{AuditRecorder, ClientInfo, DeviceClass, IpLookup, IpResolver};

// Reading
pub use crate::{AuditQuery, LogFilter, LogPage, Notice, Notifier, PageRequest};

// Detection
pub use crate::{ActivityReport, AlertKind, SecurityAlert, Severity, SuspiciousActivityDetector};

// Storage
pub use crate::{AuditStore, KvAuditStore};
