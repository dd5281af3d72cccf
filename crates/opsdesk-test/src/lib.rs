//! OpsDesk Test - Shared test utilities.
//!
//! Mock stores, fixtures and a log capture used as a dev-dependency by the
//! integration tests and the CLI.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! opsdesk-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use opsdesk_test::{FailingProfileStore, capture_logs, test_principal};
//!
//! #[tokio::test]
//! async fn test_fail_open() {
//!     let (logs, _guard) = capture_logs();
//!     let resolver = PermissionResolver::new(Arc::new(FailingProfileStore::new()));
//!     let decision = resolver.check(&test_principal("u-1"), "/configuracoes").await;
//!     assert!(decision.allowed);
//!     assert_eq!(logs.count_level("WARN"), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod capture;
pub mod csv;
pub mod fixtures;
pub mod mocks;

pub use capture::*;
pub use csv::*;
pub use fixtures::*;
pub use mocks::*;
