//! OpsDesk Telemetry - Logging and request correlation.
//!
//! This crate provides:
//! - [`LogConfig`] and [`setup_logging`]: one global `tracing` subscriber
//!   with a choice of format (pretty, compact, JSON, full) and target
//!   (stdout, stderr, rotated files)
//! - [`RequestContext`]: a correlation id plus component and operation,
//!   rendered as a span so every log line of one command can be grouped
//!
//! # Example
//!
//! ```rust,no_run
//! use opsdesk_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), opsdesk_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("opsdesk_permissions=debug");
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("cli").with_operation("access check");
//! let _entered = ctx.span().entered();
//! tracing::info!("checking page access");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    LogConfig, LogFormat, LogTarget, build_layer, setup_default_logging, setup_logging,
};
