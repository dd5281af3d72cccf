//! CLI command implementations.

pub(crate) mod access;
pub(crate) mod audit;
pub(crate) mod config;
