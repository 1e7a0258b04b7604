//! CLI command implementations.

pub mod agent;
pub mod cascade;
pub mod init;
pub mod lead;
pub mod metrics;
pub mod sweep;
