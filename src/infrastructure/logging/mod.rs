//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stderr output
//! - Optional daily rolling JSON files
//! - Retention cleanup for rolled files

pub mod config;
pub mod logger;
pub mod retention;

pub use config::{LogConfig, LogFormat};
pub use logger::LoggerImpl;
pub use retention::prune_old_logs;
