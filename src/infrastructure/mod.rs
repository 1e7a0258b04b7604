//! Infrastructure layer module
//!
//! Configuration loading and logging setup. Storage and notification
//! adapters live under `adapters`.

pub mod config;
pub mod logging;
