//! Infrastructure adapters for external systems.

pub mod notify;
pub mod sqlite;
