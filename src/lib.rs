//! Cascata - Lead SLA cascade engine
//!
//! Fans each inbound lead out to the agents of a tier, gives them a fixed
//! service window, and escalates to the next tier when the window lapses.
//! The first agent to act claims the lead and every sibling assignment is
//! closed as a duplicate.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Adapters** (`adapters`): sqlite store, agent roster and notifiers
//! - **Service Layer** (`services`): cascade controller, sweeper, metrics
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use cascata::cli::AppContext;
//! use cascata::services::BusinessEvent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = cascata::ConfigLoader::load()?;
//!     let ctx = AppContext::open(&config).await?;
//!     ctx.triggers
//!         .handle(BusinessEvent::LeadReceived {
//!             nome: "Maria".into(),
//!             telefone: None,
//!             email: None,
//!             source: "site".into(),
//!         })
//!         .await?;
//!     ctx.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Agent, Cascade, CascadeEntry, CascadeStatus, Cliente, ClienteStatus, Config, Lead,
    LeadStatus, MetricsReport, Motivo,
};
pub use domain::ports::{AgentDirectory, CascadeRepository, ClienteRepository, Clock, Notifier};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BusinessEvent, CascadeController, ExpirySweeper, MetricsAggregator, TriggerAdapter,
};
