//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - CascadeRepository: the cascade store
//! - ClienteRepository: Lead/Cliente persistence collaborator
//! - AgentDirectory: roster of on-duty agents
//! - Notifier: best-effort notification channel
//! - Clock: time source

pub mod agent_directory;
pub mod cascade_repository;
pub mod cliente_repository;
pub mod clock;
pub mod notifier;

pub use agent_directory::AgentDirectory;
pub use cascade_repository::{CascadeRepository, OverdueTier};
pub use cliente_repository::ClienteRepository;
pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{LeadSummary, Notifier};
