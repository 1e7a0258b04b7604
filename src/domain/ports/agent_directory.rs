//! Agent directory port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// User ids of agents in `department` available at `at`.
    async fn list_on_duty_agents(
        &self,
        department: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<String>>;
}
