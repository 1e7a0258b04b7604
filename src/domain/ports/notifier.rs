//! Notification channel port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// What an agent is told about a lead they were just addressed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub cliente_id: Uuid,
    pub lead_id: Uuid,
    pub nome: String,
    pub telefone: Option<String>,
    pub source: String,
    pub sequencia: u32,
    pub expira_em: DateTime<Utc>,
}

/// Best-effort delivery of a lead to an agent.
///
/// Implementations should not retry; the dispatcher logs and drops failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, summary: &LeadSummary) -> DomainResult<()>;
}
