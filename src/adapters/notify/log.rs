use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{LeadSummary, Notifier};

/// Notifier that only writes a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, summary: &LeadSummary) -> DomainResult<()> {
        info!(
            user_id = %user_id,
            cliente_id = %summary.cliente_id,
            lead_id = %summary.lead_id,
            tier = summary.sequencia,
            expira_em = %summary.expira_em,
            "Lead assigned"
        );
        Ok(())
    }
}
