//! Candidate selection per escalation tier.
//!
//! Tier 1 addresses every on-duty agent of the receiving department; higher
//! tiers widen to the departments configured after it. A tier with no
//! configuration or no available agent yields an empty set, which the
//! controller treats as exhaustion.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::TierConfig;
use crate::domain::ports::{AgentDirectory, Clock};

#[async_trait]
pub trait AssignmentPolicy: Send + Sync {
    /// Agents to address for `tier` of the lead's cascade, in a stable order.
    async fn select_candidates(&self, lead_id: Uuid, tier: u32) -> DomainResult<Vec<String>>;

    /// SLA budget in hours for `tier`, `None` past the last configured tier.
    fn sla_horas(&self, tier: u32) -> Option<f64>;
}

/// Policy driven by the configured tier list.
pub struct TieredAssignmentPolicy<D: AgentDirectory> {
    directory: Arc<D>,
    tiers: Vec<TierConfig>,
    clock: Arc<dyn Clock>,
}

impl<D: AgentDirectory> TieredAssignmentPolicy<D> {
    pub fn new(directory: Arc<D>, tiers: Vec<TierConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            tiers,
            clock,
        }
    }

    fn tier_config(&self, tier: u32) -> Option<&TierConfig> {
        (tier as usize).checked_sub(1).and_then(|i| self.tiers.get(i))
    }
}

#[async_trait]
impl<D: AgentDirectory> AssignmentPolicy for TieredAssignmentPolicy<D> {
    async fn select_candidates(&self, lead_id: Uuid, tier: u32) -> DomainResult<Vec<String>> {
        if tier == 0 {
            return Err(DomainError::ValidationFailed("tiers are 1-based".to_string()));
        }

        let Some(config) = self.tier_config(tier) else {
            debug!(lead_id = %lead_id, tier, "no tier configured, pool exhausted");
            return Ok(Vec::new());
        };

        let mut candidates = self
            .directory
            .list_on_duty_agents(&config.department, self.clock.now())
            .await?;
        candidates.sort();
        candidates.dedup();

        debug!(
            lead_id = %lead_id,
            tier,
            department = %config.department,
            candidates = candidates.len(),
            "selected candidates"
        );
        Ok(candidates)
    }

    fn sla_horas(&self, tier: u32) -> Option<f64> {
        self.tier_config(tier).map(|t| t.sla_horas)
    }
}
