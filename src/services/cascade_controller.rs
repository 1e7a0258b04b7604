//! Cascade controller.
//!
//! Owns every state transition of the escalation engine: opening a cascade
//! for a new lead, escalating a tier whose SLA budget ran out, and retiring
//! every live entry of a cliente once somebody acts on it.
//!
//! Transitions are committed by the [`CascadeRepository`] first. Cliente
//! status changes and agent notifications follow the commit and never undo
//! it; a failure there is logged and left for the next read to reconcile.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AdvanceTierResult, Cascade, CascadeEntry, ClienteStatus, Lead, Motivo, OpenCascadeResult,
};
use crate::domain::ports::{
    CascadeRepository, ClienteRepository, Clock, LeadSummary, OverdueTier,
};
use crate::services::assignment_policy::AssignmentPolicy;
use crate::services::notification_dispatcher::{NotificationDispatcher, NotificationRequest};

/// Result of [`CascadeController::start_cascade`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// Tier 1 was written.
    Started {
        cascade_id: Uuid,
        entries: Vec<CascadeEntry>,
    },
    /// The cliente already has an open cascade; nothing was written.
    AlreadyActive { cascade_id: Uuid },
    /// No tier-1 candidates; the cascade was closed as `SemAtendimento`.
    Exhausted { cascade_id: Uuid },
}

impl StartOutcome {
    pub fn cascade_id(&self) -> Uuid {
        match self {
            Self::Started { cascade_id, .. }
            | Self::AlreadyActive { cascade_id }
            | Self::Exhausted { cascade_id } => *cascade_id,
        }
    }
}

/// Result of [`CascadeController::advance_on_expiry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The expired tier was finalized and `tier` now holds the live entries.
    Escalated {
        tier: u32,
        entries: Vec<CascadeEntry>,
    },
    /// The expired tier was finalized and no candidates remain.
    Exhausted,
    /// Nothing left to advance; another caller already handled this tier.
    NoOp,
}

/// Result of [`CascadeController::finalize_duplicates`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeOutcome {
    /// Whether this call finalized anything.
    pub applied: bool,
    /// Whether the acting user had a live entry that took the caller's motivo.
    pub own_entry_finalized: bool,
    /// Sibling entries tagged `Duplicado`.
    pub duplicates: u64,
    /// Cascade closed by this call.
    pub cascade_id: Option<Uuid>,
}

/// Full audit trail of one cliente.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeHistory {
    pub cliente_id: Uuid,
    /// Oldest first.
    pub cascades: Vec<Cascade>,
    /// Every entry ever written, in creation order.
    pub entries: Vec<CascadeEntry>,
}

pub struct CascadeController<C, K, P>
where
    C: CascadeRepository,
    K: ClienteRepository,
    P: AssignmentPolicy,
{
    cascades: Arc<C>,
    clientes: Arc<K>,
    policy: Arc<P>,
    clock: Arc<dyn Clock>,
    dispatcher: Option<NotificationDispatcher>,
}

impl<C, K, P> CascadeController<C, K, P>
where
    C: CascadeRepository,
    K: ClienteRepository,
    P: AssignmentPolicy,
{
    pub fn new(cascades: Arc<C>, clientes: Arc<K>, policy: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cascades,
            clientes,
            policy,
            clock,
            dispatcher: None,
        }
    }

    /// Send post-commit notifications through `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn clientes(&self) -> &Arc<K> {
        &self.clientes
    }

    /// Open a cascade for `cliente_id` and address tier 1.
    #[instrument(skip_all, fields(lead_id = %lead_id, cliente_id = %cliente_id))]
    pub async fn start_cascade(&self, lead_id: Uuid, cliente_id: Uuid) -> DomainResult<StartOutcome> {
        let lead = self
            .clientes
            .get_lead(lead_id)
            .await?
            .ok_or(DomainError::LeadNotFound(lead_id))?;
        if self.clientes.get_cliente(cliente_id).await?.is_none() {
            return Err(DomainError::ClienteNotFound(cliente_id));
        }

        if let Some(open) = self.cascades.open_cascade_for(cliente_id).await? {
            debug!(cascade_id = %open.id, "cascade already active");
            return Ok(StartOutcome::AlreadyActive { cascade_id: open.id });
        }

        let now = self.clock.now();
        let cascade = Cascade::new(cliente_id, lead_id, now);
        let candidates = self.policy.select_candidates(lead_id, 1).await?;
        let batch = self.build_batch(&cascade, 1, &candidates, now)?;

        match self.cascades.open_cascade(&cascade, &batch).await? {
            OpenCascadeResult::AlreadyOpen { cascade_id } => {
                debug!(cascade_id = %cascade_id, "lost the race to open a cascade");
                Ok(StartOutcome::AlreadyActive { cascade_id })
            }
            OpenCascadeResult::Exhausted => {
                info!(cascade_id = %cascade.id, "no tier-1 candidates, cascade exhausted");
                self.reflect_cliente_status(cliente_id, ClienteStatus::SemAtendimento).await;
                Ok(StartOutcome::Exhausted { cascade_id: cascade.id })
            }
            OpenCascadeResult::Opened => {
                info!(cascade_id = %cascade.id, entries = batch.len(), "cascade started");
                if let Err(e) = self.clientes.link_lead(lead_id, cliente_id).await {
                    warn!(error = %e, "failed to link lead to cliente");
                }
                self.reflect_cliente_status(cliente_id, ClienteStatus::AguardandoAtendimento).await;
                self.notify_batch(&lead, &batch);
                Ok(StartOutcome::Started {
                    cascade_id: cascade.id,
                    entries: batch,
                })
            }
        }
    }

    /// Expire `tier` of the cliente's open cascade and escalate to the next.
    ///
    /// Safe to call repeatedly: once the tier holds no live entries every
    /// further call is a `NoOp`. The deadline itself is not re-checked here.
    #[instrument(skip_all, fields(cliente_id = %cliente_id, tier = tier))]
    pub async fn advance_on_expiry(&self, cliente_id: Uuid, tier: u32) -> DomainResult<AdvanceOutcome> {
        let Some(cascade) = self.cascades.open_cascade_for(cliente_id).await? else {
            debug!("no open cascade");
            return Ok(AdvanceOutcome::NoOp);
        };
        if cascade.sequencia_atual != tier {
            debug!(current = cascade.sequencia_atual, "tier is not the live one");
            return Ok(AdvanceOutcome::NoOp);
        }

        let now = self.clock.now();
        let next_tier = tier + 1;
        let candidates = self.policy.select_candidates(cascade.lead_id, next_tier).await?;
        let batch = self.build_batch(&cascade, next_tier, &candidates, now)?;

        match self.cascades.advance_tier(cascade.id, tier, &batch, now).await? {
            AdvanceTierResult::NoOp => Ok(AdvanceOutcome::NoOp),
            AdvanceTierResult::Exhausted { expired } => {
                info!(cascade_id = %cascade.id, expired, "cascade exhausted");
                self.reflect_cliente_status(cliente_id, ClienteStatus::SemAtendimento).await;
                Ok(AdvanceOutcome::Exhausted)
            }
            AdvanceTierResult::Escalated { expired, created } => {
                info!(cascade_id = %cascade.id, expired, created, next_tier, "cascade escalated");
                if self.dispatcher.is_some() {
                    match self.clientes.get_lead(cascade.lead_id).await {
                        Ok(Some(lead)) => self.notify_batch(&lead, &batch),
                        Ok(None) => warn!(lead_id = %cascade.lead_id, "lead vanished, skipping notifications"),
                        Err(e) => warn!(error = %e, "failed to load lead for notifications"),
                    }
                }
                Ok(AdvanceOutcome::Escalated {
                    tier: next_tier,
                    entries: batch,
                })
            }
        }
    }

    /// Retire every live entry of a cliente after `user_id` acted on it.
    ///
    /// The user's own entry takes `motivo`, every sibling takes `Duplicado`.
    /// Re-delivery finds nothing live and reports `applied = false`.
    #[instrument(skip_all, fields(cliente_id = %cliente_id, user_id = %user_id, motivo = %motivo))]
    pub async fn finalize_duplicates(
        &self,
        cliente_id: Uuid,
        user_id: &str,
        motivo: Motivo,
    ) -> DomainResult<FinalizeOutcome> {
        if !motivo.is_caller_supplied() {
            return Err(DomainError::ValidationFailed(format!(
                "motivo {motivo} cannot be supplied by a caller"
            )));
        }
        if user_id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("user id must not be empty".to_string()));
        }
        if self.clientes.get_cliente(cliente_id).await?.is_none() {
            return Err(DomainError::ClienteNotFound(cliente_id));
        }

        let result = self
            .cascades
            .finalize_open(cliente_id, user_id, motivo, self.clock.now())
            .await?;

        if !result.applied() {
            debug!("nothing live to finalize");
            return Ok(FinalizeOutcome::default());
        }

        info!(
            own_entries = result.own_entries,
            duplicates = result.duplicates,
            "cascade finalized"
        );
        match motivo {
            Motivo::Resolvido => self.reflect_cliente_status(cliente_id, ClienteStatus::Atendido).await,
            Motivo::Cancelado => self.reflect_cliente_status(cliente_id, ClienteStatus::Cancelado).await,
            _ => {}
        }

        Ok(FinalizeOutcome {
            applied: true,
            own_entry_finalized: result.own_entries > 0,
            duplicates: result.duplicates,
            cascade_id: result.cascade_id,
        })
    }

    /// Work queue of one agent, soonest-expiring first.
    pub async fn active_assignments_for(&self, user_id: &str) -> DomainResult<Vec<CascadeEntry>> {
        self.cascades.active_for_user(user_id).await
    }

    /// Live entries of one cliente, or of every cliente.
    pub async fn cascade_snapshot(&self, cliente_id: Option<Uuid>) -> DomainResult<Vec<CascadeEntry>> {
        self.cascades.active_entries(cliente_id).await
    }

    /// Distinct `(cliente, tier)` pairs whose live entries are past their deadline.
    pub async fn overdue_tiers(&self, limit: u32) -> DomainResult<Vec<OverdueTier>> {
        self.cascades.overdue_tiers(self.clock.now(), limit).await
    }

    /// Every cascade and entry ever written for a cliente.
    pub async fn cascade_history(&self, cliente_id: Uuid) -> DomainResult<CascadeHistory> {
        if self.clientes.get_cliente(cliente_id).await?.is_none() {
            return Err(DomainError::ClienteNotFound(cliente_id));
        }

        Ok(CascadeHistory {
            cliente_id,
            cascades: self.cascades.cascades_for_cliente(cliente_id).await?,
            entries: self.cascades.entries_for_cliente(cliente_id).await?,
        })
    }

    fn build_batch(
        &self,
        cascade: &Cascade,
        tier: u32,
        candidates: &[String],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<CascadeEntry>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let sla_horas = self
            .policy
            .sla_horas(tier)
            .filter(|h| h.is_finite() && *h > 0.0)
            .ok_or_else(|| {
                DomainError::ValidationFailed(format!("tier {tier} has candidates but no SLA budget"))
            })?;

        candidates
            .iter()
            .map(|user_id| CascadeEntry::new(cascade, user_id.as_str(), tier, sla_horas, now))
            .collect()
    }

    async fn reflect_cliente_status(&self, cliente_id: Uuid, status: ClienteStatus) {
        if let Err(e) = self.clientes.update_cliente_status(cliente_id, status).await {
            warn!(cliente_id = %cliente_id, status = %status, error = %e, "failed to update cliente status");
        }
    }

    fn notify_batch(&self, lead: &Lead, batch: &[CascadeEntry]) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };

        for entry in batch {
            dispatcher.dispatch(NotificationRequest {
                user_id: entry.user_id.clone(),
                summary: LeadSummary {
                    cliente_id: entry.cliente_id,
                    lead_id: lead.id,
                    nome: lead.nome.clone(),
                    telefone: lead.telefone.clone(),
                    source: lead.source.clone(),
                    sequencia: entry.sequencia,
                    expira_em: entry.expira_em,
                },
            });
        }
    }
}
