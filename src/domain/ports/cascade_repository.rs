//! Repository port for the cascade store.
//!
//! The store is the single source of truth for escalation state. Every
//! mutating method is one atomic unit guarded by conditional writes on
//! `status = 'Ativo'`, so a lost race shows up as zero affected rows rather
//! than as an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AdvanceTierResult, Cascade, CascadeEntry, DateRange, FinalizeResult, Motivo,
    OpenCascadeResult,
};

/// A tier whose live entries are past their deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverdueTier {
    pub cliente_id: Uuid,
    pub sequencia: u32,
}

#[async_trait]
pub trait CascadeRepository: Send + Sync {
    /// Open a cascade and write its tier-1 batch.
    ///
    /// Rejected with `AlreadyOpen` when the cliente already has an open
    /// cascade. An empty batch records the cascade closed as `SemAtendimento`.
    async fn open_cascade(
        &self,
        cascade: &Cascade,
        batch: &[CascadeEntry],
    ) -> DomainResult<OpenCascadeResult>;

    /// Expire the live entries of `tier` and write the next batch.
    ///
    /// An empty `next_batch` closes the cascade as `SemAtendimento`. Returns
    /// `NoOp` when the tier has no live entries left.
    async fn advance_tier(
        &self,
        cascade_id: Uuid,
        tier: u32,
        next_batch: &[CascadeEntry],
        now: DateTime<Utc>,
    ) -> DomainResult<AdvanceTierResult>;

    /// Finalize every live entry of a cliente and close its open cascade.
    ///
    /// Entries addressed to `user_id` take `motivo`; the rest take `Duplicado`.
    async fn finalize_open(
        &self,
        cliente_id: Uuid,
        user_id: &str,
        motivo: Motivo,
        now: DateTime<Utc>,
    ) -> DomainResult<FinalizeResult>;

    /// The currently open cascade of a cliente, if any.
    async fn open_cascade_for(&self, cliente_id: Uuid) -> DomainResult<Option<Cascade>>;

    /// Get a cascade by ID.
    async fn get_cascade(&self, id: Uuid) -> DomainResult<Option<Cascade>>;

    /// Every cascade ever opened for a cliente, oldest first.
    async fn cascades_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<Cascade>>;

    /// Live entries addressed to a user, soonest-expiring first.
    async fn active_for_user(&self, user_id: &str) -> DomainResult<Vec<CascadeEntry>>;

    /// Live entries of one cliente, or of every cliente when `None`.
    async fn active_entries(&self, cliente_id: Option<Uuid>) -> DomainResult<Vec<CascadeEntry>>;

    /// Every entry of a cliente, live or finalized, in creation order.
    async fn entries_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<CascadeEntry>>;

    /// Distinct `(cliente, tier)` pairs with live entries past `now`.
    async fn overdue_tiers(&self, now: DateTime<Utc>, limit: u32) -> DomainResult<Vec<OverdueTier>>;

    /// Entries finalized within the range.
    async fn finalized_between(&self, range: DateRange) -> DomainResult<Vec<CascadeEntry>>;

    /// Number of cascades closed as `SemAtendimento` within the range.
    async fn count_exhausted_between(&self, range: DateRange) -> DomainResult<u64>;
}
