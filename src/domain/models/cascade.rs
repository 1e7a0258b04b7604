//! Cascade domain model.
//!
//! A cascade is the ordered set of escalation tiers for one cliente's lead
//! engagement. Each tier fans out to a batch of [`CascadeEntry`] rows, one per
//! candidate agent, sharing the same activation time and deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Status of a single cascade entry. State only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascadeStatus {
    /// The entry is live and waiting for the addressed agent to act.
    Ativo,
    /// The entry reached a terminal state; see its [`Motivo`].
    Finalizado,
}

impl CascadeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ativo => "Ativo",
            Self::Finalizado => "Finalizado",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ativo" => Some(Self::Ativo),
            "finalizado" => Some(Self::Finalizado),
            _ => None,
        }
    }

}

impl std::fmt::Display for CascadeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal reason code stamped on a finalized entry or closed cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Motivo {
    /// An agent acted within budget.
    Resolvido,
    /// Finalized as a side effect of another entry's resolution.
    Duplicado,
    /// SLA budget exceeded, tier escalated.
    Expirado,
    /// Business-level cancellation, e.g. lead marked invalid.
    Cancelado,
    /// All tiers exhausted with no remaining candidates.
    SemAtendimento,
}

impl Motivo {
    pub const ALL: [Self; 5] = [
        Self::Resolvido,
        Self::Duplicado,
        Self::Expirado,
        Self::Cancelado,
        Self::SemAtendimento,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolvido => "Resolvido",
            Self::Duplicado => "Duplicado",
            Self::Expirado => "Expirado",
            Self::Cancelado => "Cancelado",
            Self::SemAtendimento => "SemAtendimento",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "resolvido" => Some(Self::Resolvido),
            "duplicado" => Some(Self::Duplicado),
            "expirado" => Some(Self::Expirado),
            "cancelado" => Some(Self::Cancelado),
            "sematendimento" => Some(Self::SemAtendimento),
            _ => None,
        }
    }

    /// Reasons an external business event may finalize a cascade with.
    /// `Expirado` and `SemAtendimento` belong to the sweeper alone.
    pub fn is_caller_supplied(&self) -> bool {
        matches!(self, Self::Resolvido | Self::Cancelado | Self::Duplicado)
    }
}

impl std::fmt::Display for Motivo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate agent addressed by one tier of a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeEntry {
    pub id: Uuid,
    /// Lineage this entry belongs to.
    pub cascade_id: Uuid,
    pub cliente_id: Uuid,
    pub lead_id: Uuid,
    /// Candidate agent this entry addresses.
    pub user_id: String,
    /// Tier number, 1-based.
    pub sequencia: u32,
    pub status: CascadeStatus,
    pub sla_horas: f64,
    pub iniciado_em: DateTime<Utc>,
    /// `iniciado_em + sla_horas`; immutable once written.
    pub expira_em: DateTime<Utc>,
    pub finalizado_em: Option<DateTime<Utc>>,
    pub motivo: Option<Motivo>,
}

impl CascadeEntry {
    /// Build a fresh `Ativo` entry for one candidate of a tier.
    ///
    /// Fails when the budget puts the deadline outside the representable range.
    pub fn new(
        cascade: &Cascade,
        user_id: impl Into<String>,
        sequencia: u32,
        sla_horas: f64,
        iniciado_em: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            cascade_id: cascade.id,
            cliente_id: cascade.cliente_id,
            lead_id: cascade.lead_id,
            user_id: user_id.into(),
            sequencia,
            status: CascadeStatus::Ativo,
            sla_horas,
            iniciado_em,
            expira_em: deadline(iniciado_em, sla_horas)?,
            finalizado_em: None,
            motivo: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == CascadeStatus::Ativo
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expira_em < now
    }

    /// Seconds between activation and finalization, if finalized.
    pub fn time_to_finalize_secs(&self) -> Option<f64> {
        self.finalizado_em
            .map(|done| (done - self.iniciado_em).num_milliseconds() as f64 / 1000.0)
    }
}

/// Compute the deadline of a tier from its activation time and budget.
pub fn deadline(iniciado_em: DateTime<Utc>, sla_horas: f64) -> DomainResult<DateTime<Utc>> {
    let out_of_range =
        || DomainError::ValidationFailed(format!("SLA budget of {sla_horas} hours is out of range"));

    let millis = (sla_horas * 3_600_000.0).round();
    if !millis.is_finite() || millis < 0.0 || millis >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    Duration::try_milliseconds(millis as i64)
        .and_then(|budget| iniciado_em.checked_add_signed(budget))
        .ok_or_else(out_of_range)
}

/// One lineage of escalation for a cliente.
///
/// At most one cascade per cliente is open (`encerrada_em` unset) at a time.
/// Exhaustion is recorded here as `desfecho = SemAtendimento` instead of as
/// a phantom entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub lead_id: Uuid,
    /// Tier currently holding the live entries.
    pub sequencia_atual: u32,
    pub aberta_em: DateTime<Utc>,
    pub encerrada_em: Option<DateTime<Utc>>,
    pub desfecho: Option<Motivo>,
    /// Agent credited with the terminal action, if any.
    pub resolvido_por: Option<String>,
}

impl Cascade {
    pub fn new(cliente_id: Uuid, lead_id: Uuid, aberta_em: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cliente_id,
            lead_id,
            sequencia_atual: 1,
            aberta_em,
            encerrada_em: None,
            desfecho: None,
            resolvido_por: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.encerrada_em.is_none()
    }
}

/// Store-level result of opening a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenCascadeResult {
    /// The cascade and its tier-1 batch were written.
    Opened,
    /// No tier-1 candidates; the cascade was recorded closed as `SemAtendimento`.
    Exhausted,
    /// Another cascade is already open for the cliente; nothing was written.
    AlreadyOpen { cascade_id: Uuid },
}

/// Store-level result of advancing a tier on expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceTierResult {
    /// The tier had no live entries left; someone else got there first.
    NoOp,
    /// Tier finalized as `Expirado`, next batch written.
    Escalated { expired: u64, created: u64 },
    /// Tier finalized as `Expirado`, cascade closed as `SemAtendimento`.
    Exhausted { expired: u64 },
}

/// Store-level result of finalizing every live entry of a cliente.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeResult {
    /// Entries addressed to the acting user that took the caller's motivo.
    pub own_entries: u64,
    /// Sibling entries tagged `Duplicado`.
    pub duplicates: u64,
    /// Open cascade closed by this call, if any.
    pub cascade_id: Option<Uuid>,
}

impl FinalizeResult {
    /// Whether this call won the race and changed anything.
    pub fn applied(&self) -> bool {
        self.own_entries + self.duplicates > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(CascadeStatus::from_str("ATIVO"), Some(CascadeStatus::Ativo));
        assert_eq!(CascadeStatus::from_str("finalizado"), Some(CascadeStatus::Finalizado));
        assert_eq!(CascadeStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_motivo_parsing_accepts_spaced_forms() {
        assert_eq!(Motivo::from_str("Sem Atendimento"), Some(Motivo::SemAtendimento));
        assert_eq!(Motivo::from_str("sem_atendimento"), Some(Motivo::SemAtendimento));
        assert_eq!(Motivo::from_str("resolvido"), Some(Motivo::Resolvido));
        assert_eq!(Motivo::from_str("nope"), None);
        for motivo in Motivo::ALL {
            assert_eq!(Motivo::from_str(motivo.as_str()), Some(motivo));
        }
    }

    #[test]
    fn test_caller_supplied_motivos() {
        assert!(Motivo::Resolvido.is_caller_supplied());
        assert!(Motivo::Cancelado.is_caller_supplied());
        assert!(Motivo::Duplicado.is_caller_supplied());
        assert!(!Motivo::Expirado.is_caller_supplied());
        assert!(!Motivo::SemAtendimento.is_caller_supplied());
    }

    #[test]
    fn test_entry_deadline_from_fractional_sla() {
        let now = Utc::now();
        let cascade = Cascade::new(Uuid::new_v4(), Uuid::new_v4(), now);
        let entry = CascadeEntry::new(&cascade, "ana", 1, 0.5, now).unwrap();
        assert_eq!(entry.expira_em - entry.iniciado_em, Duration::minutes(30));
        assert!(entry.is_active());
        assert!(!entry.is_overdue(now));
        assert!(entry.is_overdue(now + Duration::minutes(31)));
        assert_eq!(entry.cascade_id, cascade.id);
    }

    #[test]
    fn test_deadline_out_of_range_is_rejected() {
        let now = Utc::now();
        for sla in [1.0e12, f64::MAX, f64::INFINITY, f64::NAN, -1.0] {
            let err = deadline(now, sla).unwrap_err();
            assert!(matches!(err, DomainError::ValidationFailed(_)), "sla {sla}");
        }

        let cascade = Cascade::new(Uuid::new_v4(), Uuid::new_v4(), now);
        assert!(CascadeEntry::new(&cascade, "ana", 1, 1.0e12, now).is_err());
        assert_eq!(deadline(now, 24.0).unwrap(), now + Duration::hours(24));
    }

    #[test]
    fn test_finalize_result_applied() {
        assert!(!FinalizeResult::default().applied());
        let result = FinalizeResult { own_entries: 0, duplicates: 2, cascade_id: None };
        assert!(result.applied());
    }
}
