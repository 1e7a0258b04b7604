//! Translation of business events into cascade operations.
//!
//! Every event handler is idempotent, so a transient store failure is simply
//! retried with exponential backoff. Any other error is returned at once.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Cliente, Lead, LeadStatus, Motivo, RetryConfig};
use crate::domain::ports::{CascadeRepository, ClienteRepository};
use crate::services::assignment_policy::AssignmentPolicy;
use crate::services::cascade_controller::{CascadeController, FinalizeOutcome, StartOutcome};

/// Event raised by another part of the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BusinessEvent {
    /// A new inbound contact arrived.
    LeadReceived {
        nome: String,
        #[serde(default)]
        telefone: Option<String>,
        #[serde(default)]
        email: Option<String>,
        source: String,
    },
    /// An agent booked an appointment with the cliente.
    AppointmentCreated { cliente_id: Uuid, user_id: String },
    /// A lead was converted by an agent.
    LeadConverted { lead_id: Uuid, user_id: String },
    /// The cliente's lead was cancelled by hand.
    ManualCancel { cliente_id: Uuid, user_id: String },
}

impl BusinessEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LeadReceived { .. } => "lead_received",
            Self::AppointmentCreated { .. } => "appointment_created",
            Self::LeadConverted { .. } => "lead_converted",
            Self::ManualCancel { .. } => "manual_cancel",
        }
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TriggerOutcome {
    LeadStarted {
        lead_id: Uuid,
        cliente_id: Uuid,
        start: StartOutcome,
    },
    Finalized {
        cliente_id: Uuid,
        finalize: FinalizeOutcome,
    },
}

pub struct TriggerAdapter<C, K, P>
where
    C: CascadeRepository,
    K: ClienteRepository,
    P: AssignmentPolicy,
{
    controller: Arc<CascadeController<C, K, P>>,
    retry: RetryConfig,
}

impl<C, K, P> TriggerAdapter<C, K, P>
where
    C: CascadeRepository,
    K: ClienteRepository,
    P: AssignmentPolicy,
{
    pub fn new(controller: Arc<CascadeController<C, K, P>>, retry: RetryConfig) -> Self {
        Self { controller, retry }
    }

    /// Handle one event, retrying transient store failures.
    pub async fn handle(&self, event: BusinessEvent) -> DomainResult<TriggerOutcome> {
        let kind = event.kind();
        // Identities are fixed up front so a retried attempt reuses them.
        let prepared = Prepared::from_event(&event);
        let prepared = &prepared;
        let max_retries = self.retry.max_retries;
        let mut attempt = 0u32;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.retry.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.retry.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();

        let outcome = backoff::future::retry_notify(
            policy,
            move || {
                attempt += 1;
                let this_attempt = attempt;
                async move {
                    self.handle_once(prepared).await.map_err(|e| {
                        if e.is_transient() && this_attempt <= max_retries {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: DomainError, wait: Duration| {
                warn!(event = kind, error = %e, wait_ms = wait.as_millis() as u64, "Transient failure, retrying");
            },
        )
        .await?;

        info!(event = kind, "Business event handled");
        Ok(outcome)
    }

    async fn handle_once(&self, prepared: &Prepared) -> DomainResult<TriggerOutcome> {
        match prepared {
            Prepared::LeadReceived { lead, cliente } => self.on_lead_received(lead, cliente).await,
            Prepared::Finalize {
                cliente_id,
                user_id,
                motivo,
            } => self.on_finalize(*cliente_id, user_id, *motivo).await,
            Prepared::LeadConverted { lead_id, user_id } => {
                self.on_lead_converted(*lead_id, user_id).await
            }
        }
    }

    async fn on_lead_received(&self, lead: &Lead, cliente: &Cliente) -> DomainResult<TriggerOutcome> {
        let clientes = self.controller.clientes();
        if clientes.get_lead(lead.id).await?.is_none() {
            clientes.create_lead(lead).await?;
        }
        if clientes.get_cliente(cliente.id).await?.is_none() {
            clientes.create_cliente(cliente).await?;
        }

        let start = self.controller.start_cascade(lead.id, cliente.id).await?;
        Ok(TriggerOutcome::LeadStarted {
            lead_id: lead.id,
            cliente_id: cliente.id,
            start,
        })
    }

    async fn on_finalize(
        &self,
        cliente_id: Uuid,
        user_id: &str,
        motivo: Motivo,
    ) -> DomainResult<TriggerOutcome> {
        let finalize = self
            .controller
            .finalize_duplicates(cliente_id, user_id, motivo)
            .await?;

        if motivo == Motivo::Cancelado {
            let clientes = self.controller.clientes();
            for lead in clientes.leads_for_cliente(cliente_id).await? {
                if lead.status == LeadStatus::New {
                    clientes.update_lead_status(lead.id, LeadStatus::Discarded).await?;
                }
            }
        }

        Ok(TriggerOutcome::Finalized {
            cliente_id,
            finalize,
        })
    }

    async fn on_lead_converted(&self, lead_id: Uuid, user_id: &str) -> DomainResult<TriggerOutcome> {
        let clientes = self.controller.clientes();
        let lead = clientes
            .get_lead(lead_id)
            .await?
            .ok_or(DomainError::LeadNotFound(lead_id))?;
        let cliente_id = lead.cliente_id.ok_or_else(|| {
            DomainError::ValidationFailed(format!("lead {lead_id} is not attached to a cliente"))
        })?;

        clientes.update_lead_status(lead_id, LeadStatus::Converted).await?;
        self.on_finalize(cliente_id, user_id, Motivo::Resolvido).await
    }
}

enum Prepared {
    LeadReceived { lead: Lead, cliente: Cliente },
    Finalize {
        cliente_id: Uuid,
        user_id: String,
        motivo: Motivo,
    },
    LeadConverted { lead_id: Uuid, user_id: String },
}

impl Prepared {
    fn from_event(event: &BusinessEvent) -> Self {
        match event {
            BusinessEvent::LeadReceived {
                nome,
                telefone,
                email,
                source,
            } => {
                let mut lead = Lead::new(nome.clone(), source.clone());
                lead.telefone = telefone.clone();
                lead.email = email.clone();
                let cliente = Cliente::from_lead(&lead);
                Self::LeadReceived { lead, cliente }
            }
            BusinessEvent::AppointmentCreated { cliente_id, user_id } => Self::Finalize {
                cliente_id: *cliente_id,
                user_id: user_id.clone(),
                motivo: Motivo::Resolvido,
            },
            BusinessEvent::ManualCancel { cliente_id, user_id } => Self::Finalize {
                cliente_id: *cliente_id,
                user_id: user_id.clone(),
                motivo: Motivo::Cancelado,
            },
            BusinessEvent::LeadConverted { lead_id, user_id } => Self::LeadConverted {
                lead_id: *lead_id,
                user_id: user_id.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event: BusinessEvent = serde_json::from_str(
            r#"{"event":"lead_received","nome":"Maria","source":"site"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            BusinessEvent::LeadReceived {
                nome: "Maria".to_string(),
                telefone: None,
                email: None,
                source: "site".to_string(),
            }
        );
        assert_eq!(event.kind(), "lead_received");
    }

    #[test]
    fn test_prepared_identities_are_stable() {
        let event = BusinessEvent::LeadReceived {
            nome: "Maria".to_string(),
            telefone: Some("+55 11 98888-7777".to_string()),
            email: None,
            source: "whatsapp".to_string(),
        };
        let Prepared::LeadReceived { lead, cliente } = Prepared::from_event(&event) else {
            panic!("expected a lead");
        };
        assert_eq!(cliente.nome, lead.nome);
        assert_eq!(cliente.telefone, lead.telefone);
    }
}
