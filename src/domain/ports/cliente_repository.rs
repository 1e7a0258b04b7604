//! Repository port for the Lead/Cliente persistence collaborator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Cliente, ClienteStatus, Lead, LeadStatus};

#[async_trait]
pub trait ClienteRepository: Send + Sync {
    async fn get_cliente(&self, id: Uuid) -> DomainResult<Option<Cliente>>;

    async fn create_cliente(&self, cliente: &Cliente) -> DomainResult<()>;

    /// Returns `ClienteNotFound` when no row was updated.
    async fn update_cliente_status(&self, id: Uuid, status: ClienteStatus) -> DomainResult<()>;

    /// List clientes, optionally filtered by status, newest first.
    async fn list_clientes(&self, status: Option<ClienteStatus>) -> DomainResult<Vec<Cliente>>;

    async fn get_lead(&self, id: Uuid) -> DomainResult<Option<Lead>>;

    async fn create_lead(&self, lead: &Lead) -> DomainResult<()>;

    /// Attach a lead to the cliente handling it.
    async fn link_lead(&self, lead_id: Uuid, cliente_id: Uuid) -> DomainResult<()>;

    async fn update_lead_status(&self, id: Uuid, status: LeadStatus) -> DomainResult<()>;

    /// Leads attached to a cliente, newest first.
    async fn leads_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<Lead>>;
}
