//! SQLite implementation of the ClienteRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Cliente, ClienteStatus, Lead, LeadStatus};
use crate::domain::ports::ClienteRepository;

#[derive(Clone)]
pub struct SqliteClienteRepository {
    pool: SqlitePool,
}

impl SqliteClienteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ClienteRow {
    id: String,
    nome: String,
    telefone: Option<String>,
    email: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

fn row_to_cliente(row: ClienteRow) -> DomainResult<Cliente> {
    Ok(Cliente {
        id: parse_uuid(&row.id)?,
        nome: row.nome,
        telefone: row.telefone,
        email: row.email,
        status: ClienteStatus::from_str(&row.status).unwrap_or_default(),
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    cliente_id: Option<String>,
    nome: String,
    telefone: Option<String>,
    email: Option<String>,
    source: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn row_to_lead(row: LeadRow) -> DomainResult<Lead> {
    Ok(Lead {
        id: parse_uuid(&row.id)?,
        cliente_id: parse_optional_uuid(row.cliente_id)?,
        nome: row.nome,
        telefone: row.telefone,
        email: row.email,
        source: row.source,
        status: LeadStatus::from_str(&row.status).unwrap_or_default(),
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl ClienteRepository for SqliteClienteRepository {
    async fn get_cliente(&self, id: Uuid) -> DomainResult<Option<Cliente>> {
        let row: Option<ClienteRow> = sqlx::query_as("SELECT * FROM clientes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_cliente).transpose()
    }

    async fn create_cliente(&self, cliente: &Cliente) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO clientes (id, nome, telefone, email, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(cliente.id.to_string())
        .bind(&cliente.nome)
        .bind(&cliente.telefone)
        .bind(&cliente.email)
        .bind(cliente.status.as_str())
        .bind(format_datetime(cliente.created_at))
        .bind(format_datetime(cliente.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_cliente_status(&self, id: Uuid, status: ClienteStatus) -> DomainResult<()> {
        let result = sqlx::query("UPDATE clientes SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_datetime(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ClienteNotFound(id));
        }
        Ok(())
    }

    async fn list_clientes(&self, status: Option<ClienteStatus>) -> DomainResult<Vec<Cliente>> {
        let rows: Vec<ClienteRow> = if let Some(status) = status {
            sqlx::query_as("SELECT * FROM clientes WHERE status = ? ORDER BY created_at DESC")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT * FROM clientes ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(row_to_cliente).collect()
    }

    async fn get_lead(&self, id: Uuid) -> DomainResult<Option<Lead>> {
        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM leads WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_lead).transpose()
    }

    async fn create_lead(&self, lead: &Lead) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO leads (id, cliente_id, nome, telefone, email, source, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(lead.id.to_string())
        .bind(lead.cliente_id.map(|id| id.to_string()))
        .bind(&lead.nome)
        .bind(&lead.telefone)
        .bind(&lead.email)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(format_datetime(lead.created_at))
        .bind(format_datetime(lead.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn link_lead(&self, lead_id: Uuid, cliente_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE leads SET cliente_id = ?, updated_at = ? WHERE id = ?")
            .bind(cliente_id.to_string())
            .bind(format_datetime(Utc::now()))
            .bind(lead_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::LeadNotFound(lead_id));
        }
        Ok(())
    }

    async fn update_lead_status(&self, id: Uuid, status: LeadStatus) -> DomainResult<()> {
        let result = sqlx::query("UPDATE leads SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_datetime(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::LeadNotFound(id));
        }
        Ok(())
    }

    async fn leads_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<Lead>> {
        let rows: Vec<LeadRow> =
            sqlx::query_as("SELECT * FROM leads WHERE cliente_id = ? ORDER BY created_at DESC")
                .bind(cliente_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(row_to_lead).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteClienteRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteClienteRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_cliente() {
        let repo = setup_test_repo().await;
        let cliente = Cliente::new("Maria");
        repo.create_cliente(&cliente).await.unwrap();

        let retrieved = repo.get_cliente(cliente.id).await.unwrap().unwrap();
        assert_eq!(retrieved.nome, "Maria");
        assert_eq!(retrieved.status, ClienteStatus::Novo);
    }

    #[tokio::test]
    async fn test_update_status_of_missing_cliente() {
        let repo = setup_test_repo().await;
        let missing = Uuid::new_v4();
        let err = repo
            .update_cliente_status(missing, ClienteStatus::Atendido)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ClienteNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_list_clientes_by_status() {
        let repo = setup_test_repo().await;
        let a = Cliente::new("A");
        let b = Cliente::new("B");
        repo.create_cliente(&a).await.unwrap();
        repo.create_cliente(&b).await.unwrap();
        repo.update_cliente_status(b.id, ClienteStatus::SemAtendimento).await.unwrap();

        let all = repo.list_clientes(None).await.unwrap();
        assert_eq!(all.len(), 2);
        let exhausted = repo.list_clientes(Some(ClienteStatus::SemAtendimento)).await.unwrap();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].id, b.id);
    }

    #[tokio::test]
    async fn test_lead_link_and_status() {
        let repo = setup_test_repo().await;
        let cliente = Cliente::new("Maria");
        repo.create_cliente(&cliente).await.unwrap();
        let lead = Lead::new("Maria", "whatsapp").with_telefone("+55 11 98888-7777");
        repo.create_lead(&lead).await.unwrap();

        repo.link_lead(lead.id, cliente.id).await.unwrap();
        repo.update_lead_status(lead.id, LeadStatus::Converted).await.unwrap();

        let stored = repo.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.cliente_id, Some(cliente.id));
        assert_eq!(stored.status, LeadStatus::Converted);
        assert_eq!(repo.leads_for_cliente(cliente.id).await.unwrap().len(), 1);

        let err = repo.link_lead(Uuid::new_v4(), cliente.id).await.unwrap_err();
        assert!(matches!(err, DomainError::LeadNotFound(_)));
    }
}
