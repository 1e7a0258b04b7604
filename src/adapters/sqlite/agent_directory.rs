//! SQLite-backed agent roster.
//!
//! Implements the [`AgentDirectory`] port plus the roster maintenance the CLI
//! uses to add agents and toggle who is on duty.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{format_datetime, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Agent;
use crate::domain::ports::AgentDirectory;

#[derive(Clone)]
pub struct SqliteAgentDirectory {
    pool: SqlitePool,
}

impl SqliteAgentDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an agent or replace the existing roster entry with the same id.
    pub async fn upsert_agent(&self, agent: &Agent) -> DomainResult<()> {
        for hour in [agent.shift_start_hour, agent.shift_end_hour].into_iter().flatten() {
            if hour > 23 {
                return Err(DomainError::ValidationFailed(format!(
                    "shift hour {hour} is outside 0-23"
                )));
            }
        }

        sqlx::query(
            r#"INSERT INTO agents (id, nome, department, on_duty, shift_start_hour, shift_end_hour, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   nome = excluded.nome,
                   department = excluded.department,
                   on_duty = excluded.on_duty,
                   shift_start_hour = excluded.shift_start_hour,
                   shift_end_hour = excluded.shift_end_hour"#,
        )
        .bind(&agent.id)
        .bind(&agent.nome)
        .bind(&agent.department)
        .bind(agent.on_duty)
        .bind(agent.shift_start_hour.map(i64::from))
        .bind(agent.shift_end_hour.map(i64::from))
        .bind(format_datetime(agent.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_on_duty(&self, id: &str, on_duty: bool) -> DomainResult<()> {
        let result = sqlx::query("UPDATE agents SET on_duty = ? WHERE id = ?")
            .bind(on_duty)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ValidationFailed(format!("unknown agent: {id}")));
        }
        Ok(())
    }

    pub async fn get_agent(&self, id: &str) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_agent).transpose()
    }

    /// Every agent, optionally restricted to one department.
    pub async fn list_agents(&self, department: Option<&str>) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = if let Some(department) = department {
            sqlx::query_as("SELECT * FROM agents WHERE department = ? ORDER BY id ASC")
                .bind(department)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT * FROM agents ORDER BY department ASC, id ASC")
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(row_to_agent).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    nome: String,
    department: String,
    on_duty: bool,
    shift_start_hour: Option<i64>,
    shift_end_hour: Option<i64>,
    created_at: String,
}

fn row_to_agent(row: AgentRow) -> DomainResult<Agent> {
    let hour = |h: Option<i64>| {
        h.map(u32::try_from)
            .transpose()
            .map_err(|e| DomainError::SerializationError(format!("shift hour: {e}")))
    };

    Ok(Agent {
        id: row.id,
        nome: row.nome,
        department: row.department,
        on_duty: row.on_duty,
        shift_start_hour: hour(row.shift_start_hour)?,
        shift_end_hour: hour(row.shift_end_hour)?,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[async_trait]
impl AgentDirectory for SqliteAgentDirectory {
    async fn list_on_duty_agents(
        &self,
        department: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<String>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents WHERE department = ? AND on_duty = 1 ORDER BY id ASC",
        )
        .bind(department)
        .fetch_all(&self.pool)
        .await?;

        let mut available = Vec::with_capacity(rows.len());
        for row in rows {
            let agent = row_to_agent(row)?;
            if agent.is_available_at(at) {
                available.push(agent.id);
            }
        }
        Ok(available)
    }
}
