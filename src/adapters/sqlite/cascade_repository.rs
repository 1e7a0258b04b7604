//! SQLite implementation of the CascadeRepository.
//!
//! Every mutation opens its transaction with a write so the connection takes
//! SQLite's write lock up front; competing writers queue on the busy timeout
//! and then observe the winner's rows through the `status = 'Ativo'` guards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::sqlite::{
    format_datetime, parse_datetime, parse_optional_datetime, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AdvanceTierResult, Cascade, CascadeEntry, CascadeStatus, DateRange, FinalizeResult, Motivo,
    OpenCascadeResult,
};
use crate::domain::ports::{CascadeRepository, OverdueTier};

#[derive(Clone)]
pub struct SqliteCascadeRepository {
    pool: SqlitePool,
}

impl SqliteCascadeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: String,
    cascade_id: String,
    cliente_id: String,
    lead_id: String,
    user_id: String,
    sequencia: i64,
    status: String,
    sla_horas: f64,
    iniciado_em: String,
    expira_em: String,
    finalizado_em: Option<String>,
    motivo: Option<String>,
}

fn row_to_entry(row: EntryRow) -> DomainResult<CascadeEntry> {
    let status = CascadeStatus::from_str(&row.status).ok_or_else(|| {
        DomainError::SerializationError(format!("unknown cascade status: {}", row.status))
    })?;
    let motivo = row
        .motivo
        .map(|m| {
            Motivo::from_str(&m)
                .ok_or_else(|| DomainError::SerializationError(format!("unknown motivo: {m}")))
        })
        .transpose()?;

    Ok(CascadeEntry {
        id: parse_uuid(&row.id)?,
        cascade_id: parse_uuid(&row.cascade_id)?,
        cliente_id: parse_uuid(&row.cliente_id)?,
        lead_id: parse_uuid(&row.lead_id)?,
        user_id: row.user_id,
        sequencia: u32::try_from(row.sequencia)
            .map_err(|e| DomainError::SerializationError(format!("sequencia: {e}")))?,
        status,
        sla_horas: row.sla_horas,
        iniciado_em: parse_datetime(&row.iniciado_em)?,
        expira_em: parse_datetime(&row.expira_em)?,
        finalizado_em: parse_optional_datetime(row.finalizado_em)?,
        motivo,
    })
}

#[derive(sqlx::FromRow)]
struct CascadeRow {
    id: String,
    cliente_id: String,
    lead_id: String,
    sequencia_atual: i64,
    aberta_em: String,
    encerrada_em: Option<String>,
    desfecho: Option<String>,
    resolvido_por: Option<String>,
}

fn row_to_cascade(row: CascadeRow) -> DomainResult<Cascade> {
    Ok(Cascade {
        id: parse_uuid(&row.id)?,
        cliente_id: parse_uuid(&row.cliente_id)?,
        lead_id: parse_uuid(&row.lead_id)?,
        sequencia_atual: u32::try_from(row.sequencia_atual)
            .map_err(|e| DomainError::SerializationError(format!("sequencia_atual: {e}")))?,
        aberta_em: parse_datetime(&row.aberta_em)?,
        encerrada_em: parse_optional_datetime(row.encerrada_em)?,
        desfecho: row.desfecho.as_deref().and_then(Motivo::from_str),
        resolvido_por: row.resolvido_por,
    })
}

async fn insert_entries(conn: &mut SqliteConnection, batch: &[CascadeEntry]) -> DomainResult<u64> {
    let mut inserted = 0;
    for entry in batch {
        let result = sqlx::query(
            r#"INSERT INTO cascade_entries (id, cascade_id, cliente_id, lead_id, user_id,
               sequencia, status, sla_horas, iniciado_em, expira_em, finalizado_em, motivo)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.cascade_id.to_string())
        .bind(entry.cliente_id.to_string())
        .bind(entry.lead_id.to_string())
        .bind(&entry.user_id)
        .bind(i64::from(entry.sequencia))
        .bind(CascadeStatus::Ativo.as_str())
        .bind(entry.sla_horas)
        .bind(format_datetime(entry.iniciado_em))
        .bind(format_datetime(entry.expira_em))
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

fn check_batch(cascade_id: Uuid, sequencia: u32, batch: &[CascadeEntry]) -> DomainResult<()> {
    match batch
        .iter()
        .find(|e| e.cascade_id != cascade_id || e.sequencia != sequencia || !e.is_active())
    {
        Some(bad) => Err(DomainError::ValidationFailed(format!(
            "entry {} does not belong to tier {} of cascade {}",
            bad.id, sequencia, cascade_id
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl CascadeRepository for SqliteCascadeRepository {
    async fn open_cascade(
        &self,
        cascade: &Cascade,
        batch: &[CascadeEntry],
    ) -> DomainResult<OpenCascadeResult> {
        check_batch(cascade.id, cascade.sequencia_atual, batch)?;

        let mut tx = self.pool.begin().await?;

        // The partial unique index on open cascades turns a second opener into a no-op.
        let inserted = sqlx::query(
            r#"INSERT OR IGNORE INTO cascades (id, cliente_id, lead_id, sequencia_atual, aberta_em)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(cascade.id.to_string())
        .bind(cascade.cliente_id.to_string())
        .bind(cascade.lead_id.to_string())
        .bind(i64::from(cascade.sequencia_atual))
        .bind(format_datetime(cascade.aberta_em))
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let existing: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM cascades WHERE cliente_id = ? AND encerrada_em IS NULL",
            )
            .bind(cascade.cliente_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;

            return match existing {
                Some((id,)) => {
                    debug!(cliente_id = %cascade.cliente_id, cascade_id = %id, "cascade already open");
                    Ok(OpenCascadeResult::AlreadyOpen { cascade_id: parse_uuid(&id)? })
                }
                None => Err(DomainError::DatabaseError(format!(
                    "cascade {} was not inserted and no open cascade exists",
                    cascade.id
                ))),
            };
        }

        if batch.is_empty() {
            sqlx::query("UPDATE cascades SET encerrada_em = ?, desfecho = ? WHERE id = ?")
                .bind(format_datetime(cascade.aberta_em))
                .bind(Motivo::SemAtendimento.as_str())
                .bind(cascade.id.to_string())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(OpenCascadeResult::Exhausted);
        }

        insert_entries(&mut *tx, batch).await?;
        tx.commit().await?;

        info!(
            cliente_id = %cascade.cliente_id,
            cascade_id = %cascade.id,
            entries = batch.len(),
            "opened cascade"
        );
        Ok(OpenCascadeResult::Opened)
    }

    async fn advance_tier(
        &self,
        cascade_id: Uuid,
        tier: u32,
        next_batch: &[CascadeEntry],
        now: DateTime<Utc>,
    ) -> DomainResult<AdvanceTierResult> {
        let next_tier = tier + 1;
        check_batch(cascade_id, next_tier, next_batch)?;

        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            r#"UPDATE cascade_entries
               SET status = ?, finalizado_em = ?, motivo = ?
               WHERE cascade_id = ? AND sequencia = ? AND status = ?"#,
        )
        .bind(CascadeStatus::Finalizado.as_str())
        .bind(format_datetime(now))
        .bind(Motivo::Expirado.as_str())
        .bind(cascade_id.to_string())
        .bind(i64::from(tier))
        .bind(CascadeStatus::Ativo.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if expired == 0 {
            tx.rollback().await?;
            debug!(cascade_id = %cascade_id, tier, "tier already finalized, nothing to advance");
            return Ok(AdvanceTierResult::NoOp);
        }

        if next_batch.is_empty() {
            sqlx::query(
                "UPDATE cascades SET encerrada_em = ?, desfecho = ? WHERE id = ? AND encerrada_em IS NULL",
            )
            .bind(format_datetime(now))
            .bind(Motivo::SemAtendimento.as_str())
            .bind(cascade_id.to_string())
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(AdvanceTierResult::Exhausted { expired });
        }

        let bumped = sqlx::query(
            r#"UPDATE cascades SET sequencia_atual = ?
               WHERE id = ? AND sequencia_atual = ? AND encerrada_em IS NULL"#,
        )
        .bind(i64::from(next_tier))
        .bind(cascade_id.to_string())
        .bind(i64::from(tier))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if bumped == 0 {
            // Live entries on a tier the lineage is no longer at; leave the rows untouched.
            warn!(cascade_id = %cascade_id, tier, "cascade lineage out of step with its entries");
            tx.rollback().await?;
            return Ok(AdvanceTierResult::NoOp);
        }

        let created = insert_entries(&mut *tx, next_batch).await?;
        tx.commit().await?;

        Ok(AdvanceTierResult::Escalated { expired, created })
    }

    async fn finalize_open(
        &self,
        cliente_id: Uuid,
        user_id: &str,
        motivo: Motivo,
        now: DateTime<Utc>,
    ) -> DomainResult<FinalizeResult> {
        let now = format_datetime(now);
        let mut tx = self.pool.begin().await?;

        let own_entries = sqlx::query(
            r#"UPDATE cascade_entries
               SET status = ?, finalizado_em = ?, motivo = ?
               WHERE cliente_id = ? AND user_id = ? AND status = ?"#,
        )
        .bind(CascadeStatus::Finalizado.as_str())
        .bind(&now)
        .bind(motivo.as_str())
        .bind(cliente_id.to_string())
        .bind(user_id)
        .bind(CascadeStatus::Ativo.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let duplicates = sqlx::query(
            r#"UPDATE cascade_entries
               SET status = ?, finalizado_em = ?, motivo = ?
               WHERE cliente_id = ? AND status = ?"#,
        )
        .bind(CascadeStatus::Finalizado.as_str())
        .bind(&now)
        .bind(Motivo::Duplicado.as_str())
        .bind(cliente_id.to_string())
        .bind(CascadeStatus::Ativo.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if own_entries + duplicates == 0 {
            tx.rollback().await?;
            return Ok(FinalizeResult::default());
        }

        let closed: Option<(String,)> = sqlx::query_as(
            r#"UPDATE cascades SET encerrada_em = ?, desfecho = ?, resolvido_por = ?
               WHERE cliente_id = ? AND encerrada_em IS NULL
               RETURNING id"#,
        )
        .bind(&now)
        .bind(motivo.as_str())
        .bind(user_id)
        .bind(cliente_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(FinalizeResult {
            own_entries,
            duplicates,
            cascade_id: closed.map(|(id,)| parse_uuid(&id)).transpose()?,
        })
    }

    async fn open_cascade_for(&self, cliente_id: Uuid) -> DomainResult<Option<Cascade>> {
        let row: Option<CascadeRow> = sqlx::query_as(
            "SELECT * FROM cascades WHERE cliente_id = ? AND encerrada_em IS NULL",
        )
        .bind(cliente_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_cascade).transpose()
    }

    async fn get_cascade(&self, id: Uuid) -> DomainResult<Option<Cascade>> {
        let row: Option<CascadeRow> = sqlx::query_as("SELECT * FROM cascades WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_cascade).transpose()
    }

    async fn cascades_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<Cascade>> {
        let rows: Vec<CascadeRow> = sqlx::query_as(
            "SELECT * FROM cascades WHERE cliente_id = ? ORDER BY aberta_em ASC, id ASC",
        )
        .bind(cliente_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_cascade).collect()
    }

    async fn active_for_user(&self, user_id: &str) -> DomainResult<Vec<CascadeEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"SELECT * FROM cascade_entries
               WHERE user_id = ? AND status = ?
               ORDER BY expira_em ASC, id ASC"#,
        )
        .bind(user_id)
        .bind(CascadeStatus::Ativo.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn active_entries(&self, cliente_id: Option<Uuid>) -> DomainResult<Vec<CascadeEntry>> {
        let rows: Vec<EntryRow> = if let Some(cliente_id) = cliente_id {
            sqlx::query_as(
                r#"SELECT * FROM cascade_entries
                   WHERE cliente_id = ? AND status = ?
                   ORDER BY sequencia ASC, expira_em ASC, user_id ASC"#,
            )
            .bind(cliente_id.to_string())
            .bind(CascadeStatus::Ativo.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"SELECT * FROM cascade_entries
                   WHERE status = ?
                   ORDER BY cliente_id ASC, sequencia ASC, expira_em ASC, user_id ASC"#,
            )
            .bind(CascadeStatus::Ativo.as_str())
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn entries_for_cliente(&self, cliente_id: Uuid) -> DomainResult<Vec<CascadeEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"SELECT * FROM cascade_entries
               WHERE cliente_id = ?
               ORDER BY iniciado_em ASC, sequencia ASC, user_id ASC"#,
        )
        .bind(cliente_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn overdue_tiers(&self, now: DateTime<Utc>, limit: u32) -> DomainResult<Vec<OverdueTier>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT cliente_id, sequencia FROM cascade_entries
               WHERE status = ? AND expira_em < ?
               GROUP BY cliente_id, sequencia
               ORDER BY MIN(expira_em) ASC
               LIMIT ?"#,
        )
        .bind(CascadeStatus::Ativo.as_str())
        .bind(format_datetime(now))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(cliente_id, sequencia)| {
                Ok(OverdueTier {
                    cliente_id: parse_uuid(&cliente_id)?,
                    sequencia: u32::try_from(sequencia)
                        .map_err(|e| DomainError::SerializationError(format!("sequencia: {e}")))?,
                })
            })
            .collect()
    }

    async fn finalized_between(&self, range: DateRange) -> DomainResult<Vec<CascadeEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"SELECT * FROM cascade_entries
               WHERE status = ? AND finalizado_em >= ? AND finalizado_em < ?
               ORDER BY finalizado_em ASC, id ASC"#,
        )
        .bind(CascadeStatus::Finalizado.as_str())
        .bind(format_datetime(range.from))
        .bind(format_datetime(range.to))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn count_exhausted_between(&self, range: DateRange) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM cascades
               WHERE desfecho = ? AND encerrada_em >= ? AND encerrada_em < ?"#,
        )
        .bind(Motivo::SemAtendimento.as_str())
        .bind(format_datetime(range.from))
        .bind(format_datetime(range.to))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteClienteRepository};
    use crate::domain::models::{Cliente, Lead};
    use crate::domain::ports::ClienteRepository;
    use chrono::Duration;

    async fn setup() -> (SqliteCascadeRepository, Cliente, Lead) {
        let pool = create_migrated_test_pool().await.unwrap();
        let clientes = SqliteClienteRepository::new(pool.clone());
        let cliente = Cliente::new("Maria");
        clientes.create_cliente(&cliente).await.unwrap();
        let mut lead = Lead::new("Maria", "site");
        lead.cliente_id = Some(cliente.id);
        clientes.create_lead(&lead).await.unwrap();
        (SqliteCascadeRepository::new(pool), cliente, lead)
    }

    fn tier_batch(cascade: &Cascade, tier: u32, users: &[&str], at: DateTime<Utc>) -> Vec<CascadeEntry> {
        users
            .iter()
            .map(|u| CascadeEntry::new(cascade, *u, tier, 1.0, at).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_open_cascade_writes_batch() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        let batch = tier_batch(&cascade, 1, &["ana", "bruno"], now);

        let result = repo.open_cascade(&cascade, &batch).await.unwrap();
        assert_eq!(result, OpenCascadeResult::Opened);

        let active = repo.active_entries(Some(cliente.id)).await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|e| e.sequencia == 1 && e.expira_em == batch[0].expira_em));

        let open = repo.open_cascade_for(cliente.id).await.unwrap().unwrap();
        assert_eq!(open.id, cascade.id);
    }

    #[tokio::test]
    async fn test_second_open_is_rejected() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let first = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&first, &tier_batch(&first, 1, &["ana"], now)).await.unwrap();

        let second = Cascade::new(cliente.id, lead.id, now);
        let result = repo
            .open_cascade(&second, &tier_batch(&second, 1, &["bruno"], now))
            .await
            .unwrap();
        assert_eq!(result, OpenCascadeResult::AlreadyOpen { cascade_id: first.id });
        assert_eq!(repo.active_entries(Some(cliente.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_with_empty_batch_records_exhaustion() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);

        let result = repo.open_cascade(&cascade, &[]).await.unwrap();
        assert_eq!(result, OpenCascadeResult::Exhausted);
        assert!(repo.open_cascade_for(cliente.id).await.unwrap().is_none());

        let stored = repo.get_cascade(cascade.id).await.unwrap().unwrap();
        assert_eq!(stored.desfecho, Some(Motivo::SemAtendimento));
    }

    #[tokio::test]
    async fn test_advance_twice_is_noop() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&cascade, &tier_batch(&cascade, 1, &["ana", "bruno"], now))
            .await
            .unwrap();

        let later = now + Duration::hours(2);
        let next = tier_batch(&cascade, 2, &["gerente"], later);
        let first = repo.advance_tier(cascade.id, 1, &next, later).await.unwrap();
        assert_eq!(first, AdvanceTierResult::Escalated { expired: 2, created: 1 });

        let again = tier_batch(&cascade, 2, &["gerente"], later);
        let second = repo.advance_tier(cascade.id, 1, &again, later).await.unwrap();
        assert_eq!(second, AdvanceTierResult::NoOp);

        let active = repo.active_entries(Some(cliente.id)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].sequencia, 2);
        assert_eq!(repo.open_cascade_for(cliente.id).await.unwrap().unwrap().sequencia_atual, 2);
    }

    #[tokio::test]
    async fn test_advance_rejects_batch_for_wrong_tier() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&cascade, &tier_batch(&cascade, 1, &["ana"], now)).await.unwrap();

        let wrong = tier_batch(&cascade, 3, &["gerente"], now);
        let err = repo.advance_tier(cascade.id, 1, &wrong, now).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert_eq!(repo.active_entries(Some(cliente.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_tags_duplicates_and_closes() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&cascade, &tier_batch(&cascade, 1, &["ana", "bruno", "carla"], now))
            .await
            .unwrap();

        let result = repo
            .finalize_open(cliente.id, "bruno", Motivo::Resolvido, now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(result.own_entries, 1);
        assert_eq!(result.duplicates, 2);
        assert_eq!(result.cascade_id, Some(cascade.id));

        let entries = repo.entries_for_cliente(cliente.id).await.unwrap();
        for entry in &entries {
            assert_eq!(entry.status, CascadeStatus::Finalizado);
            let expected = if entry.user_id == "bruno" { Motivo::Resolvido } else { Motivo::Duplicado };
            assert_eq!(entry.motivo, Some(expected));
        }

        let closed = repo.get_cascade(cascade.id).await.unwrap().unwrap();
        assert_eq!(closed.desfecho, Some(Motivo::Resolvido));
        assert_eq!(closed.resolvido_por.as_deref(), Some("bruno"));

        let again = repo
            .finalize_open(cliente.id, "bruno", Motivo::Resolvido, now + Duration::minutes(6))
            .await
            .unwrap();
        assert!(!again.applied());
    }

    #[tokio::test]
    async fn test_overdue_tiers_groups_by_cliente_and_tier() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&cascade, &tier_batch(&cascade, 1, &["ana", "bruno"], now))
            .await
            .unwrap();

        assert!(repo.overdue_tiers(now, 10).await.unwrap().is_empty());

        let overdue = repo.overdue_tiers(now + Duration::minutes(61), 10).await.unwrap();
        assert_eq!(overdue, vec![OverdueTier { cliente_id: cliente.id, sequencia: 1 }]);
    }

    #[tokio::test]
    async fn test_deadline_is_immutable() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        let batch = tier_batch(&cascade, 1, &["ana"], now);
        repo.open_cascade(&cascade, &batch).await.unwrap();

        let result = sqlx::query("UPDATE cascade_entries SET expira_em = ? WHERE id = ?")
            .bind(format_datetime(now + Duration::days(1)))
            .bind(batch[0].id.to_string())
            .execute(&repo.pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_finalized_between_and_exhausted_count() {
        let (repo, cliente, lead) = setup().await;
        let now = Utc::now();
        let cascade = Cascade::new(cliente.id, lead.id, now);
        repo.open_cascade(&cascade, &tier_batch(&cascade, 1, &["ana"], now)).await.unwrap();
        let later = now + Duration::hours(2);
        repo.advance_tier(cascade.id, 1, &[], later).await.unwrap();

        let range = DateRange::new(now, later + Duration::seconds(1));
        let finalized = repo.finalized_between(range).await.unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].motivo, Some(Motivo::Expirado));
        assert_eq!(repo.count_exhausted_between(range).await.unwrap(), 1);

        let before = DateRange::new(now - Duration::days(1), now);
        assert!(repo.finalized_between(before).await.unwrap().is_empty());
        assert_eq!(repo.count_exhausted_between(before).await.unwrap(), 0);
    }
}
