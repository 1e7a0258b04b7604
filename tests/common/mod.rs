//! Common test utilities for integration tests
//!
//! Builds a controller over a real sqlite store with a manual clock, so
//! deadlines are driven by the test instead of wall time.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use cascata::adapters::sqlite::{
    create_migrated_test_pool, initialize_database, PoolConfig, SqliteAgentDirectory,
    SqliteCascadeRepository, SqliteClienteRepository,
};
use cascata::domain::models::{Agent, CascadeEntry, Cliente, Lead, TierConfig};
use cascata::domain::ports::{CascadeRepository, ClienteRepository, ManualClock};
use cascata::services::{CascadeController, TieredAssignmentPolicy};

pub type Controller = CascadeController<
    SqliteCascadeRepository,
    SqliteClienteRepository,
    TieredAssignmentPolicy<SqliteAgentDirectory>,
>;

pub struct Harness {
    pub pool: SqlitePool,
    pub controller: Arc<Controller>,
    pub cascades: Arc<SqliteCascadeRepository>,
    pub clientes: Arc<SqliteClienteRepository>,
    pub agents: Arc<SqliteAgentDirectory>,
    pub clock: Arc<ManualClock>,
}

/// Monday 10:00 UTC, inside every day shift used by the tests.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
}

pub fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig::new("atendimento", 1.0),
        TierConfig::new("gerencia", 2.0),
    ]
}

/// Harness over an in-memory database.
pub async fn harness() -> Harness {
    let pool = create_migrated_test_pool().await.expect("test pool");
    build(pool, default_tiers())
}

/// Harness over a file database with several connections, for tests that
/// need writers to actually contend.
pub async fn file_harness(dir: &Path) -> Harness {
    let url = format!("sqlite:{}", dir.join("cascata.db").display());
    let pool = initialize_database(
        &url,
        Some(PoolConfig {
            max_connections: 4,
            ..PoolConfig::default()
        }),
    )
    .await
    .expect("file pool");
    build(pool, default_tiers())
}

pub fn build(pool: SqlitePool, tiers: Vec<TierConfig>) -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cascades = Arc::new(SqliteCascadeRepository::new(pool.clone()));
    let clientes = Arc::new(SqliteClienteRepository::new(pool.clone()));
    let agents = Arc::new(SqliteAgentDirectory::new(pool.clone()));
    let policy = Arc::new(TieredAssignmentPolicy::new(agents.clone(), tiers, clock.clone()));
    let controller = Arc::new(CascadeController::new(
        cascades.clone(),
        clientes.clone(),
        policy,
        clock.clone(),
    ));
    Harness {
        pool,
        controller,
        cascades,
        clientes,
        agents,
        clock,
    }
}

impl Harness {
    pub async fn roster(&self, agents: &[(&str, &str)]) {
        for (id, department) in agents {
            self.agents
                .upsert_agent(&Agent::new(*id, *id, *department))
                .await
                .expect("upsert agent");
        }
    }

    /// Persist a fresh lead and its cliente, returning `(lead_id, cliente_id)`.
    pub async fn new_lead(&self, nome: &str) -> (Uuid, Uuid) {
        let lead = Lead::new(nome, "site");
        let cliente = Cliente::from_lead(&lead);
        self.clientes.create_lead(&lead).await.expect("create lead");
        self.clientes.create_cliente(&cliente).await.expect("create cliente");
        (lead.id, cliente.id)
    }

    pub async fn active(&self, cliente_id: Uuid) -> Vec<CascadeEntry> {
        self.controller
            .cascade_snapshot(Some(cliente_id))
            .await
            .expect("snapshot")
    }

    pub async fn all_entries(&self, cliente_id: Uuid) -> Vec<CascadeEntry> {
        self.cascades
            .entries_for_cliente(cliente_id)
            .await
            .expect("entries")
    }
}

/// Distinct tiers among `entries`.
pub fn tiers_of(entries: &[CascadeEntry]) -> Vec<u32> {
    let mut tiers: Vec<u32> = entries.iter().map(|e| e.sequencia).collect();
    tiers.sort_unstable();
    tiers.dedup();
    tiers
}
