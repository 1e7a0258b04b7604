//! Wiring of the sqlite store, policy, notifier and services for one CLI run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::adapters::notify;
use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteAgentDirectory, SqliteCascadeRepository,
    SqliteClienteRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::{Clock, SystemClock};
use crate::services::{
    CascadeController, DispatchStats, ExpirySweeper, MetricsAggregator, NotificationDispatcher,
    TieredAssignmentPolicy, TriggerAdapter,
};

pub type SqlitePolicy = TieredAssignmentPolicy<SqliteAgentDirectory>;
pub type SqliteController =
    CascadeController<SqliteCascadeRepository, SqliteClienteRepository, SqlitePolicy>;
pub type SqliteTriggers =
    TriggerAdapter<SqliteCascadeRepository, SqliteClienteRepository, SqlitePolicy>;
pub type SqliteSweeper =
    ExpirySweeper<SqliteCascadeRepository, SqliteClienteRepository, SqlitePolicy>;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub agents: Arc<SqliteAgentDirectory>,
    pub clientes: Arc<SqliteClienteRepository>,
    pub controller: Arc<SqliteController>,
    pub triggers: SqliteTriggers,
    pub metrics: MetricsAggregator<SqliteCascadeRepository>,
    worker: JoinHandle<DispatchStats>,
}

impl AppContext {
    /// Open the configured database and build the service graph.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = initialize_database(
            &config.database.url(),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .context("Failed to open database. Run 'cascata init' first.")?;
        Self::from_pool(config, pool)
    }

    pub fn from_pool(config: &Config, pool: SqlitePool) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let agents = Arc::new(SqliteAgentDirectory::new(pool.clone()));
        let clientes = Arc::new(SqliteClienteRepository::new(pool.clone()));
        let cascades = Arc::new(SqliteCascadeRepository::new(pool.clone()));
        let policy = Arc::new(TieredAssignmentPolicy::new(
            agents.clone(),
            config.tiers.clone(),
            clock.clone(),
        ));

        let notifier = notify::from_config(&config.notification)
            .context("Failed to build notifier")?;
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(notifier, config.notification.channel_capacity);

        let controller = Arc::new(
            CascadeController::new(cascades.clone(), clientes.clone(), policy, clock)
                .with_dispatcher(dispatcher),
        );
        let triggers = TriggerAdapter::new(controller.clone(), config.retry.clone());
        let metrics = MetricsAggregator::new(cascades);

        Ok(Self {
            config: config.clone(),
            pool,
            agents,
            clientes,
            controller,
            triggers,
            metrics,
            worker,
        })
    }

    pub fn sweeper(&self) -> SqliteSweeper {
        ExpirySweeper::new(self.controller.clone(), self.config.sweeper.clone())
    }

    /// Drop the services, wait for queued notifications and close the pool.
    pub async fn shutdown(self) -> DispatchStats {
        let Self {
            pool,
            controller,
            triggers,
            metrics,
            worker,
            ..
        } = self;
        drop(triggers);
        drop(metrics);
        drop(controller);

        let stats = match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                warn!(error = %e, "Notification worker panicked");
                DispatchStats::default()
            }
            Err(_) => {
                warn!("Timed out waiting for pending notifications");
                DispatchStats::default()
            }
        };
        pool.close().await;
        stats
    }
}
