//! Expiry sweeper daemon.
//!
//! The only producer of time-based transitions. Each sweep lists the
//! `(cliente, tier)` pairs whose live entries are past their deadline and asks
//! the controller to advance each one. Several sweepers may run against the
//! same store; advancing an already-advanced tier is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::SweeperConfig;
use crate::domain::ports::{CascadeRepository, ClienteRepository};
use crate::services::assignment_policy::AssignmentPolicy;
use crate::services::cascade_controller::{AdvanceOutcome, CascadeController};

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Overdue tiers found.
    pub overdue: u64,
    pub escalated: u64,
    pub exhausted: u64,
    /// Tiers another caller had already handled.
    pub noops: u64,
    pub failed: u64,
}

/// Event emitted by the sweeper.
#[derive(Debug, Clone)]
pub enum SweeperEvent {
    Started,
    SweepStarted { run_number: u64 },
    SweepCompleted {
        run_number: u64,
        report: SweepReport,
        duration_ms: u64,
    },
    SweepFailed { run_number: u64, error: String },
    Stopped { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    ChannelClosed,
}

/// Running totals across sweeps.
#[derive(Debug, Clone, Default)]
pub struct SweeperStatus {
    pub running: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<Instant>,
    pub total_escalated: u64,
    pub total_exhausted: u64,
}

/// Handle to stop and observe a running sweeper.
#[derive(Clone)]
pub struct SweeperHandle {
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    status: Arc<RwLock<SweeperStatus>>,
}

impl SweeperHandle {
    /// Request the sweeper to stop. A sweep in progress finishes first; an
    /// idle sweeper stops without waiting for its next tick.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.stop_signal.notify_one();
    }

    pub async fn status(&self) -> SweeperStatus {
        self.status.read().await.clone()
    }
}

pub struct ExpirySweeper<C, K, P>
where
    C: CascadeRepository + 'static,
    K: ClienteRepository + 'static,
    P: AssignmentPolicy + 'static,
{
    controller: Arc<CascadeController<C, K, P>>,
    config: SweeperConfig,
    status: Arc<RwLock<SweeperStatus>>,
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
}

impl<C, K, P> ExpirySweeper<C, K, P>
where
    C: CascadeRepository + 'static,
    K: ClienteRepository + 'static,
    P: AssignmentPolicy + 'static,
{
    pub fn new(controller: Arc<CascadeController<C, K, P>>, config: SweeperConfig) -> Self {
        Self {
            controller,
            config,
            status: Arc::new(RwLock::new(SweeperStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SweeperHandle {
        SweeperHandle {
            stop_flag: self.stop_flag.clone(),
            stop_signal: self.stop_signal.clone(),
            status: self.status.clone(),
        }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Spawn the sweep loop, returning a channel of events.
    pub fn run(self) -> mpsc::Receiver<SweeperEvent> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            self.run_loop(tx).await;
        });
        rx
    }

    async fn run_loop(self, tx: mpsc::Sender<SweeperEvent>) {
        self.status.write().await.running = true;
        let _ = tx.send(SweeperEvent::Started).await;
        info!(interval_secs = self.config.interval_secs, "Expiry sweeper started");

        let mut timer = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        timer.tick().await;

        let mut reason = StopReason::Requested;
        if self.config.run_on_startup
            && !self.stop_flag.load(Ordering::Acquire)
            && !self.run_cycle(&tx).await
        {
            reason = StopReason::ChannelClosed;
        }

        while reason == StopReason::Requested && !self.stop_flag.load(Ordering::Acquire) {
            // A stop raised mid-sweep leaves a permit, so this wakes at once.
            tokio::select! {
                _ = timer.tick() => {}
                () = self.stop_signal.notified() => break,
            }
            if !self.run_cycle(&tx).await {
                reason = StopReason::ChannelClosed;
            }
        }

        self.status.write().await.running = false;
        info!(reason = ?reason, "Expiry sweeper stopped");
        let _ = tx.send(SweeperEvent::Stopped { reason }).await;
    }

    /// One tick. Returns false once nobody listens for events.
    async fn run_cycle(&self, tx: &mpsc::Sender<SweeperEvent>) -> bool {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };

        if tx.send(SweeperEvent::SweepStarted { run_number }).await.is_err() {
            return false;
        }

        let start = Instant::now();
        let result = self.sweep_once().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let event = match result {
            Ok(report) => {
                let mut status = self.status.write().await;
                status.successful_runs += 1;
                status.last_run = Some(Instant::now());
                status.total_escalated += report.escalated;
                status.total_exhausted += report.exhausted;
                SweeperEvent::SweepCompleted {
                    run_number,
                    report,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(run_number, error = %e, "Sweep failed, retrying next tick");
                self.status.write().await.failed_runs += 1;
                SweeperEvent::SweepFailed {
                    run_number,
                    error: e.to_string(),
                }
            }
        };

        tx.send(event).await.is_ok()
    }

    /// Advance every overdue tier once.
    ///
    /// Fails only when the overdue query itself fails; a tier that fails to
    /// advance is counted and picked up again on the next sweep.
    pub async fn sweep_once(&self) -> DomainResult<SweepReport> {
        let overdue = self.controller.overdue_tiers(self.config.batch_limit).await?;
        let mut report = SweepReport {
            overdue: overdue.len() as u64,
            ..SweepReport::default()
        };
        if overdue.is_empty() {
            return Ok(report);
        }

        let controller = &self.controller;
        let mut results = stream::iter(overdue)
            .map(|tier| async move {
                let outcome = controller.advance_on_expiry(tier.cliente_id, tier.sequencia).await;
                (tier, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some((tier, outcome)) = results.next().await {
            match outcome {
                Ok(AdvanceOutcome::Escalated { .. }) => report.escalated += 1,
                Ok(AdvanceOutcome::Exhausted) => report.exhausted += 1,
                Ok(AdvanceOutcome::NoOp) => report.noops += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        cliente_id = %tier.cliente_id,
                        tier = tier.sequencia,
                        error = %e,
                        "Failed to advance overdue tier"
                    );
                }
            }
        }

        debug!(?report, "Sweep finished");
        Ok(report)
    }
}
