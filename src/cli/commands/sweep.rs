//! Implementation of the `cascata sweep` commands.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::logging::prune_old_logs;
use crate::services::{SweepReport, SweeperEvent};

#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(subcommand)]
    pub command: SweepCommands,
}

#[derive(Subcommand, Debug)]
pub enum SweepCommands {
    /// Advance every overdue tier once and exit
    Once,
    /// Sweep on an interval until interrupted
    Run {
        /// Override sweeper.interval_secs
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct SweepOutput {
    #[serde(flatten)]
    pub report: SweepReport,
}

impl CommandOutput for SweepOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        format!(
            "Overdue: {}  escalated: {}  exhausted: {}  already handled: {}  failed: {}",
            r.overdue, r.escalated, r.exhausted, r.noops, r.failed
        )
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DaemonOutput {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub total_escalated: u64,
    pub total_exhausted: u64,
    pub notifications_delivered: u64,
    pub notifications_failed: u64,
}

impl CommandOutput for DaemonOutput {
    fn to_human(&self) -> String {
        format!(
            "Sweeper stopped after {} run(s) ({} failed): {} escalated, {} exhausted, {} notification(s) sent",
            self.total_runs,
            self.failed_runs,
            self.total_escalated,
            self.total_exhausted,
            self.notifications_delivered
        )
    }
}

pub async fn execute(args: SweepArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        SweepCommands::Once => {
            let ctx = AppContext::open(config).await?;
            let result = ctx.sweeper().sweep_once().await;
            ctx.shutdown().await;
            output(&SweepOutput { report: result? }, json_mode);
            Ok(())
        }
        SweepCommands::Run { interval } => {
            let mut config = config.clone();
            if let Some(secs) = interval {
                config.sweeper.interval_secs = secs;
            }
            run_daemon(&config, json_mode).await
        }
    }
}

async fn run_daemon(config: &Config, json_mode: bool) -> Result<()> {
    if let Some(dir) = &config.logging.log_dir {
        match prune_old_logs(Path::new(dir), config.logging.retention_days).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Pruned old log files"),
            Err(e) => warn!(error = %e, "Failed to prune old log files"),
        }
    }

    let ctx = AppContext::open(config).await?;
    let sweeper = ctx.sweeper();
    let settings = sweeper.config();
    info!(
        interval_secs = settings.interval_secs,
        batch_limit = settings.batch_limit,
        concurrency = settings.concurrency,
        "Starting sweeper daemon, press ctrl-c to stop"
    );
    let handle = sweeper.handle();
    let mut events = sweeper.run();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for ctrl-c");
                }
                info!("Shutdown requested, finishing current sweep");
                handle.stop();
                break;
            }
            event = events.recv() => match event {
                Some(SweeperEvent::SweepCompleted { run_number, report, duration_ms }) => {
                    if report.overdue > 0 {
                        info!(run_number, duration_ms, escalated = report.escalated, exhausted = report.exhausted, "Sweep completed");
                    }
                }
                Some(SweeperEvent::SweepFailed { run_number, error }) => {
                    warn!(run_number, %error, "Sweep failed");
                }
                Some(SweeperEvent::Stopped { .. }) | None => break,
                Some(_) => {}
            }
        }
    }

    // Let the loop observe the stop flag and release the controller.
    while let Some(event) = events.recv().await {
        if matches!(event, SweeperEvent::Stopped { .. }) {
            break;
        }
    }

    let status = handle.status().await;
    let stats = ctx.shutdown().await;
    output(
        &DaemonOutput {
            total_runs: status.total_runs,
            successful_runs: status.successful_runs,
            failed_runs: status.failed_runs,
            total_escalated: status.total_escalated,
            total_exhausted: status.total_exhausted,
            notifications_delivered: stats.delivered,
            notifications_failed: stats.failed,
        },
        json_mode,
    );
    Ok(())
}
