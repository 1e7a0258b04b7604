//! Implementation of the `cascata cascade` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::errors::DomainError;
use crate::domain::models::{CascadeEntry, Config, Motivo};
use crate::services::{AdvanceOutcome, BusinessEvent, FinalizeOutcome, TriggerOutcome};

#[derive(Args, Debug)]
pub struct CascadeArgs {
    #[command(subcommand)]
    pub command: CascadeCommands,
}

#[derive(Subcommand, Debug)]
pub enum CascadeCommands {
    /// Live assignments of one agent
    Queue { user_id: String },
    /// Live assignments across all clientes, or one
    Snapshot {
        #[arg(long)]
        cliente: Option<Uuid>,
    },
    /// Tiers past their deadline that the sweeper has yet to advance
    Overdue {
        #[arg(short, long, default_value = "100")]
        limit: u32,
    },
    /// Record that an agent booked an appointment with the cliente
    Resolve {
        cliente_id: Uuid,
        #[arg(short, long)]
        user: String,
    },
    /// Record that an agent converted a lead
    Convert {
        lead_id: Uuid,
        #[arg(short, long)]
        user: String,
    },
    /// Cancel the cliente's open cascade by hand
    Cancel {
        cliente_id: Uuid,
        #[arg(short, long)]
        user: String,
    },
    /// Finalize the open cascade with an explicit motivo
    Finalize {
        cliente_id: Uuid,
        #[arg(short, long)]
        user: String,
        /// Resolvido, Duplicado or Cancelado
        #[arg(short, long, value_parser = parse_motivo)]
        motivo: Motivo,
    },
    /// Expire a tier now instead of waiting for the sweeper
    Advance {
        cliente_id: Uuid,
        #[arg(short, long)]
        tier: u32,
    },
    /// Feed a business event as JSON; '-' reads it from stdin
    Event { json: String },
}

#[derive(Debug, serde::Serialize)]
pub struct EntriesOutput {
    pub entries: Vec<CascadeEntry>,
    pub total: usize,
}

impl CommandOutput for EntriesOutput {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No live assignments.".to_string();
        }
        let table = TableFormatter::new(chrono::Utc::now()).format_entries(&self.entries);
        format!("{table}\n{} assignment(s)", self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct OverdueOutput {
    pub overdue: Vec<OverdueRow>,
}

#[derive(Debug, serde::Serialize)]
pub struct OverdueRow {
    pub cliente_id: Uuid,
    pub sequencia: u32,
}

impl CommandOutput for OverdueOutput {
    fn to_human(&self) -> String {
        if self.overdue.is_empty() {
            return "Nothing overdue.".to_string();
        }
        self.overdue
            .iter()
            .map(|row| format!("{}  tier {}", row.cliente_id, row.sequencia))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct FinalizeOutput {
    pub cliente_id: Uuid,
    pub motivo: Motivo,
    #[serde(flatten)]
    pub outcome: FinalizeOutcome,
}

impl CommandOutput for FinalizeOutput {
    fn to_human(&self) -> String {
        if !self.outcome.applied {
            return format!("Cliente {} had no open cascade; nothing changed.", self.cliente_id);
        }
        let mut line = format!("Cliente {} finalized as {}", self.cliente_id, self.motivo.as_str());
        if self.outcome.duplicates > 0 {
            line.push_str(&format!(
                " ({} sibling assignment(s) marked Duplicado)",
                self.outcome.duplicates
            ));
        }
        line
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AdvanceOutput {
    pub cliente_id: Uuid,
    pub expired_tier: u32,
    pub outcome: AdvanceOutcome,
}

impl CommandOutput for AdvanceOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            AdvanceOutcome::Escalated { tier, entries } => {
                let agents: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
                format!("Escalated to tier {tier}: {}", agents.join(", "))
            }
            AdvanceOutcome::Exhausted => {
                "No candidates left; cliente marked Sem Atendimento".to_string()
            }
            AdvanceOutcome::NoOp => format!(
                "Tier {} is not the live tier of cliente {}; nothing changed.",
                self.expired_tier, self.cliente_id
            ),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EventOutput {
    pub event: &'static str,
    pub outcome: TriggerOutcome,
}

impl CommandOutput for EventOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            TriggerOutcome::LeadStarted {
                cliente_id, start, ..
            } => format!(
                "{}: cascade {} for cliente {cliente_id}",
                self.event,
                start.cascade_id()
            ),
            TriggerOutcome::Finalized {
                cliente_id,
                finalize,
            } => format!(
                "{}: cliente {cliente_id} {}",
                self.event,
                if finalize.applied { "finalized" } else { "unchanged" }
            ),
        }
    }
}

pub async fn execute(args: CascadeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let result = run(&ctx, args.command, json_mode).await;
    ctx.shutdown().await;
    result
}

async fn run(ctx: &AppContext, command: CascadeCommands, json_mode: bool) -> Result<()> {
    match command {
        CascadeCommands::Queue { user_id } => {
            let entries = ctx.controller.active_assignments_for(&user_id).await?;
            let total = entries.len();
            output(&EntriesOutput { entries, total }, json_mode);
        }
        CascadeCommands::Snapshot { cliente } => {
            let entries = ctx.controller.cascade_snapshot(cliente).await?;
            let total = entries.len();
            output(&EntriesOutput { entries, total }, json_mode);
        }
        CascadeCommands::Overdue { limit } => {
            let overdue = ctx
                .controller
                .overdue_tiers(limit)
                .await?
                .into_iter()
                .map(|tier| OverdueRow {
                    cliente_id: tier.cliente_id,
                    sequencia: tier.sequencia,
                })
                .collect();
            output(&OverdueOutput { overdue }, json_mode);
        }
        CascadeCommands::Resolve { cliente_id, user } => {
            let event = BusinessEvent::AppointmentCreated {
                cliente_id,
                user_id: user,
            };
            handle_event(ctx, event, json_mode).await?;
        }
        CascadeCommands::Convert { lead_id, user } => {
            let event = BusinessEvent::LeadConverted {
                lead_id,
                user_id: user,
            };
            handle_event(ctx, event, json_mode).await?;
        }
        CascadeCommands::Cancel { cliente_id, user } => {
            let event = BusinessEvent::ManualCancel {
                cliente_id,
                user_id: user,
            };
            handle_event(ctx, event, json_mode).await?;
        }
        CascadeCommands::Finalize {
            cliente_id,
            user,
            motivo,
        } => {
            let outcome = ctx
                .controller
                .finalize_duplicates(cliente_id, &user, motivo)
                .await?;
            output(
                &FinalizeOutput {
                    cliente_id,
                    motivo,
                    outcome,
                },
                json_mode,
            );
        }
        CascadeCommands::Advance { cliente_id, tier } => {
            let outcome = ctx.controller.advance_on_expiry(cliente_id, tier).await?;
            output(
                &AdvanceOutput {
                    cliente_id,
                    expired_tier: tier,
                    outcome,
                },
                json_mode,
            );
        }
        CascadeCommands::Event { json } => {
            let raw = if json == "-" {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .context("Failed to read event from stdin")?;
                buf
            } else {
                json
            };
            let event: BusinessEvent = serde_json::from_str(&raw)
                .map_err(|e| DomainError::ValidationFailed(format!("invalid event JSON: {e}")))?;
            handle_event(ctx, event, json_mode).await?;
        }
    }
    Ok(())
}

async fn handle_event(ctx: &AppContext, event: BusinessEvent, json_mode: bool) -> Result<()> {
    let kind = event.kind();
    let outcome = ctx.triggers.handle(event).await?;
    output(&EventOutput { event: kind, outcome }, json_mode);
    Ok(())
}

fn parse_motivo(s: &str) -> Result<Motivo, String> {
    let motivo = Motivo::from_str(s).ok_or_else(|| format!("unknown motivo '{s}'"))?;
    if motivo.is_caller_supplied() {
        Ok(motivo)
    } else {
        Err(format!("{} is set by the engine, not by callers", motivo.as_str()))
    }
}
