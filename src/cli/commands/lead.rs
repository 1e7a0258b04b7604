//! Implementation of the `cascata lead` commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::errors::DomainError;
use crate::domain::models::{Cliente, ClienteStatus, Config};
use crate::domain::ports::ClienteRepository;
use crate::services::{BusinessEvent, CascadeHistory, StartOutcome, TriggerOutcome};

#[derive(Args, Debug)]
pub struct LeadArgs {
    #[command(subcommand)]
    pub command: LeadCommands,
}

#[derive(Subcommand, Debug)]
pub enum LeadCommands {
    /// Register an inbound lead and start its cascade
    Add {
        /// Contact name
        nome: String,
        #[arg(short, long)]
        telefone: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        /// Channel the lead came from
        #[arg(short, long, default_value = "manual")]
        source: String,
    },
    /// List clientes, optionally by status
    List {
        /// Novo, Aguardando Atendimento, Atendido, Sem Atendimento or Cancelado
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show a cliente with its full cascade history
    Show { cliente_id: Uuid },
}

#[derive(Debug, serde::Serialize)]
pub struct LeadAddOutput {
    pub lead_id: Uuid,
    pub cliente_id: Uuid,
    pub start: StartOutcome,
}

impl CommandOutput for LeadAddOutput {
    fn to_human(&self) -> String {
        let head = format!("Lead {} registered for cliente {}", self.lead_id, self.cliente_id);
        let detail = match &self.start {
            StartOutcome::Started { entries, .. } => {
                let agents: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
                format!("Tier 1 assigned to: {}", agents.join(", "))
            }
            StartOutcome::AlreadyActive { cascade_id } => {
                format!("Cliente already has open cascade {cascade_id}")
            }
            StartOutcome::Exhausted { .. } => {
                "No agent available for tier 1; cliente marked Sem Atendimento".to_string()
            }
        };
        format!("{head}\n{detail}")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ClienteListOutput {
    pub clientes: Vec<Cliente>,
    pub total: usize,
}

impl CommandOutput for ClienteListOutput {
    fn to_human(&self) -> String {
        if self.clientes.is_empty() {
            return "No clientes found.".to_string();
        }
        let table = TableFormatter::new(chrono::Utc::now()).format_clientes(&self.clientes);
        format!("{table}\n{} cliente(s)", self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ClienteShowOutput {
    pub cliente: Cliente,
    pub history: CascadeHistory,
}

impl CommandOutput for ClienteShowOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Cliente: {}", self.cliente.id),
            format!("Nome:    {}", self.cliente.nome),
            format!("Status:  {}", self.cliente.status),
        ];
        if let Some(telefone) = &self.cliente.telefone {
            lines.push(format!("Fone:    {telefone}"));
        }
        for cascade in &self.history.cascades {
            let state = match (cascade.desfecho, &cascade.resolvido_por) {
                (Some(desfecho), Some(user)) => format!("{} by {user}", desfecho.as_str()),
                (Some(desfecho), None) => desfecho.as_str().to_string(),
                (None, _) => format!("open at tier {}", cascade.sequencia_atual),
            };
            lines.push(format!(
                "Cascade {} opened {}: {state}",
                cascade.id,
                cascade.aberta_em.format("%Y-%m-%d %H:%M")
            ));
        }
        if !self.history.entries.is_empty() {
            lines.push(TableFormatter::new(chrono::Utc::now()).format_entries(&self.history.entries));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: LeadArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let result = run(&ctx, args.command, json_mode).await;
    ctx.shutdown().await;
    result
}

async fn run(ctx: &AppContext, command: LeadCommands, json_mode: bool) -> Result<()> {
    match command {
        LeadCommands::Add {
            nome,
            telefone,
            email,
            source,
        } => {
            let event = BusinessEvent::LeadReceived {
                nome,
                telefone,
                email,
                source,
            };
            let TriggerOutcome::LeadStarted {
                lead_id,
                cliente_id,
                start,
            } = ctx.triggers.handle(event).await?
            else {
                bail!("lead event produced no cascade");
            };
            output(
                &LeadAddOutput {
                    lead_id,
                    cliente_id,
                    start,
                },
                json_mode,
            );
        }
        LeadCommands::List { status } => {
            let status = status
                .map(|s| {
                    ClienteStatus::from_str(&s)
                        .ok_or_else(|| anyhow::anyhow!("Unknown cliente status: {s}"))
                })
                .transpose()?;
            let clientes = ctx.clientes.list_clientes(status).await?;
            let total = clientes.len();
            output(&ClienteListOutput { clientes, total }, json_mode);
        }
        LeadCommands::Show { cliente_id } => {
            let cliente = ctx
                .clientes
                .get_cliente(cliente_id)
                .await?
                .ok_or(DomainError::ClienteNotFound(cliente_id))?;
            let history = ctx.controller.cascade_history(cliente_id).await?;
            output(&ClienteShowOutput { cliente, history }, json_mode);
        }
    }
    Ok(())
}
