//! Implementation of the `cascata agent` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::{Agent, Config};

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// Add or update an agent
    Add {
        /// Stable agent id, used as user_id on assignments
        id: String,
        /// Display name (defaults to the id)
        #[arg(short, long)]
        nome: Option<String>,
        /// Department the agent serves, matched against tier config
        #[arg(short, long)]
        department: String,
        /// Working hours in UTC, e.g. 8-18 or 22-6
        #[arg(short, long, value_parser = parse_shift)]
        shift: Option<(u32, u32)>,
        /// Register the agent as off duty
        #[arg(long)]
        off_duty: bool,
    },
    /// List agents
    List {
        #[arg(short, long)]
        department: Option<String>,
    },
    /// Put an agent on or off duty
    Duty { id: String, state: DutyState },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DutyState {
    On,
    Off,
}

#[derive(Debug, serde::Serialize)]
pub struct AgentOutput {
    pub agent: Agent,
    pub message: String,
}

impl CommandOutput for AgentOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<Agent>,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }
        let table = TableFormatter::new(chrono::Utc::now()).format_agents(&self.agents);
        format!("{table}\n{} agent(s)", self.total)
    }
}

pub async fn execute(args: AgentArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let result = run(&ctx, args.command, json_mode).await;
    ctx.shutdown().await;
    result
}

async fn run(ctx: &AppContext, command: AgentCommands, json_mode: bool) -> Result<()> {
    match command {
        AgentCommands::Add {
            id,
            nome,
            department,
            shift,
            off_duty,
        } => {
            let nome = nome.unwrap_or_else(|| id.clone());
            let mut agent = Agent::new(id, nome, department);
            if let Some((start, end)) = shift {
                agent = agent.with_shift(start, end);
            }
            agent.on_duty = !off_duty;
            ctx.agents.upsert_agent(&agent).await?;
            let message = format!("Agent {} saved in {}", agent.id, agent.department);
            output(&AgentOutput { agent, message }, json_mode);
        }
        AgentCommands::List { department } => {
            let agents = ctx.agents.list_agents(department.as_deref()).await?;
            let total = agents.len();
            output(&AgentListOutput { agents, total }, json_mode);
        }
        AgentCommands::Duty { id, state } => {
            ctx.agents.set_on_duty(&id, state == DutyState::On).await?;
            let agent = ctx
                .agents
                .get_agent(&id)
                .await?
                .with_context(|| format!("Agent {id} disappeared"))?;
            let message = format!(
                "Agent {} is now {}",
                agent.id,
                if agent.on_duty { "on duty" } else { "off duty" }
            );
            output(&AgentOutput { agent, message }, json_mode);
        }
    }
    Ok(())
}

fn parse_shift(s: &str) -> Result<(u32, u32), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END hours, got '{s}'"))?;
    let parse = |h: &str| -> Result<u32, String> {
        let hour: u32 = h.trim().parse().map_err(|_| format!("invalid hour '{h}'"))?;
        if hour > 23 {
            return Err(format!("hour {hour} is out of range 0-23"));
        }
        Ok(hour)
    };
    Ok((parse(start)?, parse(end)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shift() {
        assert_eq!(parse_shift("8-18"), Ok((8, 18)));
        assert_eq!(parse_shift("22-6"), Ok((22, 6)));
        assert!(parse_shift("8").is_err());
        assert!(parse_shift("8-24").is_err());
        assert!(parse_shift("a-b").is_err());
    }
}
