//! CLI type definitions
//!
//! Top-level clap structures. Each subcommand's arguments live next to its
//! implementation under `commands`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    agent::AgentArgs, cascade::CascadeArgs, init::InitArgs, lead::LeadArgs,
    metrics::MetricsArgs, sweep::SweepArgs,
};

#[derive(Parser, Debug)]
#[command(name = "cascata")]
#[command(about = "Cascata - Lead SLA cascade engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra configuration file, applied after .cascata/config.yaml
    #[arg(short, long, global = true, env = "CASCATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize cascata configuration and database
    Init(InitArgs),

    /// Inbound leads and their clientes
    Lead(LeadArgs),

    /// Agent roster management
    Agent(AgentArgs),

    /// Inspect and drive cascades
    Cascade(CascadeArgs),

    /// Run the expiry sweeper
    Sweep(SweepArgs),

    /// Response-time metrics over finalized assignments
    Metrics(MetricsArgs),
}
