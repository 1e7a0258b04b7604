//! Cascata CLI entry point.

use clap::Parser;

use cascata::cli::{commands, handle_error, Cli, Commands};
use cascata::infrastructure::config::ConfigLoader;
use cascata::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_with_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let log_config = LogConfig::from(&config.logging).verbose(cli.verbose);
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        Commands::Lead(args) => commands::lead::execute(args, &config, cli.json).await,
        Commands::Agent(args) => commands::agent::execute(args, &config, cli.json).await,
        Commands::Cascade(args) => commands::cascade::execute(args, &config, cli.json).await,
        Commands::Sweep(args) => commands::sweep::execute(args, &config, cli.json).await,
        Commands::Metrics(args) => commands::metrics::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
