//! Implementation of the `cascata init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::{initialize_database, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Directory holding configuration, database and logs.
pub const STATE_DIR: &str = ".cascata";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: String,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!(
                "\nWrote {}",
                self.initialized_path.join(STATE_DIR).join("config.yaml").display()
            ));
        }
        lines.push(format!("Database ready at {}", self.database_path));
        lines.join("\n")
    }
}

/// `config` is the already-loaded configuration; its tiers and database path
/// are what gets written out.
pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let state_dir = target_path.join(STATE_DIR);
    fs::create_dir_all(&state_dir)
        .await
        .with_context(|| format!("Failed to create {}", state_dir.display()))?;

    let config_path = state_dir.join("config.yaml");
    let config_written = if config_path.exists() && !args.force {
        false
    } else {
        let yaml = serde_yaml::to_string(config).context("Failed to render configuration")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        true
    };

    let mut database = config.database.clone();
    if !database.path.starts_with("sqlite:") && PathBuf::from(&database.path).is_relative() {
        database.path = target_path.join(&database.path).display().to_string();
    }
    let pool = initialize_database(&database.url(), Some(PoolConfig::from(&database)))
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    let message = if config_written {
        "Cascata initialized.".to_string()
    } else {
        "Config already present, kept it. Use --force to overwrite.".to_string()
    };

    let output_data = InitOutput {
        success: true,
        message,
        initialized_path: target_path,
        config_written,
        database_path: database.path,
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_config_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            force: false,
            path: dir.path().to_path_buf(),
        };
        execute(args, &Config::default(), true).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join(".cascata/config.yaml")).unwrap();
        let parsed: Config = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed.tiers, Config::default().tiers);
        assert!(dir.path().join(".cascata/cascata.db").exists());
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".cascata")).unwrap();
        std::fs::write(dir.path().join(".cascata/config.yaml"), "tiers: []\n").unwrap();

        let args = InitArgs {
            force: false,
            path: dir.path().to_path_buf(),
        };
        execute(args, &Config::default(), true).await.unwrap();

        let kept = std::fs::read_to_string(dir.path().join(".cascata/config.yaml")).unwrap();
        assert_eq!(kept, "tiers: []\n");
    }
}
