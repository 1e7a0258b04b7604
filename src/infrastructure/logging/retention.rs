//! Cleanup of rolled log files past their retention window.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::logger::LOG_FILE_PREFIX;

/// Delete rolled log files in `log_dir` last modified before the window.
///
/// Only files named after the logger's prefix are touched. Returns the number
/// of files removed; a missing directory removes nothing.
pub async fn prune_old_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut removed = 0;

    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .with_context(|| format!("failed to read log directory {}", log_dir.display()))?;

    while let Some(entry) = entries.next_entry().await.context("failed to read directory entry")? {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let modified: DateTime<Utc> = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .context("failed to read log file modification time")?
            .into();

        if modified < cutoff {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("failed to delete {}", path.display()))?;
            debug!(path = %path.display(), "deleted expired log file");
            removed += 1;
        }
    }

    if removed > 0 {
        info!(count = removed, "pruned old log files");
    }
    Ok(removed)
}
