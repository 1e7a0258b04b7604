//! Implementation of the `cascata metrics` command.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use comfy_table::{presets, Cell, ContentArrangement, Table};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{Config, DateRange, MetricsReport};
use crate::domain::ports::Clock;

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Window ending now, in days
    #[arg(short, long, default_value = "7", conflicts_with_all = ["from", "to"])]
    pub days: i64,

    /// Start date (YYYY-MM-DD or RFC 3339), inclusive
    #[arg(long, requires = "to", value_parser = parse_instant)]
    pub from: Option<DateTime<Utc>>,

    /// End date (YYYY-MM-DD or RFC 3339), exclusive
    #[arg(long, requires = "from", value_parser = parse_instant)]
    pub to: Option<DateTime<Utc>>,
}

impl MetricsArgs {
    fn range(&self, now: DateTime<Utc>) -> DateRange {
        match (self.from, self.to) {
            (Some(from), Some(to)) => DateRange::new(from, to),
            _ => DateRange::last_days(now, self.days),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct MetricsOutput {
    #[serde(flatten)]
    pub report: MetricsReport,
    pub first_tier_resolution_rate: f64,
}

impl CommandOutput for MetricsOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = vec![
            format!(
                "Window: {} .. {}",
                r.range.from.format("%Y-%m-%d %H:%M"),
                r.range.to.format("%Y-%m-%d %H:%M")
            ),
            format!("Finalized assignments: {}", r.total_finalized),
            format!(
                "Resolved at tier 1: {}  after escalation: {}  ({:.0}% first tier)",
                r.first_tier_resolutions,
                r.escalated_resolutions,
                self.first_tier_resolution_rate * 100.0
            ),
            format!(
                "Escalated assignments: {}  deepest tier: {}  cascades without service: {}",
                r.escalated_entries, r.max_sequencia, r.exhausted_cascades
            ),
        ];

        if !r.by_motivo.is_empty() {
            let mut table = Table::new();
            table
                .load_preset(presets::UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["Motivo", "Count", "Mean", "Median"]);
            for stats in &r.by_motivo {
                table.add_row(vec![
                    Cell::new(stats.motivo.as_str()),
                    Cell::new(stats.count),
                    Cell::new(minutes(stats.mean_secs)),
                    Cell::new(minutes(stats.median_secs)),
                ]);
            }
            lines.push(table.to_string());
        }

        if !r.per_agent.is_empty() {
            lines.push("Resolutions per agent:".to_string());
            for agent in &r.per_agent {
                lines.push(format!("  {:<20} {}", agent.user_id, agent.resolved));
            }
        }

        lines.join("\n")
    }
}

pub async fn execute(args: MetricsArgs, config: &Config, json_mode: bool) -> Result<()> {
    if args.days <= 0 {
        return Err(DomainError::ValidationFailed("--days must be positive".to_string()).into());
    }
    let ctx = AppContext::open(config).await?;
    let range = args.range(ctx.controller.clock().now());
    let result = ctx.metrics.metrics_for(range).await;
    ctx.shutdown().await;

    let report = result?;
    let first_tier_resolution_rate = report.first_tier_resolution_rate();
    output(
        &MetricsOutput {
            report,
            first_tier_resolution_rate,
        },
        json_mode,
    );
    Ok(())
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got '{s}'"))
}

fn minutes(secs: f64) -> String {
    format!("{:.1} min", secs / 60.0)
}
