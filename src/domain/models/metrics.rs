//! Read-side rollups over the cascade store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cascade::Motivo;

/// Half-open time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The `days` days ending at `to`.
    pub fn last_days(to: DateTime<Utc>, days: i64) -> Self {
        Self {
            from: to - chrono::Duration::days(days),
            to,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Time-to-finalize statistics for one reason code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivoStats {
    pub motivo: Motivo,
    pub count: u64,
    pub mean_secs: f64,
    pub median_secs: f64,
}

/// Resolutions credited to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResolutions {
    pub user_id: String,
    pub resolved: u64,
}

/// Aggregated view of the cascade store for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub range: DateRange,
    /// Finalized entries considered.
    pub total_finalized: u64,
    /// Sorted by motivo.
    pub by_motivo: Vec<MotivoStats>,
    /// Entries that belonged to a tier above the first.
    pub escalated_entries: u64,
    /// `Resolvido` entries at tier 1.
    pub first_tier_resolutions: u64,
    /// `Resolvido` entries at tier 2 or above.
    pub escalated_resolutions: u64,
    /// Highest tier reached by any finalized entry.
    pub max_sequencia: u32,
    /// Sorted by resolved count descending, then user id.
    pub per_agent: Vec<AgentResolutions>,
    /// Cascades closed as `SemAtendimento` in the range.
    pub exhausted_cascades: u64,
}

impl MetricsReport {
    pub fn stats_for(&self, motivo: Motivo) -> Option<&MotivoStats> {
        self.by_motivo.iter().find(|s| s.motivo == motivo)
    }

    /// Share of resolutions that happened at tier 1, 0.0 when none.
    pub fn first_tier_resolution_rate(&self) -> f64 {
        let total = self.first_tier_resolutions + self.escalated_resolutions;
        if total == 0 {
            0.0
        } else {
            self.first_tier_resolutions as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_date_range_is_half_open() {
        let to = Utc::now();
        let range = DateRange::last_days(to, 7);
        assert!(range.contains(to - Duration::days(7)));
        assert!(range.contains(to - Duration::seconds(1)));
        assert!(!range.contains(to));
        assert!(!range.is_empty());
        assert!(DateRange::new(to, to).is_empty());
    }
}
