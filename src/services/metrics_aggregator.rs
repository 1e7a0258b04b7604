//! Read-side rollups over finalized cascade entries.
//!
//! Nothing here writes: every figure is derived from the store on demand.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentResolutions, CascadeEntry, DateRange, MetricsReport, Motivo, MotivoStats,
};
use crate::domain::ports::CascadeRepository;

pub struct MetricsAggregator<C: CascadeRepository> {
    cascades: Arc<C>,
}

impl<C: CascadeRepository> MetricsAggregator<C> {
    pub fn new(cascades: Arc<C>) -> Self {
        Self { cascades }
    }

    /// Rollup of every entry finalized within `range`.
    pub async fn metrics_for(&self, range: DateRange) -> DomainResult<MetricsReport> {
        if range.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "empty date range: {} is not before {}",
                range.from, range.to
            )));
        }

        let entries = self.cascades.finalized_between(range).await?;
        let exhausted = self.cascades.count_exhausted_between(range).await?;
        Ok(aggregate(range, &entries, exhausted))
    }
}

/// Build a report from finalized entries.
///
/// Entries without a motivo or outside `range` are ignored.
pub fn aggregate(range: DateRange, entries: &[CascadeEntry], exhausted_cascades: u64) -> MetricsReport {
    let mut durations: BTreeMap<Motivo, Vec<f64>> = BTreeMap::new();
    let mut per_agent: HashMap<&str, u64> = HashMap::new();
    let mut report = MetricsReport {
        range,
        total_finalized: 0,
        by_motivo: Vec::new(),
        escalated_entries: 0,
        first_tier_resolutions: 0,
        escalated_resolutions: 0,
        max_sequencia: 0,
        per_agent: Vec::new(),
        exhausted_cascades,
    };

    for entry in entries {
        let (Some(motivo), Some(done)) = (entry.motivo, entry.finalizado_em) else {
            continue;
        };
        if !range.contains(done) {
            continue;
        }

        report.total_finalized += 1;
        report.max_sequencia = report.max_sequencia.max(entry.sequencia);
        if entry.sequencia > 1 {
            report.escalated_entries += 1;
        }
        if motivo == Motivo::Resolvido {
            if entry.sequencia == 1 {
                report.first_tier_resolutions += 1;
            } else {
                report.escalated_resolutions += 1;
            }
            *per_agent.entry(entry.user_id.as_str()).or_default() += 1;
        }
        if let Some(secs) = entry.time_to_finalize_secs() {
            durations.entry(motivo).or_default().push(secs);
        }
    }

    report.by_motivo = durations
        .into_iter()
        .map(|(motivo, mut secs)| MotivoStats {
            motivo,
            count: secs.len() as u64,
            mean_secs: mean(&secs),
            median_secs: median(&mut secs),
        })
        .collect();

    let mut agents: Vec<AgentResolutions> = per_agent
        .into_iter()
        .map(|(user_id, resolved)| AgentResolutions {
            user_id: user_id.to_string(),
            resolved,
        })
        .collect();
    agents.sort_by(|a, b| b.resolved.cmp(&a.resolved).then_with(|| a.user_id.cmp(&b.user_id)));
    report.per_agent = agents;

    report
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Cascade, CascadeStatus};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn finalized(user: &str, tier: u32, motivo: Motivo, after_secs: i64) -> CascadeEntry {
        let start = Utc::now() - Duration::hours(1);
        let cascade = Cascade::new(Uuid::new_v4(), Uuid::new_v4(), start);
        let mut entry = CascadeEntry::new(&cascade, user, tier, 1.0, start).unwrap();
        entry.status = CascadeStatus::Finalizado;
        entry.finalizado_em = Some(start + Duration::seconds(after_secs));
        entry.motivo = Some(motivo);
        entry
    }

    fn range() -> DateRange {
        DateRange::last_days(Utc::now() + Duration::minutes(1), 1)
    }

    #[test]
    fn test_aggregate_counts_tiers_and_agents() {
        let entries = vec![
            finalized("ana", 1, Motivo::Resolvido, 60),
            finalized("bruno", 1, Motivo::Duplicado, 60),
            finalized("ana", 1, Motivo::Resolvido, 180),
            finalized("carla", 1, Motivo::Expirado, 3600),
            finalized("gil", 2, Motivo::Resolvido, 120),
        ];

        let report = aggregate(range(), &entries, 2);
        assert_eq!(report.total_finalized, 5);
        assert_eq!(report.escalated_entries, 1);
        assert_eq!(report.first_tier_resolutions, 2);
        assert_eq!(report.escalated_resolutions, 1);
        assert_eq!(report.max_sequencia, 2);
        assert_eq!(report.exhausted_cascades, 2);

        let resolved = report.stats_for(Motivo::Resolvido).unwrap();
        assert_eq!(resolved.count, 3);
        assert!((resolved.mean_secs - 120.0).abs() < 1e-9);
        assert!((resolved.median_secs - 120.0).abs() < 1e-9);

        assert_eq!(report.per_agent[0].user_id, "ana");
        assert_eq!(report.per_agent[0].resolved, 2);
        assert_eq!(report.per_agent[1].user_id, "gil");
    }

    #[test]
    fn test_entries_outside_range_are_ignored() {
        let mut old = finalized("ana", 1, Motivo::Resolvido, 60);
        old.finalizado_em = Some(Utc::now() - Duration::days(10));
        let report = aggregate(range(), &[old], 0);
        assert_eq!(report.total_finalized, 0);
        assert!(report.by_motivo.is_empty());
        assert_eq!(report.first_tier_resolution_rate(), 0.0);
    }

    #[test]
    fn test_median_of_even_count() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    proptest! {
        #[test]
        fn prop_mean_and_median_within_bounds(values in prop::collection::vec(0.0f64..1.0e6, 1..64)) {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let m = mean(&values);
            let mut sorted = values.clone();
            let med = median(&mut sorted);
            prop_assert!(m >= min - 1e-6 && m <= max + 1e-6);
            prop_assert!(med >= min && med <= max);
        }

        #[test]
        fn prop_median_ignores_input_order(mut values in prop::collection::vec(0.0f64..1.0e6, 1..64)) {
            let mut reversed: Vec<f64> = values.iter().rev().cloned().collect();
            prop_assert_eq!(median(&mut values), median(&mut reversed));
        }
    }
}
