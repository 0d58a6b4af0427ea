pub mod enrichment;
pub mod rules;

use crate::errors::AppError;
use crate::models::ScoreHistoryEntry;
use crate::store::{CacheStore, EventStore, RegistryStore};
use chrono::Utc;
use rules::TemporalMetrics;

/// Orchestrates one scoring run end to end: whitelist short-circuit,
/// signal fetch (with lazy clean-slate creation), metadata enrichment,
/// temporal metrics, rule application, persistence. Mirrors
/// `RiskScorer.calculate_score` step for step.
pub struct ScoringEngine {
    registry: RegistryStore,
    events: EventStore,
}

impl ScoringEngine {
    pub fn new(registry: RegistryStore, events: EventStore) -> Self {
        ScoringEngine { registry, events }
    }

    pub async fn score_asn(&self, asn: i64) -> Result<i32, AppError> {
        log::info!("[Scorer] starting analysis for ASN {}", asn);

        if self.registry.is_whitelisted(asn).await? {
            log::info!("[Scorer] ASN {} is whitelisted, skipping analysis", asn);
            self.registry.save_score(asn, 100, 0, 0, 0, "LOW").await?;
            return Ok(100);
        }

        let signals = self.registry.get_or_create_signals(asn).await?;
        enrichment::enrich(&self.registry, asn).await;

        let temporal = self.temporal_metrics(asn as u32).await?;
        let (score, breakdown, _details, risk_level) = rules::apply_scoring_rules(&signals, &temporal);

        self.registry
            .save_score(asn, score, breakdown.hygiene, breakdown.threat, breakdown.stability, &risk_level)
            .await?;

        let history = ScoreHistoryEntry { timestamp: Utc::now(), asn: asn as u32, score };
        if let Err(e) = self.events.insert_score_history(&history).await {
            log::warn!("[Scorer] history log failed for {}: {}", asn, e);
        }

        log::info!("[Scorer] ASN {} updated, score={} ({})", asn, score, risk_level);
        Ok(score)
    }

    async fn temporal_metrics(&self, asn: u32) -> Result<TemporalMetrics, AppError> {
        let upstream_churn_90d = self.events.upstream_churn_90d(asn).await?;
        let recent_withdrawals = self.events.recent_withdrawals_7d(asn).await?;
        let current_prefix_count = self.events.prefix_velocity_2d(asn).await?;
        let recent_threat_count = self.events.recent_threat_count_30d(asn).await?;

        let upstreams = self.events.top_upstreams_30d(asn, 3).await?;
        let avg_upstream_score = if upstreams.is_empty() {
            100.0
        } else {
            let upstream_asns: Vec<i64> = upstreams.iter().map(|(a, _)| *a as i64).collect();
            let rows = self.registry.scores_for_asns(&upstream_asns).await?;
            if rows.is_empty() {
                100.0
            } else {
                rows.iter().map(|r| r.total_score as f64).sum::<f64>() / rows.len() as f64
            }
        };

        let daily_counts = self.events.daily_event_counts_14d(asn).await?;
        let is_predictive_unstable = predictive_instability(&daily_counts);

        Ok(TemporalMetrics {
            upstream_churn_90d,
            recent_withdrawals,
            current_prefix_count,
            recent_threat_count,
            avg_upstream_score,
            is_predictive_unstable,
        })
    }
}

/// True when the 14-day mean daily event count exceeds 10 and the
/// coefficient of variation (stddev/mean) exceeds 1.5, the "Oracle"
/// heuristic from the original scorer.
fn predictive_instability(daily_counts: &[u64]) -> bool {
    if daily_counts.is_empty() {
        return false;
    }
    let n = daily_counts.len() as f64;
    let mean: f64 = daily_counts.iter().map(|&c| c as f64).sum::<f64>() / n;
    if mean <= 10.0 {
        return false;
    }
    let variance: f64 = daily_counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    (std_dev / mean) > 1.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_daily_counts_are_not_unstable() {
        assert!(!predictive_instability(&[20, 21, 19, 20, 22]));
    }

    #[test]
    fn low_volume_is_never_flagged_regardless_of_variance() {
        assert!(!predictive_instability(&[1, 50, 1, 1]));
    }

    #[test]
    fn high_volume_high_variance_is_unstable() {
        assert!(predictive_instability(&[5, 100, 5, 90, 5]));
    }
}
