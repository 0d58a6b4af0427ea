use crate::scoring::ScoringEngine;
use crate::store::CacheStore;
use std::sync::Arc;

/// Drains the Redis scoring queue forever, invoking the scoring engine
/// for each ASN. Ingestion tasks only ever enqueue; this is the one
/// place scoring actually runs, keeping ingestion latency independent
/// of scoring cost.
pub async fn run(cache: CacheStore, engine: Arc<ScoringEngine>) {
    loop {
        match cache.dequeue_scoring_job(5.0).await {
            Ok(Some(asn)) => {
                if let Err(e) = engine.score_asn(asn).await {
                    log::error!("[Jobs] scoring ASN {} failed: {}", asn, e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("[Jobs] queue poll failed: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}
