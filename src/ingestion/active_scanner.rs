use crate::store::cache::CacheStore;
use crate::store::EventStore;
use std::time::Duration;
use tokio::time::sleep;

const CYCLE_INTERVAL: Duration = Duration::from_secs(10);

/// Queues any ASN with more than 5 BGP events in the last minute for
/// rescoring, so the registry stays populated with active networks and
/// not only ones that triggered a threat match. Grounded on
/// `scan_noisy_neighbors` in the original ingestor.
pub async fn run(events: EventStore, cache: CacheStore) {
    loop {
        if let Err(e) = run_once(&events, &cache).await {
            log::error!("[Scanner] cycle failed: {}", e);
        }
        sleep(CYCLE_INTERVAL).await;
    }
}

async fn run_once(events: &EventStore, cache: &CacheStore) -> Result<(), String> {
    let asns = events.high_activity_asns().await.map_err(|e| e.to_string())?;

    if !asns.is_empty() {
        log::info!("[Scanner] found {} active ASNs, queuing for risk analysis", asns.len());
        for asn in asns {
            if let Err(e) = cache.enqueue_scoring_job(asn as i64).await {
                log::error!("[Scanner] failed to enqueue {}: {}", asn, e);
            }
        }
    }
    Ok(())
}
