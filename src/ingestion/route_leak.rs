use crate::config::TIER1_ASNS;
use crate::models::ThreatEvent;
use crate::store::cache::CacheStore;
use crate::store::EventStore;
use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;

const CYCLE_INTERVAL: Duration = Duration::from_secs(300);
const MAX_LEAK_CIDR: u8 = 10;

/// Flags non-Tier-1 ASNs announcing prefixes shorter than `/10`, the
/// "small ASN, huge block" route-leak heuristic from
/// `detect_route_leaks` in the original ingestor.
pub async fn run(events: EventStore, cache: CacheStore) {
    loop {
        if let Err(e) = run_once(&events, &cache).await {
            log::error!("[Guard] cycle failed: {}", e);
        }
        sleep(CYCLE_INTERVAL).await;
    }
}

async fn run_once(events: &EventStore, cache: &CacheStore) -> Result<(), String> {
    let announcements = events.recent_announcements().await.map_err(|e| e.to_string())?;

    let mut leaks_found = 0u32;
    for (asn, prefix) in announcements {
        let Some(cidr_str) = prefix.split('/').nth(1) else { continue };
        let Ok(cidr) = cidr_str.parse::<u8>() else { continue };

        if cidr <= MAX_LEAK_CIDR && !TIER1_ASNS.contains(&asn) {
            let description = format!("Route Leak Risk: Non-Tier1 ASN {} announced huge block {}.", asn, prefix);
            log::warn!("[Guard] {}", description);

            let event = ThreatEvent {
                timestamp: Utc::now(),
                asn,
                source: "Route Leak Guard".to_string(),
                category: "route_leak".to_string(),
                target_ip: prefix.clone(),
                description,
            };
            if let Err(e) = events.insert_threat_event(&event).await {
                log::error!("[Guard] failed to log threat event: {}", e);
            }
            if let Err(e) = cache.enqueue_scoring_job(asn as i64).await {
                log::error!("[Guard] failed to enqueue rescore: {}", e);
            }
            leaks_found += 1;
        }
    }

    if leaks_found > 0 {
        log::info!("[Guard] cycle complete, flagged {} leaks", leaks_found);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn tier1_asns_are_exempt() {
        assert!(crate::config::TIER1_ASNS.contains(&3356));
        assert!(!crate::config::TIER1_ASNS.contains(&64512));
    }
}
