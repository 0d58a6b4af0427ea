use crate::models::ThreatEvent;
use crate::radix::OverlapTrie;
use crate::store::cache::CacheStore;
use crate::store::EventStore;
use chrono::Utc;
use ipnet::IpNet;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;

const CYCLE_INTERVAL: Duration = Duration::from_secs(21_600);
const FEED_TIMEOUT: Duration = Duration::from_secs(15);

const SPAMHAUS_DROP_URL: &str = "https://www.spamhaus.org/drop/drop.txt";
const CINS_ARMY_URL: &str = "http://cinsscore.com/list/ci-badguys.txt";
const URLHAUS_URL: &str = "https://urlhaus.abuse.ch/downloads/text_online/";

/// Correlates third-party threat intel against the active BGP view every
/// 6 hours, emitting a threat event plus a rescoring job for each match.
/// Grounded on `fetch_threat_intelligence` in the original ingestor; the
/// O(n*m) overlap loop there is replaced with the radix trie.
pub async fn run(events: EventStore, cache: CacheStore) {
    loop {
        if let Err(e) = run_once(&events, &cache).await {
            log::error!("[Threat] cycle failed: {}", e);
        }
        sleep(CYCLE_INTERVAL).await;
    }
}

async fn run_once(events: &EventStore, cache: &CacheStore) -> Result<(), String> {
    let client = Client::builder()
        .timeout(FEED_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;

    let mut threat_prefixes: HashSet<String> = HashSet::new();
    let mut spamhaus_count = 0u32;

    log::info!("[Threat] downloading Spamhaus DROP...");
    match client.get(SPAMHAUS_DROP_URL).send().await {
        Ok(resp) if resp.status().is_success() => {
            if let Ok(text) = resp.text().await {
                for line in text.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(';') {
                        continue;
                    }
                    if let Some(prefix) = line.split(';').next() {
                        threat_prefixes.insert(prefix.trim().to_string());
                        spamhaus_count += 1;
                    }
                }
            }
        }
        Ok(resp) => log::warn!("[Threat] Spamhaus fetch returned {}", resp.status()),
        Err(e) => log::warn!("[Threat] Spamhaus fetch failed: {}", e),
    }

    log::info!("[Threat] downloading CINS Army...");
    let threat_ips_cins = fetch_cins_army(&client).await;
    log::info!("[Threat] downloading URLHaus...");
    let threat_ips_urlhaus = fetch_urlhaus(&client).await;
    let threat_ip_count = threat_ips_cins.len() + threat_ips_urlhaus.len();

    log::info!(
        "[Threat] stats: spamhaus={} cins={} urlhaus={}, total networks={}, total ips={}",
        spamhaus_count,
        threat_ips_cins.len(),
        threat_ips_urlhaus.len(),
        threat_prefixes.len(),
        threat_ip_count
    );

    let mut trie = OverlapTrie::new();
    for p in &threat_prefixes {
        if let Ok(net) = p.parse::<IpNet>() {
            trie.insert(&net);
        }
    }

    let active_routes = events.active_routes().await.map_err(|e| e.to_string())?;
    log::info!("[Threat] checking {} threats against {} active routes...", threat_prefixes.len(), active_routes.len());

    let mut found_threats = 0u32;
    for (i, (route_prefix, route_asn)) in active_routes.iter().enumerate() {
        let source_match = if threat_prefixes.contains(route_prefix) {
            Some("Spamhaus (Exact)")
        } else if let Ok(route_net) = route_prefix.parse::<IpNet>() {
            if trie.overlaps(&route_net) {
                Some("Spamhaus (Overlap)")
            } else {
                None
            }
        } else {
            None
        };

        if let Some(source) = source_match {
            let event = ThreatEvent {
                timestamp: Utc::now(),
                asn: *route_asn,
                source: source.to_string(),
                category: "botnet/malware".to_string(),
                target_ip: route_prefix.clone(),
                description: format!("{} detection on {}", source, route_prefix),
            };
            if let Err(e) = events.insert_threat_event(&event).await {
                log::error!("[Threat] failed to log threat event: {}", e);
            }
            if let Err(e) = cache.enqueue_scoring_job(*route_asn as i64).await {
                log::error!("[Threat] failed to enqueue rescore: {}", e);
            }
            found_threats += 1;
        }

        if i % 1000 == 0 {
            tokio::task::yield_now().await;
        }
    }

    log::info!("[Threat] analysis complete, flagged {} ASNs", found_threats);
    Ok(())
}

/// Extracts IPv4 addresses embedded in `http://host/...` URLs, used for
/// the URLHaus feed which distributes bare URLs rather than a host list.
pub fn extract_ipv4_from_urls(text: &str) -> Vec<String> {
    let re = Regex::new(r"http://(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").unwrap();
    re.captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

async fn fetch_cins_army(client: &Client) -> HashSet<String> {
    let mut ips = HashSet::new();
    if let Ok(resp) = client.get(CINS_ARMY_URL).send().await {
        if resp.status().is_success() {
            if let Ok(text) = resp.text().await {
                for line in text.lines() {
                    let ip = line.trim();
                    if !ip.is_empty() {
                        ips.insert(ip.to_string());
                    }
                }
            }
        }
    }
    ips
}

async fn fetch_urlhaus(client: &Client) -> HashSet<String> {
    let mut ips = HashSet::new();
    if let Ok(resp) = client.get(URLHAUS_URL).send().await {
        if resp.status().is_success() {
            if let Ok(text) = resp.text().await {
                for ip in extract_ipv4_from_urls(&text) {
                    ips.insert(ip);
                }
            }
        }
    }
    ips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ipv4_from_urlhaus_style_text() {
        let text = "http://203.0.113.7/payload.exe\nhttps://example.com/clean\nhttp://198.51.100.4/x";
        let ips = extract_ipv4_from_urls(text);
        assert_eq!(ips, vec!["203.0.113.7".to_string(), "198.51.100.4".to_string()]);
    }
}
