use crate::store::RegistryStore;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches public name/country metadata from RIPEstat and physical
/// presence from PeeringDB when the registry row is still unlabeled.
/// Fails silently on any network/parse error; enrichment must never
/// block a scoring run. Grounded on `_enrich_asn_metadata` in the
/// original scorer.
pub async fn enrich(registry: &RegistryStore, asn: i64) {
    if let Ok(true) = registry.needs_enrichment(asn).await {
        if let Some((name, country)) = fetch_ripestat(asn).await {
            log::info!("[Enrichment] updated ASN {}: {} ({})", asn, name, country);
            if let Err(e) = registry.update_metadata(asn, &name, &country).await {
                log::warn!("[Enrichment] failed to persist metadata for {}: {}", asn, e);
            }
        }
    }

    let has_pdb = fetch_peeringdb_presence(asn).await;
    if let Err(e) = registry.set_has_peeringdb_profile(asn, has_pdb).await {
        log::warn!("[Enrichment] failed to persist peeringdb signal for {}: {}", asn, e);
    }
}

async fn fetch_ripestat(asn: i64) -> Option<(String, String)> {
    let client = Client::builder().timeout(ENRICHMENT_TIMEOUT).build().ok()?;

    let overview_url = format!("https://stat.ripe.net/data/as-overview/data.json?resource={}", asn);
    let resp = client.get(&overview_url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let body: Value = resp.json().await.ok()?;
    let holder = body
        .get("data")
        .and_then(|d| d.get("holder"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    let geo_url = format!("https://stat.ripe.net/data/geoloc/data.json?resource={}", asn);
    let mut country_code = "XX".to_string();
    if let Ok(geo_resp) = client.get(&geo_url).send().await {
        if geo_resp.status().is_success() {
            if let Ok(geo_body) = geo_resp.json::<Value>().await {
                if let Some(loc) = geo_body
                    .get("data")
                    .and_then(|d| d.get("locations"))
                    .and_then(Value::as_array)
                    .and_then(|arr| arr.first())
                {
                    country_code = loc.get("country").and_then(Value::as_str).unwrap_or("XX").to_string();
                }
            }
        }
    }

    Some((holder, country_code))
}

async fn fetch_peeringdb_presence(asn: i64) -> bool {
    let Ok(client) = Client::builder().timeout(ENRICHMENT_TIMEOUT).build() else {
        return false;
    };
    let url = format!("https://www.peeringdb.com/api/net?asn={}", asn);
    let Ok(resp) = client.get(&url).send().await else {
        return false;
    };
    if !resp.status().is_success() {
        return false;
    }
    let Ok(body) = resp.json::<Value>().await else {
        return false;
    };
    body.get("data").and_then(Value::as_array).map(|a| !a.is_empty()).unwrap_or(false)
}
