use crate::models::BgpEvent;
use crate::store::EventStore;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use native_tls::TlsConnector;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async_tls_with_config, Connector};

const FLUSH_MAX_BATCH: usize = 1000;
const FLUSH_INTERVAL: Duration = Duration::from_secs(2);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Runs forever, reconnecting on any error. Same upstream-connect loop
/// shape as a bidirectional VNC relay, repointed at a one-way BGP feed.
pub async fn run(stream_url: String, events: EventStore) {
    loop {
        if let Err(e) = consume_once(&stream_url, &events).await {
            log::warn!("[BGP] connection error: {}. Reconnecting in {}s...", e, RECONNECT_DELAY.as_secs());
        }
        sleep(RECONNECT_DELAY).await;
    }
}

async fn consume_once(stream_url: &str, events: &EventStore) -> Result<(), String> {
    let tls = TlsConnector::builder()
        .build()
        .map_err(|e| e.to_string())?;
    let connector = Connector::NativeTls(tls);

    log::info!("[BGP] connecting to {}", stream_url);
    let (ws_stream, _) = connect_async_tls_with_config(stream_url, None, false, Some(connector))
        .await
        .map_err(|e| e.to_string())?;
    log::info!("[BGP] connected, subscribing to RRC21");

    let (mut write, mut read) = ws_stream.split();

    let subscribe_msg = serde_json::json!({
        "type": "ris_subscribe",
        "data": {
            "host": "rrc21",
            "type": "UPDATE",
            "require": "announcements",
        }
    });
    write
        .send(TungsteniteMessage::Text(subscribe_msg.to_string().into()))
        .await
        .map_err(|e| e.to_string())?;

    let mut batch: Vec<BgpEvent> = Vec::new();
    let mut last_flush = Instant::now();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => return Err(e.to_string()),
        };

        let text = match msg {
            TungsteniteMessage::Text(t) => t.to_string(),
            TungsteniteMessage::Close(_) => return Err("upstream closed connection".to_string()),
            _ => continue,
        };

        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if value.get("type").and_then(Value::as_str) == Some("ris_message") {
                if let Some(data) = value.get("data") {
                    if let Some(event) = parse_ripe_message(data) {
                        batch.push(event);
                    }
                }
            }
        }

        if batch.len() >= FLUSH_MAX_BATCH || (!batch.is_empty() && last_flush.elapsed() >= FLUSH_INTERVAL) {
            flush(events, &mut batch).await;
            last_flush = Instant::now();
        }
    }

    Ok(())
}

async fn flush(events: &EventStore, batch: &mut Vec<BgpEvent>) {
    if batch.is_empty() {
        return;
    }
    if let Err(e) = events.insert_bgp_batch(batch).await {
        log::error!("[BGP] batch insert failed: {}", e);
    }
    batch.clear();
}

/// Mirrors the original ingestor's `_parse_ripe_message`: last AS-path
/// hop is the origin, the one before it the upstream, communities packed
/// as `asn*65536 + value` when RIPE sends a two-element pair.
fn parse_ripe_message(msg: &Value) -> Option<BgpEvent> {
    let path: Vec<u32> = msg
        .get("path")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_u64().map(|n| n as u32))
        .collect();
    if path.is_empty() {
        return None;
    }

    let origin_asn = *path.last()?;
    let upstream_as = if path.len() > 1 { path[path.len() - 2] } else { 0 };

    let announcements = msg.get("announcements")?.as_array()?;
    let prefix = announcements
        .first()
        .and_then(|a| a.get("prefixes"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(Value::as_str)
        .unwrap_or("0.0.0.0/0")
        .to_string();
    if announcements.is_empty() {
        return None;
    }

    let mut community = Vec::new();
    if let Some(raw) = msg.get("communities").and_then(Value::as_array) {
        for c in raw {
            if let Some(pair) = c.as_array() {
                if pair.len() == 2 {
                    if let (Some(a), Some(v)) = (pair[0].as_u64(), pair[1].as_u64()) {
                        community.push((a as u32).wrapping_mul(65536).wrapping_add(v as u32));
                    }
                }
            } else if let Some(v) = c.as_u64() {
                community.push(v as u32);
            }
        }
    }

    Some(BgpEvent {
        timestamp: Utc::now(),
        asn: origin_asn,
        prefix,
        event_type: "announce".to_string(),
        upstream_as,
        path,
        community,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_announcement() {
        let msg = serde_json::json!({
            "path": [174, 64512],
            "announcements": [{"prefixes": ["198.51.100.0/24"]}],
            "communities": [[64512, 100], 12345]
        });
        let event = parse_ripe_message(&msg).expect("should parse");
        assert_eq!(event.asn, 64512);
        assert_eq!(event.upstream_as, 174);
        assert_eq!(event.prefix, "198.51.100.0/24");
        assert_eq!(event.community, vec![64512 * 65536 + 100, 12345]);
    }

    #[test]
    fn rejects_empty_path() {
        let msg = serde_json::json!({"path": [], "announcements": [{"prefixes": ["1.2.3.0/24"]}]});
        assert!(parse_ripe_message(&msg).is_none());
    }

    #[test]
    fn rejects_missing_announcements() {
        let msg = serde_json::json!({"path": [174], "announcements": []});
        assert!(parse_ripe_message(&msg).is_none());
    }
}
