use crate::errors::AppError;
use crate::models::{ApiRequestLog, RiskLevel};
use crate::store::{CacheStore, EventStore, RegistryStore};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Instant;

pub struct AppState {
    pub registry: RegistryStore,
    pub events: EventStore,
    pub cache: CacheStore,
    pub cache_ttl_secs: u64,
    pub api_secret_key: String,
}

fn check_api_key(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    let provided = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());
    if provided == Some(state.api_secret_key.as_str()) {
        Ok(())
    } else {
        Err(AppError::AuthRejected)
    }
}

fn weak_etag(last_updated: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(last_updated.as_bytes());
    format!("W/\"{:x}\"", hasher.finalize())
}

async fn log_request(events: &EventStore, endpoint: &str, method: &str, status: u16, started: Instant, cache_hit: bool, client_ip: &str) {
    let entry = ApiRequestLog {
        timestamp: Utc::now(),
        endpoint: endpoint.to_string(),
        method: method.to_string(),
        status_code: status,
        response_time_ms: started.elapsed().as_millis() as u32,
        cache_hit,
        client_ip: client_ip.to_string(),
        error_message: String::new(),
    };
    if let Err(e) = events.log_api_request(&entry).await {
        log::error!("[API] failed to log request: {}", e);
    }
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok", "service": "asn-sentinel" }))
}

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "asn-sentinel",
        "version": "0.1.0",
        "endpoints": ["/asn/{asn}", "/asn/{asn}/history", "/asn/{asn}/upstreams"],
    }))
}

#[derive(Serialize)]
struct HygieneSignals {
    rpki_invalid_percent: f64,
    rpki_unknown_percent: f64,
    has_route_leaks: bool,
    has_bogon_ads: bool,
    is_stub_but_transit: bool,
    prefix_granularity_score: i32,
}

#[derive(Serialize)]
struct ThreatSignals {
    spamhaus_listed: bool,
    spam_emission_rate: f64,
    botnet_c2_count: i32,
    phishing_hosting_count: i32,
    malware_distribution_count: i32,
}

#[derive(Serialize)]
struct MetadataSignals {
    has_peeringdb_profile: bool,
    upstream_tier1_count: i32,
    is_whois_private: bool,
}

#[derive(Serialize)]
struct ForensicsSignals {
    ddos_blackhole_count: i32,
    excessive_prepending_count: i32,
}

#[derive(Serialize)]
struct AllSignals {
    hygiene: HygieneSignals,
    threats: ThreatSignals,
    metadata: MetadataSignals,
    forensics: ForensicsSignals,
}

#[derive(Serialize)]
struct ScoreCardResponse {
    asn: i64,
    name: Option<String>,
    country_code: Option<String>,
    registry: Option<String>,
    risk_score: i32,
    risk_level: String,
    rank_percentile: f64,
    downstream_score: Option<i32>,
    last_updated: String,
    breakdown: serde_json::Value,
    signals: AllSignals,
    details: Vec<crate::models::PenaltyDetail>,
}

#[get("/asn/{asn}")]
pub async fn get_asn_score(req: HttpRequest, path: web::Path<i64>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let started = Instant::now();
    let client_ip = req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_else(|| "0.0.0.0".to_string());
    check_api_key(&req, &state)?;
    let asn = path.into_inner();

    let cache_key = format!("score:v2:{}", asn);
    if let Ok(Some(cached)) = state.cache.get(&cache_key).await {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&cached) {
            let last_updated = value.get("last_updated").and_then(|v| v.as_str()).unwrap_or_default();
            let etag = weak_etag(last_updated);
            if req.headers().get("if-none-match").and_then(|v| v.to_str().ok()) == Some(etag.as_str()) {
                log_request(&state.events, "/asn", "GET", 304, started, true, &client_ip).await;
                return Ok(HttpResponse::NotModified().finish());
            }
            log_request(&state.events, "/asn", "GET", 200, started, true, &client_ip).await;
            return Ok(HttpResponse::Ok()
                .insert_header(("ETag", etag))
                .insert_header(("Cache-Control", format!("public, max-age={}", state.cache_ttl_secs)))
                .json(value));
        }
    }

    let scorecard = state.registry.get_scorecard(asn).await?;
    let Some((reg, signals)) = scorecard else {
        log_request(&state.events, "/asn", "GET", 404, started, false, &client_ip).await;
        return Err(AppError::NotFound);
    };

    let percentile = state.registry.rank_percentile(reg.total_score).await?;

    let level = if reg.risk_level == "UNKNOWN" {
        RiskLevel::from_score(reg.total_score).as_str().to_string()
    } else {
        reg.risk_level.clone()
    };

    let details = crate::scoring::rules::generate_penalty_details(&signals);

    let last_updated = reg
        .last_scored_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    let response = ScoreCardResponse {
        asn: reg.asn,
        name: reg.name,
        country_code: reg.country_code,
        registry: reg.registry,
        risk_score: reg.total_score,
        risk_level: level,
        rank_percentile: (percentile * 10.0).round() / 10.0,
        downstream_score: reg.downstream_score,
        last_updated: last_updated.clone(),
        breakdown: serde_json::json!({
            "hygiene": reg.hygiene_score,
            "threat": reg.threat_score,
            "stability": reg.stability_score,
        }),
        signals: AllSignals {
            hygiene: HygieneSignals {
                rpki_invalid_percent: signals.rpki_invalid_percent,
                rpki_unknown_percent: signals.rpki_unknown_percent,
                has_route_leaks: signals.has_route_leaks,
                has_bogon_ads: signals.has_bogon_ads,
                is_stub_but_transit: signals.is_stub_but_transit,
                prefix_granularity_score: signals.prefix_granularity_score,
            },
            threats: ThreatSignals {
                spamhaus_listed: signals.spamhaus_listed,
                spam_emission_rate: signals.spam_emission_rate,
                botnet_c2_count: signals.botnet_c2_count,
                phishing_hosting_count: signals.phishing_hosting_count,
                malware_distribution_count: signals.malware_distribution_count,
            },
            metadata: MetadataSignals {
                has_peeringdb_profile: signals.has_peeringdb_profile,
                upstream_tier1_count: signals.upstream_tier1_count,
                is_whois_private: signals.is_whois_private,
            },
            forensics: ForensicsSignals {
                ddos_blackhole_count: signals.ddos_blackhole_count,
                excessive_prepending_count: signals.excessive_prepending_count,
            },
        },
        details,
    };

    let body = serde_json::to_string(&response).map_err(|e| AppError::Internal(e.to_string()))?;
    let _ = state.cache.set_ex(&cache_key, &body, state.cache_ttl_secs).await;

    let etag = weak_etag(&last_updated);
    log_request(&state.events, "/asn", "GET", 200, started, false, &client_ip).await;
    Ok(HttpResponse::Ok()
        .insert_header(("ETag", etag))
        .insert_header(("Cache-Control", format!("public, max-age={}", state.cache_ttl_secs)))
        .json(response))
}

#[derive(Serialize)]
struct HistoryPoint {
    timestamp: String,
    score: i32,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    days: Option<u32>,
}

#[get("/asn/{asn}/history")]
pub async fn get_asn_history(
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    check_api_key(&req, &state)?;
    let asn = path.into_inner();
    let days = query.days.unwrap_or(30).min(365);

    let rows = state.events.score_history(asn as u32, days * 24).await.unwrap_or_default();
    let history: Vec<HistoryPoint> = rows
        .into_iter()
        .map(|entry| HistoryPoint { timestamp: entry.timestamp.to_rfc3339(), score: entry.score })
        .collect();

    Ok(HttpResponse::Ok().json(history))
}

#[derive(Serialize)]
struct UpstreamPeer {
    asn: i64,
    name: Option<String>,
    score: i32,
    risk_level: String,
    connection_count: u64,
}

#[derive(Serialize)]
struct PeerPressureResponse {
    asn: i64,
    risk_score: i32,
    avg_upstream_score: i32,
    upstreams: Vec<UpstreamPeer>,
}

#[get("/asn/{asn}/upstreams")]
pub async fn get_peer_pressure(req: HttpRequest, path: web::Path<i64>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    check_api_key(&req, &state)?;
    let asn = path.into_inner();

    let upstreams_raw = state.events.top_upstreams_30d(asn as u32, 5).await?;
    if upstreams_raw.is_empty() {
        return Ok(HttpResponse::Ok().json(PeerPressureResponse {
            asn,
            risk_score: 0,
            avg_upstream_score: 0,
            upstreams: vec![],
        }));
    }

    let my_score = state.registry.get_registry(asn).await?.map(|r| r.total_score).unwrap_or(0);

    let upstream_ids: Vec<i64> = upstreams_raw.iter().map(|(a, _)| *a as i64).collect();
    let scored = state.registry.scores_for_asns(&upstream_ids).await?;
    let score_map: std::collections::HashMap<i64, &crate::models::AsnRegistry> =
        scored.iter().map(|r| (r.asn, r)).collect();

    let mut total_ups_score = 0i64;
    let mut upstreams = Vec::new();
    for (u_asn, count) in &upstreams_raw {
        let u_asn_i64 = *u_asn as i64;
        if let Some(r) = score_map.get(&u_asn_i64) {
            upstreams.push(UpstreamPeer {
                asn: u_asn_i64,
                name: r.name.clone(),
                score: r.total_score,
                risk_level: r.risk_level.clone(),
                connection_count: *count,
            });
            total_ups_score += r.total_score as i64;
        } else {
            upstreams.push(UpstreamPeer {
                asn: u_asn_i64,
                name: None,
                score: 50,
                risk_level: "UNKNOWN".to_string(),
                connection_count: *count,
            });
            total_ups_score += 50;
        }
    }

    let avg_score = if upstreams.is_empty() { 0 } else { (total_ups_score / upstreams.len() as i64) as i32 };

    Ok(HttpResponse::Ok().json(PeerPressureResponse {
        asn,
        risk_score: my_score,
        avg_upstream_score: avg_score,
        upstreams,
    }))
}

#[derive(Deserialize)]
pub struct WhitelistRequest {
    asn: i64,
    reason: String,
}

#[post("/whitelist")]
pub async fn add_whitelist(req: HttpRequest, body: web::Json<WhitelistRequest>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    check_api_key(&req, &state)?;
    state.registry.whitelist_upsert(body.asn, &body.reason).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "message": format!("ASN {} added to whitelist.", body.asn),
    })))
}

#[derive(Deserialize)]
pub struct BulkRiskCheckRequest {
    asns: Vec<i64>,
}

#[derive(Serialize)]
struct BulkRiskResult {
    asn: i64,
    score: Option<i32>,
    level: String,
    name: Option<String>,
}

#[post("/tools/bulk-risk-check")]
pub async fn bulk_risk_check(req: HttpRequest, body: web::Json<BulkRiskCheckRequest>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    check_api_key(&req, &state)?;
    if body.asns.len() > 1000 {
        return Err(AppError::ValidationError("Max 1000 ASNs per request".to_string()));
    }

    let rows = state.registry.scores_for_asns(&body.asns).await?;
    let row_map: std::collections::HashMap<i64, &crate::models::AsnRegistry> = rows.iter().map(|r| (r.asn, r)).collect();

    let results: Vec<BulkRiskResult> = body
        .asns
        .iter()
        .map(|asn| match row_map.get(asn) {
            Some(r) => BulkRiskResult { asn: *asn, score: Some(r.total_score), level: r.risk_level.clone(), name: r.name.clone() },
            None => BulkRiskResult { asn: *asn, score: None, level: "UNKNOWN".to_string(), name: None },
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "results": results })))
}
