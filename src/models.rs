use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `risk_level` as carried on the registry row and surfaced by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    /// §4.5 step 6 thresholds, also reused by the API when a stored level
    /// is UNKNOWN (spec.md §4.6).
    pub fn from_score(score: i32) -> Self {
        if score >= 90 {
            RiskLevel::Low
        } else if score >= 70 {
            RiskLevel::Medium
        } else if score >= 50 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "LOW" => RiskLevel::Low,
            "MEDIUM" => RiskLevel::Medium,
            "HIGH" => RiskLevel::High,
            "CRITICAL" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }
}

/// `asn_registry` row. `total_score` is always in [0,100]; the three
/// category scores are stored as `100 + breakdown[cat]`, matching the
/// original schema's "offset from baseline" encoding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AsnRegistry {
    pub asn: i64,
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub registry: Option<String>,
    pub total_score: i32,
    pub hygiene_score: i32,
    pub threat_score: i32,
    pub stability_score: i32,
    pub risk_level: String,
    pub last_scored_at: Option<DateTime<Utc>>,
    pub downstream_score: Option<i32>,
}

impl AsnRegistry {
    /// Lifecycle default: created on first observation, score 100, level
    /// UNKNOWN (spec.md §3).
    pub fn new_default(asn: i64) -> Self {
        AsnRegistry {
            asn,
            name: None,
            country_code: None,
            registry: None,
            total_score: 100,
            hygiene_score: 100,
            threat_score: 100,
            stability_score: 100,
            risk_level: "UNKNOWN".to_string(),
            last_scored_at: None,
            downstream_score: None,
        }
    }
}

/// `asn_signals` row. Defaults are the "clean slate" from spec.md §3:
/// all zero/false except `has_peeringdb_profile=true`,
/// `upstream_tier1_count=1`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AsnSignals {
    pub asn: i64,
    pub rpki_invalid_percent: f64,
    pub rpki_unknown_percent: f64,
    pub has_route_leaks: bool,
    pub has_bogon_ads: bool,
    pub is_stub_but_transit: bool,
    pub prefix_granularity_score: i32,
    pub spamhaus_listed: bool,
    pub spam_emission_rate: f64,
    pub botnet_c2_count: i32,
    pub phishing_hosting_count: i32,
    pub malware_distribution_count: i32,
    pub has_peeringdb_profile: bool,
    pub upstream_tier1_count: i32,
    pub is_whois_private: bool,
    pub ddos_blackhole_count: i32,
    pub excessive_prepending_count: i32,
}

impl AsnSignals {
    pub fn new_default(asn: i64) -> Self {
        AsnSignals {
            asn,
            rpki_invalid_percent: 0.0,
            rpki_unknown_percent: 0.0,
            has_route_leaks: false,
            has_bogon_ads: false,
            is_stub_but_transit: false,
            prefix_granularity_score: 0,
            spamhaus_listed: false,
            spam_emission_rate: 0.0,
            botnet_c2_count: 0,
            phishing_hosting_count: 0,
            malware_distribution_count: 0,
            has_peeringdb_profile: true,
            upstream_tier1_count: 1,
            is_whois_private: false,
            ddos_blackhole_count: 0,
            excessive_prepending_count: 0,
        }
    }
}

/// `asn_whitelist` row. Presence short-circuits scoring.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WhitelistEntry {
    pub asn: i64,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// BGP event type: announce or withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BgpEventType {
    Announce,
    Withdraw,
}

impl BgpEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BgpEventType::Announce => "announce",
            BgpEventType::Withdraw => "withdraw",
        }
    }
}

/// Append-only BGP event, ordered by `(asn, timestamp)`.
#[derive(Debug, Clone, clickhouse::Row, Serialize, Deserialize)]
pub struct BgpEvent {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub timestamp: DateTime<Utc>,
    pub asn: u32,
    pub prefix: String,
    pub event_type: String,
    pub upstream_as: u32,
    pub path: Vec<u32>,
    pub community: Vec<u32>,
}

/// Append-only threat correlation event.
#[derive(Debug, Clone, clickhouse::Row, Serialize, Deserialize)]
pub struct ThreatEvent {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub timestamp: DateTime<Utc>,
    pub asn: u32,
    pub source: String,
    pub category: String,
    pub target_ip: String,
    pub description: String,
}

/// Append-only score history entry, one row per scoring run.
#[derive(Debug, Clone, clickhouse::Row, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub timestamp: DateTime<Utc>,
    pub asn: u32,
    pub score: i32,
}

/// Append-only API request observability record.
#[derive(Debug, Clone, clickhouse::Row, Serialize, Deserialize)]
pub struct ApiRequestLog {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_ms: u32,
    pub cache_hit: bool,
    pub client_ip: String,
    pub error_message: String,
}

/// Daily aggregate row backing `recent_withdrawals`.
#[derive(Debug, Clone, clickhouse::Row, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date: String,
    pub asn: u32,
    pub withdraw_count: u32,
}

/// Per-category penalty/bonus breakdown produced by the scoring engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreBreakdown {
    pub hygiene: i32,
    pub threat: i32,
    pub stability: i32,
}

/// Severity used by the details synthesis (spec.md §4.6).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single human-readable actionable finding on a score card.
#[derive(Debug, Clone, Serialize)]
pub struct PenaltyDetail {
    pub code: String,
    pub severity: Severity,
    pub description: String,
    pub action: String,
}
