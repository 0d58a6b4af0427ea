use std::env;

/// Process-wide configuration, loaded once from the environment at startup.
/// Every field has a local-dev-friendly default: every adapter this crate
/// depends on (Postgres, ClickHouse, Redis) has a sane local default, so
/// nothing here needs to hard-panic on a missing variable.
#[derive(Clone, Debug)]
pub struct Config {
    pub registry_db_url: String,
    pub event_store_url: String,
    pub event_store_database: String,
    pub event_store_user: String,
    pub event_store_password: String,
    pub cache_url: String,
    pub cache_ttl_secs: u64,
    pub api_secret_key: String,
    pub bgp_stream_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        let registry_db_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "asn_admin".to_string());
            let pass = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "secure_password".to_string());
            let host = env::var("DB_META_HOST").unwrap_or_else(|_| "localhost".to_string());
            let db = env::var("POSTGRES_DB").unwrap_or_else(|_| "asn_registry".to_string());
            format!("postgres://{}:{}@{}:5432/{}", user, pass, host, db)
        });

        let event_store_url = env::var("DB_TS_HOST")
            .map(|h| format!("http://{}:8123", h))
            .unwrap_or_else(|_| "http://localhost:8123".to_string());

        let event_store_database = env::var("CLICKHOUSE_DATABASE").unwrap_or_else(|_| "asn_events".to_string());
        let event_store_user = env::var("CLICKHOUSE_USER").unwrap_or_else(|_| "default".to_string());
        let event_store_password = env::var("CLICKHOUSE_PASSWORD").unwrap_or_default();

        let cache_url = env::var("BROKER_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string());
        let cache_ttl_secs: u64 = env::var("CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let api_secret_key = env::var("API_SECRET_KEY").unwrap_or_else(|_| "dev-secret".to_string());

        let bgp_stream_url = env::var("BGP_STREAM_URL").unwrap_or_else(|_| "wss://ris-live.ripe.net/v1/ws/".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Config {
            registry_db_url,
            event_store_url,
            event_store_database,
            event_store_user,
            event_store_password,
            cache_url,
            cache_ttl_secs,
            api_secret_key,
            bgp_stream_url,
            bind_addr,
        }
    }
}

/// Tier-1, transit-independent backbone ASNs exempt from the route-leak
/// heuristic (spec-fixed set).
pub const TIER1_ASNS: &[u32] = &[
    3356, 1299, 174, 2914, 3257, 6453, 3491, 701, 1239, 7018, 6461, 5511, 3549,
];
