use crate::errors::AppError;
use crate::models::{ApiRequestLog, BgpEvent, ScoreHistoryEntry, ThreatEvent};
use clickhouse::Client;
use log::info;

/// Append-only telemetry store: BGP events, threat correlations, score
/// history, and request observability. ClickHouse is used purely for its
/// "append fast, scan a time window" access pattern.
#[derive(Clone)]
pub struct EventStore {
    client: Client,
}

impl EventStore {
    pub fn connect(url: &str, database: &str, user: &str, password: &str) -> Self {
        let mut client = Client::default().with_url(url).with_database(database);
        if !user.is_empty() {
            client = client.with_user(user);
        }
        if !password.is_empty() {
            client = client.with_password(password);
        }
        EventStore { client }
    }

    pub async fn init(&self) -> Result<(), clickhouse::error::Error> {
        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS bgp_events (
                    timestamp DateTime,
                    asn UInt32,
                    prefix String,
                    event_type String,
                    upstream_as UInt32,
                    path Array(UInt32),
                    community Array(UInt32)
                ) ENGINE = MergeTree() ORDER BY (asn, timestamp)",
            )
            .execute()
            .await?;

        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS threat_events (
                    timestamp DateTime,
                    asn UInt32,
                    source String,
                    category String,
                    target_ip String,
                    description String
                ) ENGINE = MergeTree() ORDER BY (asn, timestamp)",
            )
            .execute()
            .await?;

        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS asn_score_history (
                    timestamp DateTime,
                    asn UInt32,
                    score UInt8
                ) ENGINE = MergeTree() ORDER BY (asn, timestamp)",
            )
            .execute()
            .await?;

        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS api_requests (
                    timestamp DateTime,
                    endpoint String,
                    method String,
                    status_code UInt16,
                    response_time_ms UInt32,
                    cache_hit UInt8,
                    client_ip String,
                    error_message String
                ) ENGINE = MergeTree() ORDER BY timestamp",
            )
            .execute()
            .await?;

        self.client
            .query(
                "CREATE TABLE IF NOT EXISTS daily_metrics (
                    date Date,
                    asn UInt32,
                    withdraw_count UInt32
                ) ENGINE = SummingMergeTree() ORDER BY (asn, date)",
            )
            .execute()
            .await?;

        info!("[Events] schema ready (bgp_events, threat_events, asn_score_history, api_requests, daily_metrics)");
        Ok(())
    }

    pub async fn insert_bgp_batch(&self, batch: &[BgpEvent]) -> Result<(), clickhouse::error::Error> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut insert = self.client.insert("bgp_events")?;
        for event in batch {
            insert.write(event).await?;
        }
        insert.end().await
    }

    pub async fn insert_threat_event(&self, event: &ThreatEvent) -> Result<(), clickhouse::error::Error> {
        let mut insert = self.client.insert("threat_events")?;
        insert.write(event).await?;
        insert.end().await
    }

    pub async fn insert_score_history(&self, entry: &ScoreHistoryEntry) -> Result<(), clickhouse::error::Error> {
        let mut insert = self.client.insert("asn_score_history")?;
        insert.write(entry).await?;
        insert.end().await
    }

    pub async fn log_api_request(&self, entry: &ApiRequestLog) -> Result<(), clickhouse::error::Error> {
        let mut insert = self.client.insert("api_requests")?;
        insert.write(entry).await?;
        insert.end().await
    }

    /// (prefix, latest asn) for every prefix announced in the last hour.
    pub async fn active_routes(&self) -> Result<Vec<(String, u32)>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT prefix, argMax(asn, timestamp) as asn FROM bgp_events
                 WHERE timestamp > now() - INTERVAL 1 HOUR GROUP BY prefix",
            )
            .fetch_all::<(String, u32)>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    /// ASNs with more than 5 announce/withdraw events in the last minute,
    /// capped at 50.
    pub async fn high_activity_asns(&self) -> Result<Vec<u32>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT asn FROM bgp_events WHERE timestamp > now() - INTERVAL 1 MINUTE
                 GROUP BY asn HAVING count() > 5 LIMIT 50",
            )
            .fetch_all::<u32>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    /// Distinct (asn, prefix) announcements in the last 5 minutes.
    pub async fn recent_announcements(&self) -> Result<Vec<(u32, String)>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT asn, prefix FROM bgp_events
                 WHERE timestamp > now() - INTERVAL 5 MINUTE AND event_type = 'announce'",
            )
            .fetch_all::<(u32, String)>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    pub async fn upstream_churn_90d(&self, asn: u32) -> Result<u64, AppError> {
        let count = self
            .client
            .query(
                "SELECT uniq(upstream_as) FROM bgp_events
                 WHERE asn = ? AND event_type = 'announce' AND timestamp > now() - INTERVAL 90 DAY",
            )
            .bind(asn)
            .fetch_one::<u64>()
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    pub async fn recent_withdrawals_7d(&self, asn: u32) -> Result<u64, AppError> {
        let count = self
            .client
            .query(
                "SELECT sum(withdraw_count) FROM daily_metrics
                 WHERE asn = ? AND date > today() - 7",
            )
            .bind(asn)
            .fetch_optional::<u64>()
            .await
            .map_err(AppError::from)?;
        Ok(count.unwrap_or(0))
    }

    pub async fn prefix_velocity_2d(&self, asn: u32) -> Result<u64, AppError> {
        let count = self
            .client
            .query("SELECT uniq(prefix) FROM bgp_events WHERE asn = ? AND timestamp > now() - INTERVAL 2 DAY")
            .bind(asn)
            .fetch_one::<u64>()
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    pub async fn recent_threat_count_30d(&self, asn: u32) -> Result<u64, AppError> {
        let count = self
            .client
            .query("SELECT count(*) FROM threat_events WHERE asn = ? AND timestamp > now() - INTERVAL 30 DAY")
            .bind(asn)
            .fetch_one::<u64>()
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    /// Top upstream ASNs by announcement count in the last 30 days.
    pub async fn top_upstreams_30d(&self, asn: u32, limit: u32) -> Result<Vec<(u32, u64)>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT upstream_as, count(*) as c FROM bgp_events
                 WHERE asn = ? AND upstream_as != 0 AND timestamp > now() - INTERVAL 30 DAY
                 GROUP BY upstream_as ORDER BY c DESC LIMIT ?",
            )
            .bind(asn)
            .bind(limit)
            .fetch_all::<(u32, u64)>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    /// Daily event counts over the last 14 days, for the predictive
    /// instability coefficient-of-variation check.
    pub async fn daily_event_counts_14d(&self, asn: u32) -> Result<Vec<u64>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT count(*) as c FROM bgp_events
                 WHERE asn = ? AND timestamp > now() - INTERVAL 14 DAY
                 GROUP BY toDate(timestamp)",
            )
            .bind(asn)
            .fetch_all::<u64>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    pub async fn score_history(&self, asn: u32, limit: u32) -> Result<Vec<ScoreHistoryEntry>, AppError> {
        let rows = self
            .client
            .query(
                "SELECT timestamp, asn, score FROM asn_score_history
                 WHERE asn = ? ORDER BY timestamp DESC LIMIT ?",
            )
            .bind(asn)
            .bind(limit)
            .fetch_all::<ScoreHistoryEntry>()
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }
}
