use crate::errors::AppError;
use crate::models::{AsnRegistry, AsnSignals};
use log::info;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row};

/// Metadata store: identity, whitelist, and the latest score snapshot per
/// ASN. Backed by Postgres, the same store used for caches and
/// dashboards elsewhere in this service family.
#[derive(Clone)]
pub struct RegistryStore {
    pool: Pool<Postgres>,
}

impl RegistryStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(RegistryStore { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asn_registry (
                asn BIGINT PRIMARY KEY,
                name TEXT,
                country_code TEXT,
                registry TEXT,
                total_score INT NOT NULL DEFAULT 100,
                hygiene_score INT NOT NULL DEFAULT 100,
                threat_score INT NOT NULL DEFAULT 100,
                stability_score INT NOT NULL DEFAULT 100,
                risk_level TEXT NOT NULL DEFAULT 'UNKNOWN',
                last_scored_at TIMESTAMPTZ,
                downstream_score INT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asn_signals (
                asn BIGINT PRIMARY KEY REFERENCES asn_registry(asn),
                rpki_invalid_percent DOUBLE PRECISION NOT NULL DEFAULT 0,
                rpki_unknown_percent DOUBLE PRECISION NOT NULL DEFAULT 0,
                has_route_leaks BOOLEAN NOT NULL DEFAULT FALSE,
                has_bogon_ads BOOLEAN NOT NULL DEFAULT FALSE,
                is_stub_but_transit BOOLEAN NOT NULL DEFAULT FALSE,
                prefix_granularity_score INT NOT NULL DEFAULT 0,
                spamhaus_listed BOOLEAN NOT NULL DEFAULT FALSE,
                spam_emission_rate DOUBLE PRECISION NOT NULL DEFAULT 0,
                botnet_c2_count INT NOT NULL DEFAULT 0,
                phishing_hosting_count INT NOT NULL DEFAULT 0,
                malware_distribution_count INT NOT NULL DEFAULT 0,
                has_peeringdb_profile BOOLEAN NOT NULL DEFAULT TRUE,
                upstream_tier1_count INT NOT NULL DEFAULT 1,
                is_whois_private BOOLEAN NOT NULL DEFAULT FALSE,
                ddos_blackhole_count INT NOT NULL DEFAULT 0,
                excessive_prepending_count INT NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asn_whitelist (
                asn BIGINT PRIMARY KEY,
                reason TEXT,
                added_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        info!("[Registry] schema ready (asn_registry, asn_signals, asn_whitelist)");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn is_whitelisted(&self, asn: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT asn FROM asn_whitelist WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn whitelist_upsert(&self, asn: i64, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO asn_whitelist (asn, reason) VALUES ($1, $2)
             ON CONFLICT (asn) DO UPDATE SET reason = EXCLUDED.reason",
        )
        .bind(asn)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches signals for `asn`, creating a clean-slate registry + signals
    /// row pair if this is the first time the ASN has been observed.
    pub async fn get_or_create_signals(&self, asn: i64) -> Result<AsnSignals, AppError> {
        if let Some(row) = sqlx::query_as::<_, AsnSignals>("SELECT * FROM asn_signals WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(row);
        }

        sqlx::query("INSERT INTO asn_registry (asn, total_score) VALUES ($1, 100) ON CONFLICT DO NOTHING")
            .bind(asn)
            .execute(&self.pool)
            .await?;

        let clean = AsnSignals::new_default(asn);
        sqlx::query(
            "INSERT INTO asn_signals (
                asn, rpki_invalid_percent, rpki_unknown_percent,
                has_route_leaks, has_bogon_ads, prefix_granularity_score,
                is_stub_but_transit, spamhaus_listed, spam_emission_rate,
                botnet_c2_count, phishing_hosting_count, malware_distribution_count,
                has_peeringdb_profile, upstream_tier1_count, is_whois_private
            ) VALUES ($1, 0.0, 0.0, FALSE, FALSE, 0, FALSE, FALSE, 0.0, 0, 0, 0, TRUE, 1, FALSE)
            ON CONFLICT DO NOTHING",
        )
        .bind(asn)
        .execute(&self.pool)
        .await?;

        Ok(clean)
    }

    pub async fn get_registry(&self, asn: i64) -> Result<Option<AsnRegistry>, AppError> {
        let row = sqlx::query_as::<_, AsnRegistry>("SELECT * FROM asn_registry WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Registry row joined with its signals, as the lookup API needs.
    pub async fn get_scorecard(&self, asn: i64) -> Result<Option<(AsnRegistry, AsnSignals)>, AppError> {
        let reg = self.get_registry(asn).await?;
        let Some(reg) = reg else { return Ok(None) };
        let signals = sqlx::query_as::<_, AsnSignals>("SELECT * FROM asn_signals WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or_else(|| AsnSignals::new_default(asn));
        Ok(Some((reg, signals)))
    }

    pub async fn save_score(
        &self,
        asn: i64,
        score: i32,
        hygiene: i32,
        threat: i32,
        stability: i32,
        risk_level: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE asn_registry SET
                total_score = $1,
                hygiene_score = 100 + $2,
                threat_score = 100 + $3,
                stability_score = 100 + $4,
                risk_level = $5,
                last_scored_at = NOW()
             WHERE asn = $6",
        )
        .bind(score)
        .bind(hygiene)
        .bind(threat)
        .bind(stability)
        .bind(risk_level)
        .bind(asn)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_metadata(&self, asn: i64, name: &str, country_code: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE asn_registry SET name = $1, country_code = $2 WHERE asn = $3")
            .bind(name)
            .bind(country_code)
            .bind(asn)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn needs_enrichment(&self, asn: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT name FROM asn_registry WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => {
                let name: Option<String> = r.try_get("name").ok();
                matches!(name, None) || name.as_deref() == Some("")
            }
            None => true,
        })
    }

    pub async fn set_has_peeringdb_profile(&self, asn: i64, has_profile: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE asn_signals SET has_peeringdb_profile = $1 WHERE asn = $2")
            .bind(has_profile)
            .bind(asn)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn rank_percentile(&self, score: i32) -> Result<f64, AppError> {
        let count_lower: i64 = sqlx::query("SELECT count(*) AS c FROM asn_registry WHERE total_score < $1")
            .bind(score)
            .fetch_one(&self.pool)
            .await?
            .try_get("c")?;
        let total: i64 = sqlx::query("SELECT count(*) AS c FROM asn_registry")
            .fetch_one(&self.pool)
            .await?
            .try_get("c")?;
        if total == 0 {
            return Ok(0.0);
        }
        Ok((count_lower as f64 / total as f64) * 100.0)
    }

    pub async fn scores_for_asns(&self, asns: &[i64]) -> Result<Vec<AsnRegistry>, AppError> {
        let rows = sqlx::query_as::<_, AsnRegistry>("SELECT * FROM asn_registry WHERE asn = ANY($1)")
            .bind(asns)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
