use crate::errors::AppError;
use redis::AsyncCommands;

/// Short-TTL score cache plus the scoring-job queue. Both live in the
/// same Redis instance, mirroring the original ingestor's
/// `redis_client.lpush('scoring_queue', asn)` alongside the API's
/// `redis_client.setex(cache_key, ...)`.
#[derive(Clone)]
pub struct CacheStore {
    client: redis::Client,
}

const SCORING_QUEUE_KEY: &str = "scoring_queue";

impl CacheStore {
    pub fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(CacheStore { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    /// Pushes an ASN onto the scoring queue, signature matching the
    /// original's `lpush('scoring_queue', asn)`.
    pub async fn enqueue_scoring_job(&self, asn: i64) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        let _: () = conn.lpush(SCORING_QUEUE_KEY, asn).await?;
        Ok(())
    }

    /// Blocking pop used by the background job runner; `timeout_secs=0`
    /// blocks indefinitely.
    pub async fn dequeue_scoring_job(&self, timeout_secs: f64) -> Result<Option<i64>, AppError> {
        let mut conn = self.conn().await?;
        let result: Option<(String, i64)> = conn.brpop(SCORING_QUEUE_KEY, timeout_secs).await?;
        Ok(result.map(|(_, asn)| asn))
    }
}
