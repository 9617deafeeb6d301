use crate::error::StoreError;
use crate::idempotency::{in_flight_value, IdempotencyStore, RecordStatus, Reservation};
use redis::AsyncCommands;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisIdempotencyStore {
    pub client: redis::Client,
}

impl RedisIdempotencyStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    fn record_key(key: &str) -> String {
        format!("payment:idempotency:{}", key)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

/// Deletes KEYS[1] only while it still holds ARGV[1].
const RELEASE_IF_OWNER: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait::async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let found: bool = conn.exists(Self::record_key(key)).await?;
        Ok(found)
    }

    async fn record_processed(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(Self::record_key(key))
            .arg(RecordStatus::Processed.as_str())
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn reserve(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<Reservation, StoreError> {
        let mut conn = self.conn().await?;
        let redis_key = Self::record_key(key);
        let created: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(in_flight_value(owner))
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        if created.is_some() {
            return Ok(Reservation::Reserved);
        }

        let current: Option<String> = conn.get(&redis_key).await?;
        match current.as_deref().and_then(RecordStatus::parse) {
            Some(RecordStatus::Processed) => Ok(Reservation::AlreadyProcessed),
            // A record that vanished between SET NX and GET expired mid-check;
            // report it as busy and let the client come back.
            _ => Ok(Reservation::InFlight),
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let script = redis::Script::new(RELEASE_IF_OWNER);
        let deleted: usize = script
            .key(Self::record_key(key))
            .arg(in_flight_value(owner))
            .invoke_async(&mut conn)
            .await?;
        if deleted == 0 {
            tracing::debug!(idempotency_key = %key, "reservation no longer held, nothing released");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
