//! Redis cache for the Liaison services
//!
//! The auth service keeps sessions and the refresh-token blacklist here;
//! keys carry their own TTLs so nothing needs a sweeper.

use redis::{AsyncCommands, Client};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for the Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    /// Read `REDIS_URL` (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Ok(RedisConfig { url })
    }
}

/// Handle on the Redis server. Cheap to clone; connections are
/// multiplexed per call.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)
    }

    /// Store a value, optionally expiring after `ttl_seconds`
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.connection().await?;

        let result: Result<(), redis::RedisError> = match ttl_seconds {
            Some(ttl) => conn.set_ex(key, value, ttl).await,
            None => conn.set(key, value).await,
        };

        result.map_err(CacheError::Command)
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key).await.map_err(CacheError::Command)
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await.map_err(CacheError::Command)?;
        Ok(())
    }

    /// PING round trip
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_round_trip() -> CacheResult<()> {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("REDIS_URL not set, skipping");
            return Ok(());
        };

        let pool = RedisPool::new(&RedisConfig { url }).await?;
        assert!(pool.health_check().await?);

        let key = "liaison_test_key";
        pool.set(key, "liaison_test_value", Some(5)).await?;
        assert_eq!(pool.get(key).await?, Some("liaison_test_value".to_string()));

        pool.delete(key).await?;
        assert_eq!(pool.get(key).await?, None);

        Ok(())
    }
}
