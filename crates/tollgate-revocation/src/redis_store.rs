//! Redis-backed revocation store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::RevocationError;
use crate::store::{RevocationStore, ensure_ttl, record_key};

/// Default key prefix for liveness records
pub const DEFAULT_KEY_PREFIX: &str = "jwt";

/// Redis-backed revocation store
///
/// Records live under `<prefix>:<subject_id>` with a millisecond TTL. The
/// connection is established on first use and re-established by the
/// connection manager afterwards, so an unreachable server at startup does
/// not prevent the service from running.
pub struct RedisRevocationStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    key_prefix: String,
    timeout: Duration,
}

impl RedisRevocationStore {
    /// Create a new Redis revocation store
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379/0")
    /// * `key_prefix` - Prefix for record keys (e.g., "jwt")
    /// * `timeout` - Upper bound for each store operation, connection included
    pub fn new(
        redis_url: &str,
        key_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RevocationError> {
        let client =
            Client::open(redis_url).map_err(|e| RevocationError::Connection(e.to_string()))?;
        let key_prefix = key_prefix.into();

        info!(
            "Using Redis revocation store (prefix: {}, timeout: {:?})",
            key_prefix, timeout
        );

        Ok(Self {
            client,
            connection: OnceCell::new(),
            key_prefix,
            timeout,
        })
    }

    fn key(&self, subject_id: i64) -> String {
        record_key(&self.key_prefix, subject_id)
    }

    async fn connection(&self) -> Result<ConnectionManager, RevocationError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!("Connecting to Redis");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| RevocationError::Connection(e.to_string()))
            })
            .await?;
        Ok(manager.clone())
    }

    async fn query<T: FromRedisValue>(
        &self,
        operation: &'static str,
        cmd: Cmd,
    ) -> Result<T, RevocationError> {
        self.bounded(operation, async {
            let mut conn = self.connection().await?;
            cmd.query_async::<_, T>(&mut conn)
                .await
                .map_err(|e| RevocationError::Command(e.to_string()))
        })
        .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, RevocationError>>,
    ) -> Result<T, RevocationError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RevocationError::Timeout {
                operation,
                after: self.timeout,
            })?
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn record(
        &self,
        subject_id: i64,
        marker: &str,
        ttl: Duration,
    ) -> Result<(), RevocationError> {
        ensure_ttl(ttl)?;

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(subject_id)).arg(marker).arg("PX").arg(ttl_ms);

        self.query::<()>("record", cmd).await?;
        debug!("Recorded liveness for subject {} (ttl {:?})", subject_id, ttl);
        Ok(())
    }

    async fn check_live(&self, subject_id: i64) -> Result<bool, RevocationError> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(self.key(subject_id));
        let count: i64 = self.query("check_live", cmd).await?;
        Ok(count > 0)
    }

    async fn current(&self, subject_id: i64) -> Result<Option<String>, RevocationError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.key(subject_id));
        self.query("current", cmd).await
    }

    async fn revoke(&self, subject_id: i64) -> Result<bool, RevocationError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(self.key(subject_id));
        let removed: i64 = self.query("revoke", cmd).await?;
        Ok(removed > 0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
