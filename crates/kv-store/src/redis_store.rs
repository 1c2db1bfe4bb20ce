use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::{
    KvError, Result, StoredValue,
    store::{KeyValueStore, Ttl},
};

/// Number of keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Connection settings for [`RedisKeyValueStore`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL, e.g. `redis://localhost:6379/0`.
    pub url: String,
    /// Upper bound for every single store operation.
    pub operation_timeout: Duration,
}

impl RedisConfig {
    /// Creates a config with the default five second operation timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            operation_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the per-operation timeout.
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }
}

/// Redis-backed key-value store.
///
/// Holds a single auto-reconnecting connection manager behind a lock so the
/// client can be closed explicitly at shutdown. Once closed, every operation
/// fails with [`KvError::NotConnected`].
#[derive(Clone)]
pub struct RedisKeyValueStore {
    connection: Arc<RwLock<Option<ConnectionManager>>>,
    operation_timeout: Duration,
}

impl RedisKeyValueStore {
    /// Connects to Redis and verifies the connection with a PING.
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let manager = timeout(config.operation_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| KvError::Timeout {
                operation: "connect",
            })??;

        let store = Self {
            connection: Arc::new(RwLock::new(Some(manager))),
            operation_timeout: config.operation_timeout,
        };
        store.ping().await?;

        tracing::info!(
            timeout_ms = config.operation_timeout.as_millis() as u64,
            "Connected to Redis"
        );
        Ok(store)
    }

    /// Drops the connection. Safe to call more than once.
    pub async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            tracing::info!("Redis connection closed");
        }
    }

    /// Returns true until [`close`](Self::close) has been called.
    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(KvError::NotConnected)
    }

    /// Runs one command against a connection, bounded by the operation timeout.
    async fn run<T, F, Fut>(&self, operation: &'static str, key: &str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match timeout(self.operation_timeout, command(conn)).await {
            Ok(result) => result.map_err(|err| classify(key, err)),
            Err(_) => {
                metrics::counter!("kv_store_timeouts_total", "operation" => operation)
                    .increment(1);
                tracing::warn!(operation, key, "Redis operation timed out");
                Err(KvError::Timeout { operation })
            }
        }
    }
}

fn classify(key: &str, err: redis::RedisError) -> KvError {
    if err.code() == Some("WRONGTYPE") {
        KvError::WrongType {
            key: key.to_string(),
        }
    } else {
        KvError::Redis(err)
    }
}

fn decode_field(key: &str, text: Option<String>) -> Result<Option<StoredValue>> {
    text.map(|text| StoredValue::from_wire(key, &text))
        .transpose()
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: StoredValue, ttl: Option<Duration>) -> Result<()> {
        let wire = value.to_wire()?;
        self.run("set", key, |mut conn| async move {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(wire);
            if let Some(ttl) = ttl {
                cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
            }
            let _: () = cmd.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let text: Option<String> = self
            .run("get", key, |mut conn| async move { conn.get(key).await })
            .await?;
        decode_field(key, text)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed: i64 = self
            .run("delete", key, |mut conn| async move { conn.del(key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.run("exists", key, |mut conn| async move { conn.exists(key).await })
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let updated: i64 = self
            .run("expire", key, |mut conn| async move {
                redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(ttl.as_millis() as u64)
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(updated == 1)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl> {
        let secs: i64 = self
            .run("ttl", key, |mut conn| async move { conn.ttl(key).await })
            .await?;
        Ok(Ttl::from_secs(secs))
    }

    #[tracing::instrument(skip(self))]
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        // Each round trip gets its own timeout so a large keyspace does not
        // trip the limit on its own.
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .run("scan", pattern, |mut conn| async move {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn hset(&self, key: &str, field: &str, value: StoredValue) -> Result<bool> {
        let wire = value.to_wire()?;
        let added: i64 = self
            .run("hset", key, |mut conn| async move {
                conn.hset(key, field, wire).await
            })
            .await?;
        Ok(added > 0)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<StoredValue>> {
        let text: Option<String> = self
            .run("hget", key, |mut conn| async move { conn.hget(key, field).await })
            .await?;
        decode_field(key, text)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, StoredValue>> {
        let fields: HashMap<String, String> = self
            .run("hgetall", key, |mut conn| async move { conn.hgetall(key).await })
            .await?;
        fields
            .into_iter()
            .map(|(field, text)| Ok((field, StoredValue::from_wire(key, &text)?)))
            .collect()
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let removed: i64 = self
            .run("hdel", key, |mut conn| async move { conn.hdel(key, field).await })
            .await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<()> {
        let reply: String = self
            .run("ping", "", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        tracing::trace!(%reply, "Redis ping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_five_second_timeout() {
        let config = RedisConfig::new("redis://localhost:6379");
        assert_eq!(config.operation_timeout, Duration::from_secs(5));

        let config = config.with_operation_timeout(Duration::from_millis(250));
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
    }

    #[test]
    fn other_redis_errors_pass_through() {
        let err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        assert!(matches!(classify("k", err), KvError::Redis(_)));
    }

    #[tokio::test]
    async fn connect_to_unreachable_server_fails() {
        let config = RedisConfig::new("redis://127.0.0.1:1")
            .with_operation_timeout(Duration::from_millis(500));
        assert!(RedisKeyValueStore::connect(config).await.is_err());
    }
}
