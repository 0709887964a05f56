use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use super::{KvKey, KvListResult, KvStore};
use crate::config::RedisConfig;
use crate::errors::Result;

/// Redis-backed [`KvStore`].
///
/// Every key is namespaced with `key_prefix`; the prefix is stripped again
/// when listing, so callers only ever see their own key names.
pub struct RedisKvStore {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: RwLock<Option<MultiplexedConnection>>,
    key_prefix: String,
    scan_count: usize,
}

impl RedisKvStore {
    /// Open the client and check the server answers `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.clone())?;
        let store = Self {
            client,
            connection: RwLock::new(None),
            key_prefix: config.key_prefix.clone(),
            scan_count: config.scan_count.max(1),
        };

        let mut conn = store.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(
            "Redis store ready (prefix: '{}', ping: {})",
            store.key_prefix, pong
        );

        Ok(store)
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset due to error");
    }

    /// Run `op` on the shared connection, dropping the connection on failure
    /// so the next call reconnects.
    async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = redis::RedisResult<T>>,
    {
        let conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return Err(e.into());
            }
        };

        match op(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("Redis command failed: {}", e);
                if e.is_io_error() || e.is_connection_dropped() {
                    self.reset_connection().await;
                }
                Err(e.into())
            }
        }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn match_pattern(&self) -> String {
        format!("{}*", escape_glob(&self.key_prefix))
    }
}

/// Escape Redis glob metacharacters so the prefix matches literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let redis_key = self.make_key(key);
        trace!("Redis GET {}", redis_key);
        self.with_connection(|mut conn| async move { conn.get(&redis_key).await })
            .await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let redis_key = self.make_key(key);
        let value = value.to_string();
        trace!("Redis SET {}", redis_key);
        self.with_connection(|mut conn| async move { conn.set(&redis_key, value).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let redis_key = self.make_key(key);
        trace!("Redis DEL {}", redis_key);
        self.with_connection(|mut conn| async move { conn.del(&redis_key).await })
            .await
    }

    async fn list(&self, cursor: Option<&str>) -> Result<KvListResult> {
        let cursor = cursor.unwrap_or("0").to_string();
        let pattern = self.match_pattern();
        let count = self.scan_count;

        let (next, raw_keys): (String, Vec<String>) = self
            .with_connection(|mut conn| async move {
                redis::cmd("SCAN")
                    .arg(&cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        let keys = raw_keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.key_prefix).map(KvKey::new))
            .collect();
        let list_complete = next == "0";

        Ok(KvListResult {
            keys,
            list_complete,
            cursor: (!list_complete).then_some(next),
        })
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
