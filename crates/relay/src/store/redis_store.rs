//! Redis-backed list store
//!
//! Append and trim go out as one `MULTI`/`EXEC` pipeline so concurrent
//! appends never interleave between `RPUSH` and `LTRIM`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::info;

use super::ListStore;
use crate::error::StoreError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisListStore {
    client: redis::Client,
    /// Established on first use; retried on every call until it succeeds
    conn: OnceCell<ConnectionManager>,
}

impl RedisListStore {
    /// Create a store for `redis_url`. No connection is made yet, so an
    /// unreachable server is not an error here.
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(CONNECT_TIMEOUT);
                let manager =
                    ConnectionManager::new_with_config(self.client.clone(), config).await?;
                info!("Connected to Redis");
                Ok::<_, StoreError>(manager)
            })
            .await?;
        Ok(conn.clone())
    }
}

/// `LTRIM` bounds keeping the newest `max_len` entries. `-0` would be the
/// head, so zero gets an empty range instead.
fn trim_bounds(max_len: usize) -> (isize, isize) {
    if max_len == 0 {
        (1, 0)
    } else {
        (-(max_len.min(isize::MAX as usize) as isize), -1)
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn push_trimmed(&self, key: &str, value: String, max_len: usize) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let (keep_from, keep_to) = trim_bounds(max_len);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .rpush(key, value)
            .ignore()
            .ltrim(key, keep_from, keep_to)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        let items: Vec<String> = conn.lrange(key, start, stop).await?;
        Ok(items)
    }
}
