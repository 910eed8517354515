//! Durable history storage
//!
//! The external ordered-list service is abstracted behind [`ListStore`];
//! [`HistoryStore`] layers message encoding and the never-propagate failure
//! policy on top of it.

pub mod history;
pub mod memory_store;
pub mod redis_store;

use async_trait::async_trait;

use crate::error::StoreError;

pub use history::HistoryStore;
pub use memory_store::MemoryListStore;
pub use redis_store::RedisListStore;

/// An ordered-list key/value service with Redis list semantics.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Append `value` to the tail of `key` and keep only the last `max_len`
    /// entries, as one atomic step.
    async fn push_trimmed(&self, key: &str, value: String, max_len: usize) -> Result<(), StoreError>;

    /// Inclusive slice `[start, stop]` of `key` using `LRANGE` indexing:
    /// negative indices count from the tail (-1 is the newest entry) and
    /// out-of-range bounds are clamped.
    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError>;
}
