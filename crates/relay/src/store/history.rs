//! Durable message history
//!
//! Messages are kept as JSON strings in a single list, oldest first, capped
//! at `max_history` entries. Nothing in here returns an error: failed writes
//! are logged and dropped, failed reads come back empty.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::ListStore;
use crate::models::Message;

pub struct HistoryStore {
    list: Arc<dyn ListStore>,
    key: String,
    max_history: usize,
}

impl HistoryStore {
    pub fn new(list: Arc<dyn ListStore>, key: impl Into<String>, max_history: usize) -> Self {
        Self {
            list,
            key: key.into(),
            max_history,
        }
    }

    /// Append `message` to the tail and trim the list to the newest
    /// `max_history` entries.
    pub async fn append(&self, message: &Message) {
        let encoded = match serde_json::to_string(message) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode message {}: {}", message.id, e);
                return;
            }
        };

        match self
            .list
            .push_trimmed(&self.key, encoded, self.max_history)
            .await
        {
            Ok(()) => debug!("Persisted message {}", message.id),
            Err(e) => error!("Failed to persist message {}: {}", message.id, e),
        }
    }

    /// Read the inclusive slice `[start, end]` addressed from the tail
    /// (-1 is the newest message), oldest first.
    pub async fn range_read(&self, start: isize, end: isize) -> Vec<Message> {
        let raw = match self.list.range(&self.key, start, end).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to read history range [{}, {}]: {}", start, end, e);
                return Vec::new();
            }
        };

        raw.iter()
            .filter_map(|entry| match serde_json::from_str::<Message>(entry) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping undecodable history entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// The `n` newest messages, oldest first
    pub async fn recent(&self, n: usize) -> Vec<Message> {
        if n == 0 {
            return Vec::new();
        }
        self.range_read(-(n as isize), -1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryListStore;
    use async_trait::async_trait;

    struct DownStore;

    #[async_trait]
    impl ListStore for DownStore {
        async fn push_trimmed(&self, _key: &str, _value: String, _max_len: usize) -> Result<(), StoreError> {
            Err(StoreError::Connection("connection refused".into()))
        }

        async fn range(&self, _key: &str, _start: isize, _stop: isize) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Connection("connection refused".into()))
        }
    }

    fn message(i: usize) -> Message {
        Message {
            id: format!("id-{}", i),
            user: "A".into(),
            content: format!("msg {}", i),
            timestamp: i as i64,
        }
    }

    #[tokio::test]
    async fn test_append_trims_to_max_history() {
        let list = Arc::new(MemoryListStore::new());
        let store = HistoryStore::new(list.clone(), "chat:history", 5);
        for i in 0..8 {
            store.append(&message(i)).await;
        }

        assert_eq!(list.len("chat:history"), 5);
        let all = store.range_read(0, -1).await;
        let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["id-3", "id-4", "id-5", "id-6", "id-7"]);
    }

    #[tokio::test]
    async fn test_recent_is_oldest_first() {
        let store = HistoryStore::new(Arc::new(MemoryListStore::new()), "k", 100);
        for i in 0..20 {
            store.append(&message(i)).await;
        }

        let recent = store.recent(3).await;
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["id-17", "id-18", "id-19"]);
        assert!(store.recent(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let store = HistoryStore::new(Arc::new(DownStore), "k", 10);
        store.append(&message(1)).await;
        assert!(store.range_read(0, -1).await.is_empty());
        assert!(store.recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entries_are_skipped() {
        let list = Arc::new(MemoryListStore::new());
        list.push_trimmed("k", "not json".into(), 10).await.unwrap();
        let store = HistoryStore::new(list, "k", 10);
        store.append(&message(1)).await;

        let all = store.range_read(0, -1).await;
        assert_eq!(all, vec![message(1)]);
    }
}
