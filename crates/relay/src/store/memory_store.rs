//! In-process list store
//!
//! Mirrors the Redis list commands the relay relies on. Used by tests and
//! for running the relay without a Redis server.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ListStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryListStore {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries under `key`
    pub fn len(&self, key: &str) -> usize {
        self.lists.lock().get(key).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }
}

/// Resolve `LRANGE` bounds against a list of `len` entries into a half-open
/// index range, or `None` when the slice is empty.
pub(crate) fn resolve_range(len: usize, start: isize, stop: isize) -> Option<std::ops::Range<usize>> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some(start as usize..stop as usize + 1)
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn push_trimmed(&self, key: &str, value: String, max_len: usize) -> Result<(), StoreError> {
        let mut lists = self.lists.lock();
        let list = lists.entry(key.to_string()).or_default();
        list.push_back(value);
        while list.len() > max_len {
            list.pop_front();
        }
        Ok(())
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let lists = self.lists.lock();
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(resolve_range(list.len(), start, stop)
            .map(|r| list.range(r).cloned().collect())
            .unwrap_or_default())
    }
}
