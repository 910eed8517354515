//! Message ingestion
//!
//! Owns the in-memory hydration buffer. Accepted messages go into the
//! buffer synchronously and onto a queue drained by a single persistence
//! worker, so the durable list sees messages in acceptance order and the
//! caller never waits on the store.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{InboundPayload, Message};
use crate::store::HistoryStore;
use crate::validator;

/// Default sender name for anonymous posts
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Capacity of the in-memory buffer
    pub buffer_size: usize,
    /// Max content length in characters
    pub max_content_len: usize,
    /// Messages that may wait for the persistence worker before new ones
    /// are dropped from the durable store
    pub persist_queue: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            max_content_len: 500,
            persist_queue: 1024,
        }
    }
}

pub struct MessageService {
    limits: Limits,
    buffer: Mutex<VecDeque<Message>>,
    persist_tx: mpsc::Sender<Message>,
}

impl MessageService {
    /// Hydrate the buffer from the durable store and start the persistence
    /// worker. An unreachable store leaves the buffer empty.
    pub async fn start(store: Arc<HistoryStore>, limits: Limits) -> (Arc<Self>, JoinHandle<()>) {
        let initial = store.recent(limits.buffer_size).await;
        info!(
            "MessageService initialized with {} messages in buffer",
            initial.len()
        );

        let (persist_tx, persist_rx) = mpsc::channel(limits.persist_queue.max(1));
        let worker = tokio::spawn(persistence_worker(store, persist_rx));

        let service = Arc::new(Self::with_buffer(limits, initial, persist_tx));
        (service, worker)
    }

    fn with_buffer(
        limits: Limits,
        initial: Vec<Message>,
        persist_tx: mpsc::Sender<Message>,
    ) -> Self {
        let mut buffer: VecDeque<Message> = initial.into();
        while buffer.len() > limits.buffer_size {
            buffer.pop_front();
        }
        Self {
            limits,
            buffer: Mutex::new(buffer),
            persist_tx,
        }
    }

    /// Validate `payload`, append the resulting message to the buffer and
    /// queue it for persistence.
    ///
    /// Rejected payloads leave the buffer and the durable store untouched.
    pub fn process_new_message(&self, payload: &InboundPayload) -> Result<Message, ValidationError> {
        let valid = validator::validate(payload, self.limits.max_content_len)?;

        let message = Message {
            id: valid.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user: valid.user.unwrap_or_else(|| ANONYMOUS.to_string()),
            content: valid.content,
            timestamp: valid.timestamp.unwrap_or_else(|| Utc::now().timestamp_millis()),
        };

        {
            let mut buffer = self.buffer.lock();
            buffer.push_back(message.clone());
            if buffer.len() > self.limits.buffer_size {
                buffer.pop_front();
            }
        }

        match self.persist_tx.try_send(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!(
                "Persistence queue full ({} pending), message {} kept in memory only",
                self.limits.persist_queue, message.id
            ),
            Err(TrySendError::Closed(_)) => warn!(
                "Persistence worker is gone, message {} kept in memory only",
                message.id
            ),
        }

        Ok(message)
    }

    /// Copy of the buffer, oldest first
    pub fn get_in_memory_history(&self) -> Vec<Message> {
        self.buffer.lock().iter().cloned().collect()
    }
}

/// Drain the persistence queue until every sender is dropped.
async fn persistence_worker(store: Arc<HistoryStore>, mut rx: mpsc::Receiver<Message>) {
    while let Some(message) = rx.recv().await {
        store.append(&message).await;
    }
    info!("Persistence worker stopped");
}
