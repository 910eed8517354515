//! Live connection set and broadcast fan-out

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::{debug, warn};

pub type ConnectionId = u64;

/// Frames a connection may have queued before it is treated as stale
pub const OUTBOUND_CAPACITY: usize = 256;

/// Lifecycle of one connection: `Connecting -> Open -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Outbound side of one connection.
///
/// Frames are queued and written by the connection's own writer task, so
/// sending never waits on a socket. A connection whose queue fills up is
/// closed instead of buffering without bound.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Utf8Bytes>,
    state: Arc<AtomicU8>,
    closed: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id,
            tx,
            state: Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)),
            closed: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.tx.is_closed()
    }

    /// `Connecting -> Open`. A closed connection stays closed.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                ConnectionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed` and wake whoever waits in [`closed`](Self::closed).
    pub fn close(&self) {
        let prev = self.state.swap(ConnectionState::Closed as u8, Ordering::AcqRel);
        if prev != ConnectionState::Closed as u8 {
            self.closed.notify_one();
        }
    }

    /// Resolves once the connection has been closed.
    pub async fn closed(&self) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        self.closed.notified().await;
    }

    /// Queue a frame; returns false if the connection is not open.
    pub fn send(&self, frame: Utf8Bytes) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Connection {} has {} frames queued, closing it",
                    self.id, OUTBOUND_CAPACITY
                );
                self.close();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, conn: ConnectionHandle) {
        debug!("Registering connection {}", conn.id);
        self.connections.write().insert(conn.id, conn);
    }

    pub fn unregister(&self, id: ConnectionId) {
        if let Some(conn) = self.connections.write().remove(&id) {
            conn.close();
            debug!("Unregistered connection {}", id);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `frame` to every open connection and return how many got it.
    ///
    /// Works on a snapshot of the set; connections that are not open are
    /// skipped without error.
    pub fn broadcast(&self, frame: impl Into<Utf8Bytes>) -> usize {
        let frame = frame.into();
        let snapshot: Vec<ConnectionHandle> = self.connections.read().values().cloned().collect();

        snapshot
            .iter()
            .filter(|conn| conn.send(frame.clone()))
            .count()
    }
}
