//! Relay server configuration

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::registry::ConnectionRegistry;
use crate::service::MessageService;
use crate::store::HistoryStore;

/// Which list store backs the durable history
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Configuration for the chat relay
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,
    /// Redis connection URL for the durable history
    pub redis_url: String,
    /// Redis list key holding the history
    pub history_key: String,
    /// Durable store implementation
    pub store_backend: StoreBackend,
    /// Messages kept in memory for hydration
    pub buffer_size: usize,
    /// Messages retained by the durable list
    pub max_history: usize,
    /// Max content length in characters
    pub max_content_len: usize,
    /// Accepted messages that may wait for persistence
    pub persist_queue: usize,
    /// Upper bound for `limit` on paginated reads
    pub max_page_size: u32,
    /// `limit` used when the client sends none
    pub default_page_size: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let host = std::env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env_or("RELAY_PORT", 8081);
        let bind_addr = SocketAddr::from_str(&format!("{}:{}", host, port)).unwrap_or_else(|e| {
            warn!("Invalid RELAY_HOST {:?} ({}), binding 0.0.0.0", host, e);
            SocketAddr::from(([0, 0, 0, 0], port))
        });

        let store_backend = match std::env::var("RELAY_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("redis") | Err(_) => StoreBackend::Redis,
            Ok(other) => {
                warn!("Unknown RELAY_STORE {:?}, using redis", other);
                StoreBackend::Redis
            }
        };

        Self {
            bind_addr,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            history_key: std::env::var("HISTORY_KEY")
                .unwrap_or_else(|_| "chat:history".to_string()),
            store_backend,
            buffer_size: 10,
            max_history: 1000,
            max_content_len: 500,
            persist_queue: 1024,
            max_page_size: 50,
            default_page_size: 10,
        }
    }
}

impl RelayConfig {
    /// Limits handed to the message service
    pub fn limits(&self) -> crate::service::Limits {
        crate::service::Limits {
            buffer_size: self.buffer_size,
            max_content_len: self.max_content_len,
            persist_queue: self.persist_queue,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub service: Arc<MessageService>,
    pub registry: Arc<ConnectionRegistry>,
    pub history: Arc<HistoryStore>,
    /// Held across accept + broadcast so every connection sees acceptance order
    pub sequencer: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: RelayConfig, service: Arc<MessageService>, history: Arc<HistoryStore>) -> Self {
        Self {
            config,
            service,
            registry: Arc::new(ConnectionRegistry::new()),
            history,
            sequencer: Arc::new(Mutex::new(())),
        }
    }
}
