#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chat_relay::config::{AppState, RelayConfig, StoreBackend};
use chat_relay::models::ServerFrame;
use chat_relay::store::MemoryListStore;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const KEY: &str = "chat:history";

pub fn test_config() -> RelayConfig {
    RelayConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        history_key: KEY.to_string(),
        store_backend: StoreBackend::Memory,
        ..RelayConfig::default()
    }
}

pub async fn test_state() -> (AppState, Arc<MemoryListStore>) {
    let list = Arc::new(MemoryListStore::new());
    let (state, _worker) = chat_relay::build_state(test_config(), list.clone()).await;
    (state, list)
}

/// Serve the relay on an ephemeral loopback port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, chat_relay::app(state)).await.unwrap();
    });
    addr
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

pub async fn send_raw(client: &mut Client, raw: &str) {
    client.send(Message::text(raw.to_string())).await.unwrap();
}

/// Next server frame, failing the test after a few seconds.
pub async fn next_frame(client: &mut Client) -> ServerFrame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// True if no frame arrives within `wait`.
pub async fn stays_silent(client: &mut Client, wait: Duration) -> bool {
    tokio::time::timeout(wait, client.next()).await.is_err()
}

/// Connect and consume the hydration frame.
pub async fn connect_hydrated(addr: SocketAddr) -> (Client, Vec<chat_relay::models::Message>) {
    let mut client = connect(addr).await;
    match next_frame(&mut client).await {
        ServerFrame::History { messages } => (client, messages),
        other => panic!("expected history frame, got {:?}", other),
    }
}
