use serde::{Deserialize, Serialize};

/// A single chat message as stored in the buffer, the durable list and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: String,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Raw client frame before validation.
///
/// Every field is kept as an untyped JSON value since clients may send
/// anything; the validator decides what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundPayload {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

impl InboundPayload {
    /// Build a payload from any parsed JSON document.
    ///
    /// Non-object documents yield an empty payload.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Error body carried by an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Server to client frames on the real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    History { messages: Vec<Message> },
    Message { message: Message },
    Error { error: ErrorBody },
}

impl ServerFrame {
    pub fn to_json(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Query string of `GET /history`.
///
/// Kept as strings so that garbage input falls back to defaults instead of
/// being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Response body of `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub page: u32,
    pub limit: u32,
    pub messages: Vec<Message>,
}
