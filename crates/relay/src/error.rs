use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Rejections produced by the validator and surfaced to the sender only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Message content cannot be empty.")]
    EmptyMessage,
    #[error("Message is too long. Maximum length is {max} characters.")]
    MessageTooLong { max: usize },
}

impl ValidationError {
    /// Wire code sent in the `error.code` field
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyMessage => "EMPTY_MESSAGE",
            ValidationError::MessageTooLong { .. } => "MESSAGE_TOO_LONG",
        }
    }
}

/// Failures of the external ordered-list store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum Error {
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Internal(msg) => {
                // Detail stays in the log, clients get the generic body.
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
