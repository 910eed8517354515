//! Inbound payload validation
//!
//! Pure normalization of a raw client payload. Lengths are counted in
//! Unicode scalar values, after trimming. Trimming strips Unicode white
//! space and the byte order mark U+FEFF.

use serde_json::Value;

use crate::error::ValidationError;
use crate::models::InboundPayload;

/// A payload that passed validation, not yet turned into a [`Message`](crate::models::Message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayload {
    /// Trimmed sender name; `None` when absent or blank
    pub user: Option<String>,
    /// Trimmed, non-empty content
    pub content: String,
    /// Client-supplied id, if usable
    pub id: Option<String>,
    /// Client-supplied timestamp in ms, if usable
    pub timestamp: Option<i64>,
}

pub fn validate(
    payload: &InboundPayload,
    max_content_len: usize,
) -> Result<ValidatedPayload, ValidationError> {
    let content = trimmed_string(payload.content.as_ref()).ok_or(ValidationError::EmptyMessage)?;

    if content.chars().count() > max_content_len {
        return Err(ValidationError::MessageTooLong {
            max: max_content_len,
        });
    }

    Ok(ValidatedPayload {
        user: trimmed_string(payload.user.as_ref()),
        content,
        id: client_id(payload.id.as_ref()),
        timestamp: client_timestamp(payload.timestamp.as_ref()),
    })
}

/// Trimmed string value, `None` for non-strings and blank strings
fn trimmed_string(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim_matches(is_blank);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn client_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn client_timestamp(value: Option<&Value>) -> Option<i64> {
    let ts = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        _ => return None,
    };
    (ts > 0).then_some(ts)
}
