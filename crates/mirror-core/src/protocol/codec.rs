//! JSON codec for control frames.
//!
//! Inbound frames come from an untrusted peer, so decoding never panics:
//! anything that is not a well-formed control message becomes a
//! [`ProtocolError`] and the caller drops that single frame.

use thiserror::Error;

use crate::protocol::messages::ControlMessage;

/// Errors that can occur while encoding or decoding a control frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame is not a JSON object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The frame is an object but has no string `type` field.
    #[error("frame has no type field")]
    MissingType,

    /// The `type` field names a message this build does not understand.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The `type` is known but its fields are wrong (e.g. `key` without `d`).
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: String, reason: String },

    /// The message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

const KNOWN_TYPES: [&str; 8] = [
    "connect",
    "accept",
    "reject",
    "key",
    "mouse",
    "pause",
    "resume",
    "disconnect",
];

/// Serializes `message` into a JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_message(message: &ControlMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Parses a JSON text frame into a [`ControlMessage`].
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing why the frame was refused.
pub fn decode_message(frame: &str) -> Result<ControlMessage, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(frame).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

    if !value.is_object() {
        return Err(ProtocolError::MalformedFrame("not a JSON object".to_string()));
    }

    let kind = match value.get("type").and_then(serde_json::Value::as_str) {
        Some(kind) => kind.to_string(),
        None => return Err(ProtocolError::MissingType),
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownMessageType(kind));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedPayload {
        kind,
        reason: e.to_string(),
    })
}
