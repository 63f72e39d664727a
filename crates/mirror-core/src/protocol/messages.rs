//! Control message types exchanged between sender and receiver.

use serde::{Deserialize, Serialize};

/// Reason sent with `reject` when the `connect` envelope does not decrypt.
pub const REJECT_INVALID_TOKEN: &str = "Invalid token";

/// Reason sent with `reject` when the receiver's operator refuses.
pub const REJECT_DENIED: &str = "Connection denied";

/// Reason sent with `reject` when another sender already holds the session.
pub const REJECT_BUSY: &str = "Session busy";

/// A single control frame.
///
/// Serialized as an internally tagged JSON object whose `type` field carries
/// the lowercase variant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Sender → receiver.  `d` is an envelope around a [`ConnectPayload`].
    Connect { d: String },
    /// Receiver → sender.  The connection was approved.
    Accept,
    /// Receiver → sender.  The connection was refused.
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Sender → receiver.  `d` is an envelope around a keyboard event record.
    Key { d: String },
    /// Sender → receiver.  `d` is an envelope around a mouse event record.
    Mouse { d: String },
    /// Either direction.  Stop forwarding input until `resume`.
    Pause,
    /// Either direction.
    Resume,
    /// Either direction.  The session is over.
    Disconnect,
}

impl ControlMessage {
    /// Returns the wire name of this message, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            ControlMessage::Connect { .. } => "connect",
            ControlMessage::Accept => "accept",
            ControlMessage::Reject { .. } => "reject",
            ControlMessage::Key { .. } => "key",
            ControlMessage::Mouse { .. } => "mouse",
            ControlMessage::Pause => "pause",
            ControlMessage::Resume => "resume",
            ControlMessage::Disconnect => "disconnect",
        }
    }

    /// Builds a `reject` frame carrying `reason`.
    pub fn reject(reason: impl Into<String>) -> Self {
        ControlMessage::Reject {
            reason: Some(reason.into()),
        }
    }
}

/// Plaintext sealed inside the `connect` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPayload {
    /// Display name of the sending machine.
    #[serde(rename = "pcName")]
    pub pc_name: String,
}
