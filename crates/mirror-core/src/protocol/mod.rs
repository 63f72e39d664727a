//! Protocol module containing control messages, the input-event record and
//! the transport contract.
//!
//! Every frame on the wire is a JSON text message:
//!
//! ```text
//! {"type": "connect" | "accept" | "reject" | "key" | "mouse"
//!        | "pause" | "resume" | "disconnect",
//!  "d": "<base64 envelope>",      // connect, key, mouse
//!  "reason": "<text>"}            // reject (optional)
//! ```
//!
//! The `type` tag travels in clear; everything sensitive sits inside `d`.

pub mod codec;
pub mod event;
pub mod messages;
pub mod transport;

pub use codec::{decode_message, encode_message, ProtocolError};
pub use event::{deserialize_event, serialize_event, DecodedEvent, InputEvent, InputEventKind, MouseButton};
pub use messages::{ConnectPayload, ControlMessage};
pub use transport::{TransportError, TransportEvent, TransportSink};
