//! # mirror-core
//!
//! Shared library for InputMirror containing the envelope cryptography, the
//! control-message and input-event codecs, the coordinate normalizer, the
//! session state model and the lifecycle primitives.
//!
//! This crate is used by both the sender and the receiver applications.
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! InputMirror lets one machine (the *sender*) mirror its keyboard and mouse
//! to a second machine (the *receiver*).  The sender opens a WebSocket to the
//! receiver, proves it knows a short shared token, waits for a human on the
//! receiver side to approve the connection, and then streams every captured
//! input event as an encrypted message.
//!
//! This crate (`mirror-core`) is the shared foundation.  It defines:
//!
//! - **`crypto`** – Token generation, PBKDF2 key derivation and the
//!   AES-256-GCM envelope (`nonce ‖ tag ‖ ciphertext`, base64 encoded).
//!
//! - **`protocol`** – The JSON control messages exchanged over the socket,
//!   the compact input-event record carried inside `key`/`mouse` envelopes,
//!   and the transport contract both roles are written against.
//!
//! - **`domain`** – Pure logic with no OS dependencies: the absolute-pointer
//!   coordinate normalizer and the session state machine model.
//!
//! - **`lifecycle`** – Atomic flags, event counters and the mouse-move
//!   throttle shared between capture threads and the session core.

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mirror_core::DerivedKey` instead of `mirror_core::crypto::key::DerivedKey`.
pub use crypto::envelope::{decrypt, encrypt, try_encrypt};
pub use crypto::key::{derive_key, DerivedKey};
pub use crypto::token::{generate_token, normalize_token_input, validate_token};
pub use crypto::CryptoError;
pub use config::{load_config, save_config, ConfigError, MirrorConfig};
pub use domain::geometry::{normalize, ScreenGeometry};
pub use domain::session::{Origin, Role, SessionState, SessionStatus};
pub use error::SessionError;
pub use lifecycle::{EventCounter, EventCounts, MouseMoveThrottle, SessionFlags};
pub use protocol::event::{
    deserialize_event, serialize_event, DecodedEvent, InputEvent, InputEventKind, MouseButton,
};
pub use protocol::messages::{ConnectPayload, ControlMessage};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::transport::{RecordingSink, SinkOp, TransportError, TransportEvent, TransportSink};
