//! mirror-receiver library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the receiver do? (for beginners)
//!
//! The *receiver* is the machine whose keyboard and mouse are being driven
//! remotely.  It:
//!
//! 1. Generates a short token and shows it to the person sitting in front of it.
//! 2. Listens for WebSocket connections from a sender.
//! 3. Opens the sender's `connect` envelope with the key derived from the token.
//!    A sender that typed the wrong token is rejected immediately.
//! 4. Asks the local operator to approve the named sender.
//! 5. Decrypts every `key` / `mouse` frame and replays it as real OS input
//!    (`SendInput` on Windows), until either side disconnects.

/// Application layer: the responder state machine and the replay use case.
pub mod application;

/// Infrastructure layer: OS adapters, approval prompt and the WebSocket listener.
pub mod infrastructure;
