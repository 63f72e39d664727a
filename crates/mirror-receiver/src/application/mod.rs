//! Application layer use cases for the receiver.
//!
//! # What use cases does the receiver have?
//!
//! - **`replay_input`** – Turns a decoded [`mirror_core::InputEvent`] into OS
//!   input.  Mouse moves are mapped onto the virtual desktop first.  The OS
//!   call itself is made by a `PlatformInputEmulator` implementation injected
//!   at construction time.
//!
//! - **`receiver_session`** – The responder side of the protocol: token check,
//!   operator approval, the single active peer, pause/resume and shutdown.

pub mod receiver_session;
pub mod replay_input;
