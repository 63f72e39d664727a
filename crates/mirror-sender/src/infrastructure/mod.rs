//! Infrastructure layer for the sender application.
//!
//! Contains OS-facing adapters: input capture hooks, the WebSocket client
//! transport and the machine identity provider.
//!
//! **Dependency rule**: this layer may depend on `mirror_core`, but MUST NOT
//! be imported by the domain layer.

pub mod identity;
pub mod input_capture;
pub mod network;
