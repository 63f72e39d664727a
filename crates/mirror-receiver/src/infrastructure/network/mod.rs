//! Network infrastructure for the receiver application.
//!
//! # Sub-modules
//!
//! - **`ws_server`** – Accepts WebSocket connections, gives each one a
//!   [`uuid::Uuid`] and reports its lifecycle and frames to the session thread
//!   as [`crate::application::receiver_session::ServerInput`]s.

pub mod ws_server;
