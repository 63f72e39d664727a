//! Infrastructure layer for the receiver application.
//!
//! Contains OS-facing adapters: input emulation, virtual desktop geometry,
//! the WebSocket listener and the approval bridge to the console.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `mirror_core`, but MUST NOT be imported by the domain layer.
//!
//! # Sub-modules
//!
//! - **`approval`** – [`approval::ChannelApprover`], which lets the blocking
//!   session thread ask the async console front-end for a decision.
//!
//! - **`input_emulation`** – OS-specific implementations of
//!   `PlatformInputEmulator`, selected at compile time with
//!   `#[cfg(target_os)]`.  A `MockInputEmulator` is also provided for tests.
//!
//! - **`network`** – WebSocket accept loop and per-connection tasks.
//!
//! - **`screen_info`** – The virtual desktop rectangle used to normalize mouse
//!   positions.

pub mod approval;
pub mod input_emulation;
pub mod network;
pub mod screen_info;
