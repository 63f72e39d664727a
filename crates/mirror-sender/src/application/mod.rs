//! Application layer use cases for the sender.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `mirror_core`) and the infrastructure (OS hooks, sockets).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal, here "mirror my
//!   input to that machine until I say stop".
//! - **Depend on abstractions** (`CaptureSource`, `TransportSink`) rather than
//!   concrete implementations, so tests can swap in mocks.
//!
//! # Sub-modules
//!
//! - **`sender_session`** – The initiator state machine and its async driver.

pub mod sender_session;
