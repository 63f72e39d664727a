//! Network infrastructure for the sender application.
//!
//! # Sub-modules
//!
//! - **`ws_client`** – Opens a WebSocket to the receiver and adapts it to the
//!   [`mirror_core::TransportSink`] / [`mirror_core::TransportEvent`] contract
//!   the session is written against.

use std::sync::Arc;

use mirror_core::{TransportEvent, TransportSink};
use tokio::sync::mpsc;

pub mod ws_client;

/// Both halves of one transport connection as seen by the session.
pub struct TransportPair {
    /// Outbound frames.
    pub sink: Arc<dyn TransportSink>,
    /// Inbound events, in arrival order.  Ends after `Closed` or `Error`.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportPair {
    pub fn new(
        sink: Arc<dyn TransportSink>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self { sink, events }
    }
}
