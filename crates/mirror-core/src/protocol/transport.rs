//! Transport contract shared by both roles.
//!
//! The session cores never touch sockets.  They receive [`TransportEvent`]s
//! from whatever carries the frames and write back through a
//! [`TransportSink`].  The WebSocket adapters live in the application crates;
//! [`RecordingSink`] is an in-memory sink for tests and diagnostics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;

/// Something that happened on a transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and frames may be sent.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The connection closed, cleanly or not.
    Closed(String),
    /// The connection failed.
    Error(String),
}

/// Errors returned by [`TransportSink::send`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is already closed.
    #[error("transport is closed")]
    Closed,

    /// The frame could not be handed to the transport.
    #[error("send failed: {0}")]
    Send(String),

    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),
}

/// Outbound half of a transport connection.
pub trait TransportSink: Send + Sync {
    /// Queues one text frame for delivery, in order.
    fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Closes the connection.  Idempotent.
    fn close(&self);
}

/// One call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOp {
    Send(String),
    Close,
}

/// A [`TransportSink`] that records every call in order.
///
/// Sends after `close()` fail with [`TransportError::Closed`] and are not
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ops: Mutex<Vec<SinkOp>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded operations, oldest first.
    pub fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Only the frames that were sent, oldest first.
    pub fn frames(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SinkOp::Send(frame) => Some(frame),
                SinkOp::Close => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, op: SinkOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

impl TransportSink for RecordingSink {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.record(SinkOp::Send(frame));
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.record(SinkOp::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_preserves_order() {
        // Arrange
        let sink = RecordingSink::new();

        // Act
        sink.send("a".into()).unwrap();
        sink.send("b".into()).unwrap();
        sink.close();

        // Assert
        assert_eq!(
            sink.ops(),
            vec![SinkOp::Send("a".into()), SinkOp::Send("b".into()), SinkOp::Close]
        );
    }

    #[test]
    fn test_send_after_close_fails() {
        let sink = RecordingSink::new();
        sink.close();
        assert_eq!(sink.send("late".into()), Err(TransportError::Closed));
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let sink = RecordingSink::new();
        sink.close();
        sink.close();
        assert_eq!(sink.ops(), vec![SinkOp::Close]);
    }
}
