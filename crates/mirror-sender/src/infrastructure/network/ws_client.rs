//! WebSocket client transport built on `tokio-tungstenite`.
//!
//! [`open`] returns immediately.  The connection is established on a
//! background task which reports [`TransportEvent::Open`] on success or
//! [`TransportEvent::Error`] on failure; frames queued before that are sent
//! once the socket is up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use mirror_core::{TransportError, TransportEvent, TransportSink};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use super::TransportPair;

enum Outbound {
    Frame(String),
    Close,
}

/// Outbound half of a client WebSocket.
pub struct WsClientSink {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
}

impl TransportSink for WsClientSink {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Outbound::Close);
        }
    }
}

/// Starts connecting to `url` (e.g. `ws://192.168.1.20:8765`).
///
/// Must be called from within a Tokio runtime.
pub fn open(url: &str) -> TransportPair {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_client(url.to_string(), out_rx, event_tx));

    TransportPair::new(
        Arc::new(WsClientSink {
            tx: out_tx,
            closed: AtomicBool::new(false),
        }),
        event_rx,
    )
}

async fn run_client(
    url: String,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!("WebSocket connect to {url} failed: {e}");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };
    info!("WebSocket connected to {url}");
    let _ = events.send(TransportEvent::Open);

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(WsMessage::Text(text)).await {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    let _ = events.send(TransportEvent::Closed("closed locally".to_string()));
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by peer".to_string());
                    let _ = events.send(TransportEvent::Closed(reason));
                    break;
                }
                Some(Ok(other)) => {
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol.
                    debug!("Ignoring non-text WebSocket frame: {other:?}");
                }
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed("connection ended".to_string()));
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_closed_port_reports_error() {
        // Arrange – port 1 on localhost is essentially never listening
        let mut pair = open("ws://127.0.0.1:1");

        // Act
        let event = pair.events.recv().await;

        // Assert
        assert!(matches!(event, Some(TransportEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let pair = open("ws://127.0.0.1:1");
        pair.sink.close();
        assert_eq!(pair.sink.send("x".to_string()), Err(TransportError::Closed));
    }
}
