//! WebSocket listener: accept loop and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Accepting TCP connections on an already-bound listener.
//! 2. Upgrading each one to a WebSocket and giving it a fresh [`Uuid`].
//! 3. Reporting `Opened`, every text frame and the final close/error to the
//!    session thread as [`ServerInput`]s.
//! 4. Writing frames the session queues on the connection's sink.
//! 5. Stopping the accept loop as soon as shutdown is signalled or the
//!    session stops listening.
//!
//! The listener does not interpret frames at all; whether a connection is the
//! peer, a busy second sender or a stranger is decided by the session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use mirror_core::{TransportError, TransportEvent, TransportSink};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::receiver_session::{ConnectionId, ServerInput};

enum Outbound {
    Frame(String),
    Close,
}

/// Outbound half of one accepted connection.
pub struct ConnectionSink {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
}

impl TransportSink for ConnectionSink {
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

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections until `shutdown` turns `true` (or its sender is
/// dropped) or the session stops listening.
pub async fn run_listener(
    listener: TcpListener,
    inputs: mpsc::UnboundedSender<ServerInput>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening for senders on ws://{addr}");
    }

    if *shutdown.borrow() {
        return;
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutdown requested; closing listener");
                    break;
                }
            }
            _ = inputs.closed() => {
                info!("Receiver session ended; closing listener");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let id = Uuid::new_v4();
                    debug!("TCP connection {id} from {peer_addr}");
                    tokio::spawn(handle_connection(stream, peer_addr, id, inputs.clone()));
                }
                Err(e) => error!("accept error: {e}"),
            },
        }
    }
}

// ── Per-connection task ───────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: ConnectionId,
    inputs: mpsc::UnboundedSender<ServerInput>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {peer_addr} failed: {e}");
            return;
        }
    };
    info!("Sender connected from {peer_addr}");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let sink = Arc::new(ConnectionSink {
        tx: out_tx,
        closed: AtomicBool::new(false),
    });
    if inputs.send(ServerInput::Opened { id, sink }).is_err() {
        return;
    }

    let report = |event: TransportEvent| inputs.send(ServerInput::Transport { id, event }).is_ok();
    let (mut write, mut read) = ws.split();

    let final_event = loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(WsMessage::Text(text)).await {
                        break TransportEvent::Error(e.to_string());
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    break TransportEvent::Closed("closed by receiver".to_string());
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    if !report(TransportEvent::Message(text)) {
                        break TransportEvent::Closed("receiver stopped".to_string());
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    break TransportEvent::Closed("Sender disconnected".to_string());
                }
                Some(Ok(other)) => {
                    debug!("Ignoring non-text WebSocket frame from {peer_addr}: {other:?}");
                }
                Some(Err(e)) => break TransportEvent::Error(e.to_string()),
            },
        }
    };

    debug!("Connection {id} from {peer_addr} finished: {final_event:?}");
    let _ = report(final_event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_sink_send_after_close_fails() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ConnectionSink {
            tx,
            closed: AtomicBool::new(false),
        };

        // Act
        sink.send("a".to_string()).unwrap();
        sink.close();
        sink.close();

        // Assert
        assert_eq!(sink.send("b".to_string()), Err(TransportError::Closed));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Frame(f)) if f == "a"));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_listener_wakes_immediately_on_shutdown_signal() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (inputs, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_listener(listener, inputs, shutdown_rx));
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        // Act
        shutdown_tx.send_replace(true);
        let result = timeout(Duration::from_millis(50), task).await;

        // Assert
        assert!(result.is_ok(), "listener still accepting after shutdown");
    }

    #[tokio::test]
    async fn test_listener_exits_when_session_stops_listening() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (inputs, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_listener(listener, inputs, shutdown_rx));

        // Act
        drop(rx);

        // Assert
        assert!(timeout(Duration::from_millis(50), task).await.is_ok());
    }
}
