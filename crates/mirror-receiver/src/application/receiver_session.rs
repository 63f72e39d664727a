//! ReceiverSession: the responder side of the mirroring protocol.
//!
//! # How the receiver works (for beginners)
//!
//! The WebSocket listener may hold several connections at once (a sender that
//! is connecting while another one is already mirroring, a stale socket that
//! has not noticed it was closed, ...), but only one of them can be the
//! **peer**: the connection whose `connect` decrypted under our key and was
//! approved by the operator.  Input frames from anyone else are ignored.
//!
//! All connections report to one dedicated OS thread, `mirror-session`, via a
//! single [`ServerInput`] channel.  That thread owns the [`ReceiverSession`]
//! and applies inputs strictly one at a time:
//!
//! ```text
//!  connection task A ─┐
//!  connection task B ─┼─► mpsc<ServerInput> ─► ReceiverSession::handle() ─► ReplaySink
//!  ReceiverHandle   ──┘                                 │
//!                                                       └─► Approver (may block)
//! ```
//!
//! Approval is a blocking call made on that thread.  While the operator is
//! deciding, every other input simply waits in the queue, so a second sender
//! cannot sneak in between the token check and the decision.
//!
//! # States
//!
//! `Idle` (listening, no peer) → `Connecting` (opening the `connect` envelope)
//! → `AwaitingApproval` → `Active` ⇄ `Paused` → back to `Idle` when the peer
//! leaves, or `Closed` on shutdown.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::JoinHandle;

use mirror_core::protocol::messages::{REJECT_BUSY, REJECT_DENIED, REJECT_INVALID_TOKEN};
use mirror_core::{
    decode_message, decrypt, deserialize_event, encode_message, ConnectPayload, ControlMessage,
    DerivedKey, EventCounter, EventCounts, Origin, SessionError, SessionFlags, SessionState,
    SessionStatus, TransportEvent, TransportSink,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::replay_input::ReplaySink;

/// Identifies one accepted WebSocket connection.
pub type ConnectionId = Uuid;

/// Everything the session thread reacts to.
pub enum ServerInput {
    /// A connection completed its WebSocket handshake.
    Opened {
        id: ConnectionId,
        sink: Arc<dyn TransportSink>,
    },
    /// Something happened on an opened connection.
    Transport {
        id: ConnectionId,
        event: TransportEvent,
    },
    /// A request from the local operator.
    Command(ReceiverCommand),
}

/// Requests from the local operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverCommand {
    Pause,
    Resume,
    Shutdown,
}

/// Decides whether a sender that presented the right token may mirror.
///
/// Called on the session thread and allowed to block for as long as the
/// operator needs.
#[cfg_attr(test, mockall::automock)]
pub trait Approver: Send + Sync {
    fn approve(&self, pc_name: &str) -> bool;
}

impl<F> Approver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn approve(&self, pc_name: &str) -> bool {
        self(pc_name)
    }
}

/// The approved connection.
struct PeerHandle {
    id: ConnectionId,
    pc_name: String,
    sink: Arc<dyn TransportSink>,
}

/// The responder state machine.
pub struct ReceiverSession {
    key: DerivedKey,
    approver: Arc<dyn Approver>,
    replay: Arc<dyn ReplaySink>,
    status_tx: mpsc::UnboundedSender<SessionStatus>,
    connections: HashMap<ConnectionId, Arc<dyn TransportSink>>,
    peer: Option<PeerHandle>,
    state: SessionState,
    flags: Arc<SessionFlags>,
    counters: Arc<EventCounter>,
}

impl ReceiverSession {
    /// Creates a listening session.  `key` is derived from the token shown to
    /// the operator and is used for every connection attempt.
    pub fn new(
        key: DerivedKey,
        approver: Arc<dyn Approver>,
        replay: Arc<dyn ReplaySink>,
        status_tx: mpsc::UnboundedSender<SessionStatus>,
    ) -> Self {
        let flags = Arc::new(SessionFlags::new());
        flags.set_running(true);
        Self {
            key,
            approver,
            replay,
            status_tx,
            connections: HashMap::new(),
            peer: None,
            state: SessionState::Idle,
            flags,
            counters: Arc::new(EventCounter::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> Arc<SessionFlags> {
        Arc::clone(&self.flags)
    }

    pub fn counters(&self) -> Arc<EventCounter> {
        Arc::clone(&self.counters)
    }

    /// Display name of the current peer, if any.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer.as_ref().map(|p| p.pc_name.as_str())
    }

    /// Applies one input.  Returns `Break` once the session is closed.
    pub fn handle(&mut self, input: ServerInput) -> ControlFlow<()> {
        if self.state == SessionState::Closed {
            if let ServerInput::Opened { sink, .. } = input {
                sink.close();
            }
            return ControlFlow::Break(());
        }

        match input {
            ServerInput::Opened { id, sink } => {
                debug!("Connection {id} opened");
                self.connections.insert(id, sink);
            }
            ServerInput::Transport { id, event } => match event {
                TransportEvent::Open => {}
                TransportEvent::Message(text) => self.on_frame(id, &text),
                TransportEvent::Closed(reason) | TransportEvent::Error(reason) => {
                    self.on_connection_lost(id, reason);
                }
            },
            ServerInput::Command(command) => self.on_command(command),
        }

        if self.state == SessionState::Closed {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    // ── Frames ────────────────────────────────────────────────────────────────

    fn on_frame(&mut self, id: ConnectionId, text: &str) {
        let message = match decode_message(text) {
            Ok(m) => m,
            Err(e) => {
                warn!("Dropping malformed frame from {id}: {e}");
                return;
            }
        };

        if let ControlMessage::Connect { d } = &message {
            self.on_connect(id, d);
            return;
        }

        if !self.is_peer(id) {
            debug!("Ignoring {} from non-peer connection {id}", message.type_name());
            return;
        }

        match message {
            ControlMessage::Key { d } | ControlMessage::Mouse { d } => self.on_input(&d),
            ControlMessage::Pause if self.state == SessionState::Active => {
                self.set_paused(true);
                info!("Paused by sender");
                self.notify(SessionStatus::Paused(Origin::Peer));
            }
            ControlMessage::Resume if self.state == SessionState::Paused => {
                self.set_paused(false);
                info!("Resumed by sender");
                self.notify(SessionStatus::Resumed(Origin::Peer));
            }
            ControlMessage::Pause | ControlMessage::Resume => {
                debug!("Ignoring pause/resume in state {}", self.state);
            }
            ControlMessage::Disconnect => {
                info!("Sender disconnected gracefully");
                if let Some(peer) = self.release_peer() {
                    peer.sink.close();
                }
                self.notify(SessionStatus::Disconnected("Sender disconnected".to_string()));
            }
            other => warn!("Sender sent unexpected {} frame", other.type_name()),
        }
    }

    fn on_connect(&mut self, id: ConnectionId, envelope: &str) {
        if self.is_peer(id) {
            debug!("Ignoring repeated connect from the current peer {id}");
            return;
        }
        if self.peer.is_some() {
            info!("Rejecting connection {id}: a session is already active");
            self.reject_and_close(id, REJECT_BUSY);
            return;
        }

        self.state = SessionState::Connecting;
        self.notify(SessionStatus::Connecting);

        let Some(pc_name) = self.open_connect_envelope(envelope) else {
            warn!("Invalid token from connection {id}; rejecting");
            self.reject_and_close(id, REJECT_INVALID_TOKEN);
            self.state = SessionState::Idle;
            self.notify(SessionStatus::Rejected(REJECT_INVALID_TOKEN.to_string()));
            return;
        };

        self.state = SessionState::AwaitingApproval;
        self.notify(SessionStatus::Authenticating);
        info!("Connection request from {pc_name:?}");

        if !self.approver.approve(&pc_name) {
            info!("Connection from {pc_name:?} denied by operator");
            self.reject_and_close(id, REJECT_DENIED);
            self.state = SessionState::Idle;
            self.notify(SessionStatus::Rejected(REJECT_DENIED.to_string()));
            return;
        }

        let Some(sink) = self.connections.get(&id).cloned() else {
            info!("Connection {id} vanished during approval");
            self.state = SessionState::Idle;
            return;
        };

        self.state = SessionState::Active;
        self.flags.set_connected(true);
        self.flags.set_paused(false);
        self.counters.reset();
        if let Err(e) = send(sink.as_ref(), &ControlMessage::Accept) {
            debug!("Accept not delivered to {id}: {e}");
        }
        self.peer = Some(PeerHandle { id, pc_name, sink });
        info!("Connection accepted");
        self.notify(SessionStatus::Accepted);
    }

    /// Decrypts the `connect` envelope and extracts the sender's name.
    ///
    /// Any failure (wrong key, tampering, bad JSON) is reported as `None`;
    /// all of them mean "this sender does not know the token".
    fn open_connect_envelope(&self, envelope: &str) -> Option<String> {
        let plaintext = decrypt(&self.key, envelope).ok()?;
        let payload: ConnectPayload = serde_json::from_slice(&plaintext).ok()?;
        Some(payload.pc_name)
    }

    fn on_input(&mut self, envelope: &str) {
        if self.state != SessionState::Active {
            self.counters.record_dropped();
            return;
        }

        let plaintext = match decrypt(&self.key, envelope) {
            Ok(p) => p,
            Err(e) => {
                debug!("Dropping undecryptable input frame: {e}");
                self.counters.record_dropped();
                return;
            }
        };
        let Some(event) = deserialize_event(&plaintext).into_valid() else {
            debug!("Dropping invalid event record");
            self.counters.record_dropped();
            return;
        };

        self.counters.record_received();
        if let Err(e) = self.replay.replay(&event) {
            let e = SessionError::from(e);
            debug!("{e}");
            self.counters.record_replay_failure();
        }
    }

    fn on_connection_lost(&mut self, id: ConnectionId, reason: String) {
        self.connections.remove(&id);
        if !self.is_peer(id) {
            debug!("Connection {id} closed: {reason}");
            return;
        }
        info!("Sender connection lost: {reason}");
        self.release_peer();
        self.notify(SessionStatus::Disconnected(reason));
    }

    // ── Local commands ────────────────────────────────────────────────────────

    fn on_command(&mut self, command: ReceiverCommand) {
        match command {
            ReceiverCommand::Pause if self.state == SessionState::Active => {
                self.set_paused(true);
                self.send_to_peer(&ControlMessage::Pause);
                self.notify(SessionStatus::Paused(Origin::Local));
            }
            ReceiverCommand::Resume if self.state == SessionState::Paused => {
                self.set_paused(false);
                self.send_to_peer(&ControlMessage::Resume);
                self.notify(SessionStatus::Resumed(Origin::Local));
            }
            ReceiverCommand::Pause | ReceiverCommand::Resume => {
                debug!("Ignoring local pause/resume in state {}", self.state);
            }
            ReceiverCommand::Shutdown => self.shutdown(),
        }
    }

    /// Notifies the peer, closes every connection and enters `Closed`.
    fn shutdown(&mut self) {
        info!("Shutting down receiver session");
        self.state = SessionState::Closing;

        if let Some(peer) = self.peer.take() {
            if let Err(e) = send(peer.sink.as_ref(), &ControlMessage::Disconnect) {
                debug!("Best-effort disconnect not delivered: {e}");
            }
        }
        for (_, sink) in self.connections.drain() {
            sink.close();
        }

        self.flags.set_connected(false);
        self.flags.set_paused(false);
        self.flags.set_running(false);
        self.state = SessionState::Closed;
        self.notify(SessionStatus::Disconnected("Receiver shut down".to_string()));
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn is_peer(&self, id: ConnectionId) -> bool {
        self.peer.as_ref().is_some_and(|p| p.id == id)
    }

    fn set_paused(&mut self, paused: bool) {
        self.flags.set_paused(paused);
        self.state = if paused {
            SessionState::Paused
        } else {
            SessionState::Active
        };
    }

    /// Forgets the peer and returns to `Idle`, ready for the next `connect`.
    fn release_peer(&mut self) -> Option<PeerHandle> {
        let peer = self.peer.take();
        self.flags.set_connected(false);
        self.flags.set_paused(false);
        self.state = SessionState::Idle;
        peer
    }

    fn reject_and_close(&mut self, id: ConnectionId, reason: &str) {
        if let Some(sink) = self.connections.get(&id) {
            if let Err(e) = send(sink.as_ref(), &ControlMessage::reject(reason)) {
                debug!("Reject not delivered to {id}: {e}");
            }
            sink.close();
        }
    }

    fn send_to_peer(&self, message: &ControlMessage) {
        if let Some(peer) = &self.peer {
            if let Err(e) = send(peer.sink.as_ref(), message) {
                debug!("{} not delivered: {e}", message.type_name());
            }
        }
    }

    fn notify(&self, status: SessionStatus) {
        let _ = self.status_tx.send(status);
    }
}

fn send(sink: &dyn TransportSink, message: &ControlMessage) -> Result<(), SessionError> {
    let frame = encode_message(message)?;
    sink.send(frame)?;
    Ok(())
}

// ── Session thread ────────────────────────────────────────────────────────────

/// Control handle for the session thread.
pub struct ReceiverHandle {
    input_tx: mpsc::UnboundedSender<ServerInput>,
    shutdown_tx: watch::Sender<bool>,
    flags: Arc<SessionFlags>,
    counters: Arc<EventCounter>,
    thread: JoinHandle<()>,
}

impl ReceiverHandle {
    /// Returns a sender for connection tasks to report into.
    pub fn inputs(&self) -> mpsc::UnboundedSender<ServerInput> {
        self.input_tx.clone()
    }

    pub fn flags(&self) -> Arc<SessionFlags> {
        Arc::clone(&self.flags)
    }

    /// Turns `true` when [`shutdown`](Self::shutdown) starts.  The listener
    /// selects on it next to `accept()`.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn pause(&self) {
        let _ = self.input_tx.send(ServerInput::Command(ReceiverCommand::Pause));
    }

    pub fn resume(&self) {
        let _ = self.input_tx.send(ServerInput::Command(ReceiverCommand::Resume));
    }

    pub fn is_connected(&self) -> bool {
        self.flags.is_connected()
    }

    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    pub fn counts(&self) -> EventCounts {
        self.counters.snapshot()
    }

    /// Stops the session and waits for its thread.
    ///
    /// Blocks the caller; from async code wrap it in `spawn_blocking`.  If an
    /// approval prompt is pending, it must be answered (or its request
    /// dropped) first.
    pub fn shutdown(self) {
        self.flags.set_running(false);
        self.shutdown_tx.send_replace(true);
        let _ = self
            .input_tx
            .send(ServerInput::Command(ReceiverCommand::Shutdown));
        if self.thread.join().is_err() {
            warn!("Receiver session thread panicked");
        }
    }
}

/// Moves `session` onto the `mirror-session` thread.
///
/// # Errors
///
/// Returns the I/O error if the OS refuses to create the thread.
pub fn spawn_session(session: ReceiverSession) -> std::io::Result<ReceiverHandle> {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, _) = watch::channel(false);
    let flags = session.flags();
    let counters = session.counters();

    let thread = std::thread::Builder::new()
        .name("mirror-session".to_string())
        .spawn(move || run_session(session, input_rx))?;

    Ok(ReceiverHandle {
        input_tx,
        shutdown_tx,
        flags,
        counters,
        thread,
    })
}

fn run_session(mut session: ReceiverSession, mut inputs: mpsc::UnboundedReceiver<ServerInput>) {
    while let Some(input) = inputs.blocking_recv() {
        if session.handle(input).is_break() {
            break;
        }
    }
    if session.state() != SessionState::Closed {
        let _ = session.handle(ServerInput::Command(ReceiverCommand::Shutdown));
    }
    debug!("Receiver session thread exiting");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
