//! SenderSession: the initiator side of the mirroring protocol.
//!
//! # How the sender works (for beginners)
//!
//! Three independent sources produce work for the session:
//!
//! - the **transport** (socket opened, frame arrived, socket closed),
//! - the **capture source** (a key was pressed, the mouse moved),
//! - the **user** (pause, resume, disconnect).
//!
//! Instead of letting each of them poke at shared state from its own thread,
//! every event is turned into a [`SessionInput`] message and pushed onto one
//! unbounded channel.  A single Tokio task owns the [`SenderSession`] and
//! applies the messages one at a time, so the state machine itself needs no
//! locks and processes input in exactly the order it was captured.
//!
//! ```text
//!  transport task ─┐
//!  capture thread ─┼─► mpsc<SessionInput> ─► SenderSession::handle() ─► TransportSink
//!  SenderHandle  ──┘
//! ```
//!
//! # Handshake
//!
//! [`connect`] derives the key, starts the session task and then waits at most
//! `connect_timeout` for `accept` or `reject`.  If the timer fires first the
//! session is aborted; an `accept` arriving afterwards finds the session
//! closed and is ignored.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mirror_core::{
    decode_message, derive_key, encode_message, encrypt, serialize_event, ConnectPayload,
    ControlMessage, DerivedKey, EventCounter, EventCounts, InputEvent, MouseMoveThrottle, Origin,
    SessionError, SessionFlags, SessionState, SessionStatus, TransportEvent, TransportSink,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::infrastructure::input_capture::{CaptureCallback, CaptureSource};
use crate::infrastructure::network::TransportPair;

/// Everything the session task reacts to.
#[derive(Debug)]
pub enum SessionInput {
    Transport(TransportEvent),
    Captured(InputEvent),
    Command(SenderCommand),
}

/// Requests from the local user or from [`connect`].
#[derive(Debug)]
pub enum SenderCommand {
    Pause,
    Resume,
    Disconnect,
    /// Tear the session down because the handshake failed on the caller's side.
    Abort(SessionError),
}

/// Tunables for one sender session.
#[derive(Debug, Clone)]
pub struct SenderSettings {
    /// Name shown to the receiver's operator.
    pub pc_name: String,
    /// Upper bound on the wait for `accept`/`reject`.
    pub connect_timeout: Duration,
    /// Minimum spacing between forwarded mouse moves.
    pub mouse_throttle: Duration,
}

/// Channels the session uses to talk back to the outside world.
pub struct SessionChannels {
    /// Loop-back into the session's own input queue, for the capture callback.
    pub input_tx: mpsc::UnboundedSender<SessionInput>,
    /// User-visible status notifications.
    pub status_tx: mpsc::UnboundedSender<SessionStatus>,
    /// Completed once with the handshake outcome.
    pub handshake: Option<oneshot::Sender<Result<(), SessionError>>>,
}

/// The initiator state machine.
pub struct SenderSession {
    key: DerivedKey,
    pc_name: String,
    sink: Arc<dyn TransportSink>,
    capture: Arc<dyn CaptureSource>,
    channels: SessionChannels,
    flags: Arc<SessionFlags>,
    counters: Arc<EventCounter>,
    throttle: Arc<MouseMoveThrottle>,
    state: SessionState,
    disconnect_sent: bool,
}

impl SenderSession {
    /// Creates a session in the `Connecting` state.
    pub fn new(
        key: DerivedKey,
        settings: &SenderSettings,
        sink: Arc<dyn TransportSink>,
        capture: Arc<dyn CaptureSource>,
        channels: SessionChannels,
    ) -> Self {
        Self {
            key,
            pc_name: settings.pc_name.clone(),
            sink,
            capture,
            channels,
            flags: Arc::new(SessionFlags::new()),
            counters: Arc::new(EventCounter::new()),
            throttle: Arc::new(MouseMoveThrottle::new(settings.mouse_throttle)),
            state: SessionState::Connecting,
            disconnect_sent: false,
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

    /// Applies one input.  Returns `Break` once the session is closed.
    pub fn handle(&mut self, input: SessionInput) -> ControlFlow<()> {
        if self.state == SessionState::Closed {
            debug!("Ignoring {input:?} after close");
            return ControlFlow::Break(());
        }

        match input {
            SessionInput::Transport(event) => self.on_transport(event),
            SessionInput::Captured(event) => self.on_captured(event),
            SessionInput::Command(command) => self.on_command(command),
        }

        if self.state == SessionState::Closed {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(text) => self.on_frame(&text),
            TransportEvent::Closed(reason) => {
                info!("Transport closed: {reason}");
                self.close(SessionError::Transport(reason.clone()), SessionStatus::Disconnected(reason));
            }
            TransportEvent::Error(reason) => {
                warn!("Transport error: {reason}");
                self.close(SessionError::Transport(reason.clone()), SessionStatus::Error(reason));
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != SessionState::Connecting {
            debug!("Ignoring transport open in state {}", self.state);
            return;
        }

        let payload = ConnectPayload {
            pc_name: self.pc_name.clone(),
        };
        let plaintext = match serde_json::to_vec(&payload) {
            Ok(p) => p,
            Err(e) => {
                self.close(SessionError::Protocol(e.to_string()), SessionStatus::Error(e.to_string()));
                return;
            }
        };
        let d = encrypt(&self.key, &plaintext);
        if d.is_empty() {
            let err = SessionError::CryptoInit("could not seal connect payload".to_string());
            self.close(err.clone(), SessionStatus::Error(err.to_string()));
            return;
        }

        if let Err(e) = self.send(&ControlMessage::Connect { d }) {
            self.close(e.clone(), SessionStatus::Error(e.to_string()));
            return;
        }

        info!("Connected, waiting for approval");
        self.state = SessionState::AwaitingApproval;
        self.notify(SessionStatus::Authenticating);
    }

    fn on_frame(&mut self, text: &str) {
        let message = match decode_message(text) {
            Ok(m) => m,
            Err(e) => {
                warn!("Dropping malformed frame: {e}");
                return;
            }
        };
        debug!("Received {} in state {}", message.type_name(), self.state);

        match message {
            ControlMessage::Accept if self.state == SessionState::AwaitingApproval => {
                self.on_accept();
            }
            ControlMessage::Reject { reason } if self.state == SessionState::AwaitingApproval => {
                let reason = reason.unwrap_or_else(|| "Connection rejected".to_string());
                info!("Connection rejected: {reason}");
                self.close(
                    SessionError::Rejected(reason.clone()),
                    SessionStatus::Rejected(reason),
                );
            }
            ControlMessage::Accept | ControlMessage::Reject { .. } => {
                debug!("Ignoring late handshake reply in state {}", self.state);
            }
            ControlMessage::Pause if self.state == SessionState::Active => {
                self.set_paused(true);
                self.notify(SessionStatus::Paused(Origin::Peer));
            }
            ControlMessage::Resume if self.state == SessionState::Paused => {
                self.set_paused(false);
                self.notify(SessionStatus::Resumed(Origin::Peer));
            }
            ControlMessage::Pause | ControlMessage::Resume => {
                debug!("Ignoring pause/resume in state {}", self.state);
            }
            ControlMessage::Disconnect => {
                info!("Receiver ended the session");
                self.close(
                    SessionError::Transport("peer disconnected".to_string()),
                    SessionStatus::Disconnected("Receiver disconnected".to_string()),
                );
            }
            other @ (ControlMessage::Connect { .. }
            | ControlMessage::Key { .. }
            | ControlMessage::Mouse { .. }) => {
                warn!("Receiver sent unexpected {} frame", other.type_name());
            }
        }
    }

    fn on_accept(&mut self) {
        self.state = SessionState::Active;
        self.flags.set_connected(true);
        self.flags.set_running(true);

        if let Err(e) = self.capture.start(self.capture_callback()) {
            warn!("Input capture failed to start: {e}");
            self.send_disconnect();
            self.close(SessionError::Capture(e.to_string()), SessionStatus::Error(e.to_string()));
            return;
        }

        info!("Connection accepted, mirroring input");
        self.notify(SessionStatus::Accepted);
        if let Some(reply) = self.channels.handshake.take() {
            let _ = reply.send(Ok(()));
        }
    }

    /// Builds the closure the capture thread calls for every event.
    ///
    /// Mouse moves faster than the throttle are dropped here, before they
    /// ever reach the queue.
    fn capture_callback(&self) -> CaptureCallback {
        self.capture_callback_with(Instant::now)
    }

    /// [`capture_callback`](Self::capture_callback) with the throttle's clock
    /// supplied by `clock`.
    fn capture_callback_with<C>(&self, clock: C) -> CaptureCallback
    where
        C: Fn() -> Instant + Send + Sync + 'static,
    {
        let input_tx = self.channels.input_tx.clone();
        let throttle = Arc::clone(&self.throttle);
        let counters = Arc::clone(&self.counters);
        Box::new(move |event: InputEvent| {
            if !throttle.admit_at(&event, clock()) {
                counters.record_dropped();
                return;
            }
            let _ = input_tx.send(SessionInput::Captured(event));
        })
    }

    // ── Captured input ────────────────────────────────────────────────────────

    fn on_captured(&mut self, event: InputEvent) {
        if self.state != SessionState::Active {
            self.counters.record_dropped();
            return;
        }

        let d = encrypt(&self.key, serialize_event(&event).as_bytes());
        if d.is_empty() {
            self.counters.record_dropped();
            return;
        }

        let message = if event.kind.is_key() {
            ControlMessage::Key { d }
        } else {
            ControlMessage::Mouse { d }
        };

        match self.send(&message) {
            Ok(()) => self.counters.record_sent(),
            Err(e) => {
                debug!("Dropping captured event: {e}");
                self.counters.record_dropped();
            }
        }
    }

    // ── Local commands ────────────────────────────────────────────────────────

    fn on_command(&mut self, command: SenderCommand) {
        match command {
            SenderCommand::Pause if self.state == SessionState::Active => {
                self.set_paused(true);
                let _ = self.send(&ControlMessage::Pause);
                self.notify(SessionStatus::Paused(Origin::Local));
            }
            SenderCommand::Resume if self.state == SessionState::Paused => {
                self.set_paused(false);
                let _ = self.send(&ControlMessage::Resume);
                self.notify(SessionStatus::Resumed(Origin::Local));
            }
            SenderCommand::Pause | SenderCommand::Resume => {
                debug!("Ignoring local pause/resume in state {}", self.state);
            }
            SenderCommand::Disconnect => {
                info!("Disconnecting");
                self.send_disconnect();
                self.close(
                    SessionError::Transport("disconnected locally".to_string()),
                    SessionStatus::Disconnected("Disconnected by user".to_string()),
                );
            }
            SenderCommand::Abort(reason) => {
                warn!("Aborting session: {reason}");
                self.send_disconnect();
                self.close(reason.clone(), SessionStatus::Error(reason.to_string()));
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn set_paused(&mut self, paused: bool) {
        self.flags.set_paused(paused);
        if paused {
            self.capture.pause();
            self.state = SessionState::Paused;
        } else {
            self.throttle.reset();
            self.capture.resume();
            self.state = SessionState::Active;
        }
    }

    /// Sends `disconnect` at most once, and only on an established session.
    fn send_disconnect(&mut self) {
        if self.disconnect_sent || !self.state.is_established() {
            return;
        }
        self.disconnect_sent = true;
        if let Err(e) = self.send(&ControlMessage::Disconnect) {
            debug!("Best-effort disconnect not delivered: {e}");
        }
    }

    /// Stops capture, closes the transport and enters `Closed`.
    ///
    /// If the handshake is still pending it completes with `failure`.
    fn close(&mut self, failure: SessionError, status: SessionStatus) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;

        self.capture.stop();
        self.sink.close();

        self.flags.set_connected(false);
        self.flags.set_paused(false);
        self.flags.set_running(false);
        self.state = SessionState::Closed;

        if let Some(reply) = self.channels.handshake.take() {
            let _ = reply.send(Err(failure));
        }
        self.notify(status);
    }

    fn send(&self, message: &ControlMessage) -> Result<(), SessionError> {
        let frame = encode_message(message)?;
        self.sink.send(frame)?;
        Ok(())
    }

    fn notify(&self, status: SessionStatus) {
        let _ = self.channels.status_tx.send(status);
    }
}

// ── Async driver ──────────────────────────────────────────────────────────────

/// Control handle for a running, accepted session.
pub struct SenderHandle {
    input_tx: mpsc::UnboundedSender<SessionInput>,
    flags: Arc<SessionFlags>,
    counters: Arc<EventCounter>,
    ended: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl SenderHandle {
    /// Pauses mirroring and tells the receiver.
    pub fn pause(&self) {
        let _ = self
            .input_tx
            .send(SessionInput::Command(SenderCommand::Pause));
    }

    /// Resumes mirroring and tells the receiver.
    pub fn resume(&self) {
        let _ = self
            .input_tx
            .send(SessionInput::Command(SenderCommand::Resume));
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

    /// Resolves as soon as the session task ends, without consuming the
    /// handle.  Lets a console loop `select!` on it next to user input.
    pub async fn ended(&self) {
        let mut ended = self.ended.clone();
        while !*ended.borrow_and_update() {
            if ended.changed().await.is_err() {
                break;
            }
        }
    }

    /// Sends `disconnect`, stops capture, closes the transport and waits for
    /// the session task to finish.
    pub async fn disconnect(self) {
        let _ = self
            .input_tx
            .send(SessionInput::Command(SenderCommand::Disconnect));
        let _ = self.task.await;
    }

    /// Waits until the session ends on its own (peer disconnect, transport loss).
    pub async fn closed(self) {
        let _ = self.task.await;
    }
}

/// Runs the handshake over `transport` and returns a handle once the receiver
/// accepts.
///
/// # Errors
///
/// - [`SessionError::CryptoInit`] if the key cannot be derived.
/// - [`SessionError::Rejected`] if the receiver refuses (wrong token, denied).
/// - [`SessionError::Transport`] if the connection fails or closes first.
/// - [`SessionError::Timeout`] if no reply arrives within `connect_timeout`.
pub async fn connect(
    token: &str,
    settings: SenderSettings,
    transport: TransportPair,
    capture: Arc<dyn CaptureSource>,
    status_tx: mpsc::UnboundedSender<SessionStatus>,
) -> Result<SenderHandle, SessionError> {
    let _ = status_tx.send(SessionStatus::Connecting);

    let token = token.to_string();
    let key = tokio::task::spawn_blocking(move || derive_key(&token))
        .await
        .map_err(|e| SessionError::CryptoInit(e.to_string()))??;

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (handshake_tx, handshake_rx) = oneshot::channel();

    let TransportPair { sink, events } = transport;
    let session = SenderSession::new(
        key,
        &settings,
        sink,
        capture,
        SessionChannels {
            input_tx: input_tx.clone(),
            status_tx,
            handshake: Some(handshake_tx),
        },
    );
    let flags = session.flags();
    let counters = session.counters();

    let (ended_tx, ended_rx) = watch::channel(false);
    tokio::spawn(forward_transport(events, input_tx.clone()));
    let task = tokio::spawn(run_session(session, input_rx, ended_tx));

    match tokio::time::timeout(settings.connect_timeout, handshake_rx).await {
        Ok(Ok(Ok(()))) => Ok(SenderHandle {
            input_tx,
            flags,
            counters,
            ended: ended_rx,
            task,
        }),
        Ok(Ok(Err(e))) => {
            let _ = task.await;
            Err(e)
        }
        Ok(Err(_)) => {
            let _ = task.await;
            Err(SessionError::Transport("session ended during handshake".to_string()))
        }
        Err(_) => {
            warn!(
                "No reply from receiver within {} ms",
                settings.connect_timeout.as_millis()
            );
            let _ = input_tx.send(SessionInput::Command(SenderCommand::Abort(SessionError::Timeout)));
            let _ = task.await;
            Err(SessionError::Timeout)
        }
    }
}

async fn forward_transport(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    input_tx: mpsc::UnboundedSender<SessionInput>,
) {
    while let Some(event) = events.recv().await {
        if input_tx.send(SessionInput::Transport(event)).is_err() {
            break;
        }
    }
}

async fn run_session(
    mut session: SenderSession,
    mut input_rx: mpsc::UnboundedReceiver<SessionInput>,
    ended: watch::Sender<bool>,
) {
    while let Some(input) = input_rx.recv().await {
        if session.handle(input).is_break() {
            break;
        }
    }
    debug!("Sender session task finished in state {}", session.state());
    ended.send_replace(true);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::mock::MockCaptureSource;
    use mirror_core::{decrypt, deserialize_event, RecordingSink, SinkOp};
    use std::sync::atomic::{AtomicU64, Ordering};

    const TOKEN: &str = "TEST42";

    struct Fixture {
        session: SenderSession,
        sink: Arc<RecordingSink>,
        capture: Arc<MockCaptureSource>,
        input_rx: mpsc::UnboundedReceiver<SessionInput>,
        status_rx: mpsc::UnboundedReceiver<SessionStatus>,
        handshake_rx: oneshot::Receiver<Result<(), SessionError>>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let capture = Arc::new(MockCaptureSource::new());
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (handshake_tx, handshake_rx) = oneshot::channel();
        let settings = SenderSettings {
            pc_name: "unit-test-pc".to_string(),
            connect_timeout: Duration::from_secs(30),
            mouse_throttle: Duration::from_millis(16),
        };
        let session = SenderSession::new(
            derive_key(TOKEN).unwrap(),
            &settings,
            sink.clone(),
            capture.clone(),
            SessionChannels {
                input_tx,
                status_tx,
                handshake: Some(handshake_tx),
            },
        );
        Fixture {
            session,
            sink,
            capture,
            input_rx,
            status_rx,
            handshake_rx,
        }
    }

    fn frame(message: ControlMessage) -> SessionInput {
        SessionInput::Transport(TransportEvent::Message(encode_message(&message).unwrap()))
    }

    fn active_fixture() -> Fixture {
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));
        let _ = f.session.handle(frame(ControlMessage::Accept));
        assert_eq!(f.session.state(), SessionState::Active);
        f
    }

    fn sent_types(sink: &RecordingSink) -> Vec<&'static str> {
        sink.frames()
            .iter()
            .map(|f| decode_message(f).unwrap().type_name())
            .collect()
    }

    fn statuses(rx: &mut mpsc::UnboundedReceiver<SessionStatus>) -> Vec<SessionStatus> {
        let mut out = Vec::new();
        while let Ok(s) = rx.try_recv() {
            out.push(s);
        }
        out
    }

    #[test]
    fn test_open_sends_connect_with_sealed_pc_name() {
        // Arrange
        let mut f = fixture();

        // Act
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));

        // Assert
        assert_eq!(f.session.state(), SessionState::AwaitingApproval);
        let frames = f.sink.frames();
        assert_eq!(frames.len(), 1);
        let ControlMessage::Connect { d } = decode_message(&frames[0]).unwrap() else {
            panic!("expected connect frame");
        };
        let payload: ConnectPayload =
            serde_json::from_slice(&decrypt(&derive_key(TOKEN).unwrap(), &d).unwrap()).unwrap();
        assert_eq!(payload.pc_name, "unit-test-pc");
        assert_eq!(statuses(&mut f.status_rx), vec![SessionStatus::Authenticating]);
    }

    #[test]
    fn test_accept_starts_capture_and_completes_handshake() {
        // Arrange
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));

        // Act
        let flow = f.session.handle(frame(ControlMessage::Accept));

        // Assert
        assert!(flow.is_continue());
        assert_eq!(f.session.state(), SessionState::Active);
        assert!(f.capture.is_running());
        assert!(f.session.flags().is_connected());
        assert_eq!(f.handshake_rx.try_recv().unwrap(), Ok(()));
    }

    #[test]
    fn test_reject_closes_session_with_reason() {
        // Arrange
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));

        // Act
        let flow = f.session.handle(frame(ControlMessage::reject("Invalid token")));

        // Assert
        assert!(flow.is_break());
        assert_eq!(f.session.state(), SessionState::Closed);
        assert_eq!(
            f.handshake_rx.try_recv().unwrap(),
            Err(SessionError::Rejected("Invalid token".to_string()))
        );
        assert!(!f.capture.is_running());
        assert_eq!(f.capture.start_count(), 0);
        assert!(f.sink.is_closed());
        assert!(statuses(&mut f.status_rx)
            .contains(&SessionStatus::Rejected("Invalid token".to_string())));
    }

    #[test]
    fn test_transport_error_during_handshake_fails_handshake() {
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Error("refused".into())));
        assert_eq!(
            f.handshake_rx.try_recv().unwrap(),
            Err(SessionError::Transport("refused".to_string()))
        );
        assert_eq!(f.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_captured_events_are_not_sent_before_accept() {
        // Arrange
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));

        // Act
        let _ = f.session.handle(SessionInput::Captured(InputEvent::key_down(0x41, 0x1E, 0)));

        // Assert – only the connect frame went out
        assert_eq!(sent_types(&f.sink), vec!["connect"]);
        assert_eq!(f.session.counters().snapshot().dropped, 1);
    }

    #[test]
    fn test_active_session_wraps_keys_and_mouse_separately() {
        // Arrange
        let mut f = active_fixture();
        let key = derive_key(TOKEN).unwrap();

        // Act
        let _ = f.session.handle(SessionInput::Captured(InputEvent::key_down(0x41, 0x1E, 7)));
        let _ = f.session.handle(SessionInput::Captured(InputEvent::mouse_wheel(-120, 5, 5, 8)));

        // Assert
        assert_eq!(sent_types(&f.sink), vec!["connect", "key", "mouse"]);
        let ControlMessage::Key { d } = decode_message(&f.sink.frames()[1]).unwrap() else {
            panic!("expected key frame");
        };
        let event = deserialize_event(&decrypt(&key, &d).unwrap());
        assert_eq!(event.into_valid(), Some(InputEvent::key_down(0x41, 0x1E, 7)));
        assert_eq!(f.session.counters().snapshot().sent, 2);
    }

    #[test]
    fn test_capture_callback_feeds_the_session_queue() {
        // Arrange
        let mut f = active_fixture();

        // Act
        assert!(f.capture.inject(InputEvent::key_up(0x20, 0x39, 1)));

        // Assert
        match f.input_rx.try_recv() {
            Ok(SessionInput::Captured(event)) => assert_eq!(event, InputEvent::key_up(0x20, 0x39, 1)),
            other => panic!("unexpected queue content: {other:?}"),
        }
    }

    #[test]
    fn test_capture_callback_throttles_mouse_moves() {
        // Arrange
        let f = active_fixture();

        // Act – two moves back to back, well inside one 16 ms window
        f.capture.inject(InputEvent::mouse_move(1, 1, 0));
        f.capture.inject(InputEvent::mouse_move(2, 2, 0));

        // Assert
        let mut rx = f.input_rx;
        assert!(matches!(rx.try_recv(), Ok(SessionInput::Captured(_))));
        assert!(rx.try_recv().is_err());
        assert_eq!(f.session.counters().snapshot().dropped, 1);
    }

    #[test]
    fn test_capture_callback_forwards_at_most_63_moves_from_a_1000_hz_mouse() {
        // Arrange – a clock that advances one millisecond per captured event
        let mut f = active_fixture();
        let start = Instant::now();
        let ticks = Arc::new(AtomicU64::new(0));
        let clock_ticks = Arc::clone(&ticks);
        let callback = f.session.capture_callback_with(move || {
            start + Duration::from_millis(clock_ticks.fetch_add(1, Ordering::SeqCst))
        });

        // Act – one second of mouse movement plus a key press
        for ms in 0..1000 {
            callback(InputEvent::mouse_move(ms, ms, 0));
        }
        callback(InputEvent::key_down(0x41, 0x1E, 0));

        // Assert
        let mut moves = 0u64;
        let mut keys = 0u64;
        while let Ok(SessionInput::Captured(event)) = f.input_rx.try_recv() {
            if event.kind.is_key() {
                keys += 1;
            } else {
                moves += 1;
            }
        }
        assert_eq!(ticks.load(Ordering::SeqCst), 1001);
        assert_eq!(moves, 63);
        assert_eq!(keys, 1);
        assert_eq!(f.session.counters().snapshot().dropped, 1000 - moves);
    }

    #[test]
    fn test_peer_pause_gates_forwarding_until_resume() {
        // Arrange
        let mut f = active_fixture();

        // Act – pause from the receiver
        let _ = f.session.handle(frame(ControlMessage::Pause));
        let injected_while_paused = f.capture.inject(InputEvent::key_down(1, 1, 0));
        let _ = f.session.handle(SessionInput::Captured(InputEvent::key_down(1, 1, 0)));

        // Assert
        assert_eq!(f.session.state(), SessionState::Paused);
        assert!(f.capture.is_paused());
        assert!(f.capture.is_running(), "pause must not stop capture");
        assert!(!injected_while_paused);
        assert_eq!(sent_types(&f.sink), vec!["connect"]);

        // Act – resume from the receiver
        let _ = f.session.handle(frame(ControlMessage::Resume));
        let _ = f.session.handle(SessionInput::Captured(InputEvent::key_down(2, 2, 0)));

        // Assert
        assert_eq!(f.session.state(), SessionState::Active);
        assert_eq!(sent_types(&f.sink), vec!["connect", "key"]);
        let all = statuses(&mut f.status_rx);
        assert!(all.contains(&SessionStatus::Paused(Origin::Peer)));
        assert!(all.contains(&SessionStatus::Resumed(Origin::Peer)));
    }

    #[test]
    fn test_local_pause_and_resume_notify_receiver() {
        let mut f = active_fixture();

        let _ = f.session.handle(SessionInput::Command(SenderCommand::Pause));
        let _ = f.session.handle(SessionInput::Command(SenderCommand::Resume));

        assert_eq!(sent_types(&f.sink), vec!["connect", "pause", "resume"]);
        assert!(!f.capture.is_paused());
    }

    #[test]
    fn test_local_disconnect_sends_once_then_closes() {
        // Arrange
        let mut f = active_fixture();

        // Act
        let flow = f.session.handle(SessionInput::Command(SenderCommand::Disconnect));
        let after = f.session.handle(SessionInput::Command(SenderCommand::Disconnect));

        // Assert
        assert!(flow.is_break());
        assert!(after.is_break());
        let ops = f.sink.ops();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[1], SinkOp::Send(frame) if frame.contains("disconnect")));
        assert_eq!(ops[2], SinkOp::Close);
        assert!(!f.capture.is_running());
        assert_eq!(f.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_disconnect_before_accept_sends_no_disconnect_frame() {
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));
        let _ = f.session.handle(SessionInput::Command(SenderCommand::Disconnect));
        assert_eq!(sent_types(&f.sink), vec!["connect"]);
        assert!(f.sink.is_closed());
    }

    #[test]
    fn test_peer_disconnect_stops_capture_and_closes_transport() {
        // Arrange
        let mut f = active_fixture();

        // Act
        let flow = f.session.handle(frame(ControlMessage::Disconnect));

        // Assert
        assert!(flow.is_break());
        assert!(!f.capture.is_running());
        assert!(f.sink.is_closed());
        assert_eq!(sent_types(&f.sink), vec!["connect"], "no disconnect echo");
    }

    #[test]
    fn test_late_accept_after_abort_is_ignored() {
        // Arrange
        let mut f = fixture();
        let _ = f.session.handle(SessionInput::Transport(TransportEvent::Open));
        let _ = f
            .session
            .handle(SessionInput::Command(SenderCommand::Abort(SessionError::Timeout)));

        // Act
        let flow = f.session.handle(frame(ControlMessage::Accept));

        // Assert
        assert!(flow.is_break());
        assert_eq!(f.session.state(), SessionState::Closed);
        assert_eq!(f.capture.start_count(), 0);
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let mut f = active_fixture();
        let flow = f
            .session
            .handle(SessionInput::Transport(TransportEvent::Message("{oops".into())));
        assert!(flow.is_continue());
        assert_eq!(f.session.state(), SessionState::Active);
    }
}
