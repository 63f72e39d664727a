//! Integration tests for the sender session.
//!
//! # Purpose
//!
//! These tests drive [`connect`] and the returned [`SenderHandle`] through the
//! public API, the same way `main.rs` does, but over an in-memory transport:
//! the test plays the receiver by pushing [`TransportEvent`]s into the session
//! and inspecting the frames recorded by a [`RecordingSink`].
//!
//! ```text
//! test ──TransportEvent──► connect()/session task ──frames──► RecordingSink ──► test
//!   └────inject()────► MockCaptureSource ──callback──┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use mirror_core::{
    decode_message, encode_message, ControlMessage, InputEvent, RecordingSink, SessionError,
    SessionStatus, SinkOp, TransportEvent,
};
use mirror_sender::application::sender_session::{connect, SenderHandle, SenderSettings};
use mirror_sender::infrastructure::input_capture::mock::MockCaptureSource;
use mirror_sender::infrastructure::input_capture::CaptureSource;
use mirror_sender::infrastructure::network::TransportPair;
use tokio::sync::mpsc;
use tokio_test::{assert_ok, assert_pending};

const TOKEN: &str = "K7Q2ZD";

struct FakeReceiver {
    events: mpsc::UnboundedSender<TransportEvent>,
    sink: Arc<RecordingSink>,
}

impl FakeReceiver {
    fn reply(&self, message: ControlMessage) {
        let frame = encode_message(&message).unwrap();
        self.events.send(TransportEvent::Message(frame)).unwrap();
    }

    fn frame_types(&self) -> Vec<&'static str> {
        self.sink
            .frames()
            .iter()
            .map(|f| decode_message(f).unwrap().type_name())
            .collect()
    }
}

fn transport() -> (TransportPair, FakeReceiver) {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TransportPair::new(sink.clone(), rx),
        FakeReceiver { events: tx, sink },
    )
}

fn settings(timeout: Duration) -> SenderSettings {
    SenderSettings {
        pc_name: "integration-pc".to_string(),
        connect_timeout: timeout,
        mouse_throttle: Duration::from_millis(16),
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition was not reached in time");
}

async fn accepted_session() -> (SenderHandle, FakeReceiver, Arc<MockCaptureSource>) {
    let (pair, receiver) = transport();
    let capture = Arc::new(MockCaptureSource::new());
    let (status_tx, _status_rx) = mpsc::unbounded_channel();

    receiver.events.send(TransportEvent::Open).unwrap();
    receiver.reply(ControlMessage::Accept);

    let handle = assert_ok!(
        connect(TOKEN, settings(Duration::from_secs(5)), pair, capture.clone(), status_tx).await
    );
    (handle, receiver, capture)
}

#[tokio::test]
async fn test_accepted_session_mirrors_captured_input() {
    // Arrange
    let (handle, receiver, capture) = accepted_session().await;
    assert!(handle.is_connected());
    assert!(capture.is_running());

    // Act
    capture.inject(InputEvent::key_down(0x41, 0x1E, 1));
    capture.inject(InputEvent::mouse_move(10, 20, 2));

    // Assert
    eventually(|| receiver.frame_types().len() == 3).await;
    assert_eq!(receiver.frame_types(), vec!["connect", "key", "mouse"]);
    assert_eq!(handle.counts().sent, 2);
}

#[tokio::test]
async fn test_rejected_handshake_reports_reason() {
    // Arrange
    let (pair, receiver) = transport();
    let capture = Arc::new(MockCaptureSource::new());
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    receiver.events.send(TransportEvent::Open).unwrap();
    receiver.reply(ControlMessage::reject("Invalid token"));

    // Act
    let result = connect(TOKEN, settings(Duration::from_secs(5)), pair, capture.clone(), status_tx).await;

    // Assert
    assert_eq!(
        result.err(),
        Some(SessionError::Rejected("Invalid token".to_string()))
    );
    assert_eq!(capture.start_count(), 0);
    assert!(receiver.sink.is_closed());

    let mut seen = Vec::new();
    while let Ok(status) = status_rx.try_recv() {
        seen.push(status);
    }
    assert_eq!(seen.first(), Some(&SessionStatus::Connecting));
    assert!(seen.contains(&SessionStatus::Rejected("Invalid token".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_silent_receiver_times_out_and_late_accept_is_ignored() {
    // Arrange – the socket opens but the receiver never answers
    let (pair, receiver) = transport();
    let capture = Arc::new(MockCaptureSource::new());
    let (status_tx, _status_rx) = mpsc::unbounded_channel();
    receiver.events.send(TransportEvent::Open).unwrap();

    // Act
    let result = connect(TOKEN, settings(Duration::from_secs(30)), pair, capture.clone(), status_tx).await;

    // Assert
    assert_eq!(result.err(), Some(SessionError::Timeout));
    assert_eq!(receiver.frame_types(), vec!["connect"]);
    assert_eq!(receiver.sink.ops().last(), Some(&SinkOp::Close));

    // Act – the approval finally arrives
    let _ = receiver.events.send(TransportEvent::Message(
        encode_message(&ControlMessage::Accept).unwrap(),
    ));
    tokio::task::yield_now().await;

    // Assert
    assert_eq!(capture.start_count(), 0);
}

#[tokio::test]
async fn test_transport_failure_before_open_fails_connect() {
    let (pair, receiver) = transport();
    let capture = Arc::new(MockCaptureSource::new());
    let (status_tx, _status_rx) = mpsc::unbounded_channel();
    receiver
        .events
        .send(TransportEvent::Error("connection refused".to_string()))
        .unwrap();

    let result = connect(TOKEN, settings(Duration::from_secs(5)), pair, capture, status_tx).await;

    assert_eq!(
        result.err(),
        Some(SessionError::Transport("connection refused".to_string()))
    );
    assert!(receiver.frame_types().is_empty());
}

#[tokio::test]
async fn test_disconnect_sends_exactly_one_frame_then_closes() {
    // Arrange
    let (handle, receiver, capture) = accepted_session().await;

    // Act
    handle.disconnect().await;

    // Assert
    let ops = receiver.sink.ops();
    assert_eq!(receiver.frame_types(), vec!["connect", "disconnect"]);
    assert_eq!(ops.last(), Some(&SinkOp::Close));
    assert_eq!(ops.len(), 3);
    assert!(!capture.is_running());
}

#[tokio::test]
async fn test_peer_disconnect_ends_session() {
    // Arrange
    let (handle, receiver, capture) = accepted_session().await;

    // Act
    receiver.reply(ControlMessage::Disconnect);
    handle.closed().await;

    // Assert
    assert!(!capture.is_running());
    assert!(receiver.sink.is_closed());
    assert_eq!(receiver.frame_types(), vec!["connect"]);
}

#[tokio::test]
async fn test_ended_wakes_console_when_peer_disconnects() {
    // Arrange
    let (handle, receiver, _capture) = accepted_session().await;
    let mut ended = tokio_test::task::spawn(handle.ended());
    assert_pending!(ended.poll());

    // Act
    receiver.reply(ControlMessage::Disconnect);

    // Assert
    let woke = tokio::time::timeout(Duration::from_secs(2), ended).await;
    assert!(woke.is_ok(), "ended() did not resolve after the peer left");
    assert!(!handle.is_connected());
}

#[tokio::test]
async fn test_peer_pause_gates_input_until_resume() {
    // Arrange
    let (handle, receiver, capture) = accepted_session().await;

    // Act – receiver pauses
    receiver.reply(ControlMessage::Pause);
    eventually(|| handle.is_paused()).await;
    let delivered_while_paused = capture.inject(InputEvent::key_down(0x41, 0, 0));

    // Assert
    assert!(!delivered_while_paused);
    assert!(capture.is_running());

    // Act – receiver resumes
    receiver.reply(ControlMessage::Resume);
    eventually(|| !handle.is_paused()).await;
    capture.inject(InputEvent::key_down(0x42, 0, 1));

    // Assert
    eventually(|| receiver.frame_types().len() == 2).await;
    assert_eq!(receiver.frame_types(), vec!["connect", "key"]);
}

#[tokio::test]
async fn test_local_pause_is_announced_to_receiver() {
    let (handle, receiver, capture) = accepted_session().await;

    handle.pause();
    eventually(|| handle.is_paused()).await;
    handle.resume();
    eventually(|| !handle.is_paused()).await;

    assert_eq!(receiver.frame_types(), vec!["connect", "pause", "resume"]);
    assert!(!capture.is_paused());
}
