//! Session states, roles and user-visible status.
//!
//! ```text
//! Idle ─► Connecting ─► AwaitingApproval ─► Active ◄─► Paused
//!   ▲                         │                │          │
//!   └──── (receiver only) ────┴────────────────┴──────────┤
//!                                                         ▼
//!                                               Closing ─► Closed
//! ```
//!
//! The sender walks the chain once and ends in `Closed`.  The receiver returns
//! to `Idle` after every finished or refused attempt and only reaches `Closed`
//! when it shuts down.

use std::fmt;

/// Which side of the session this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The sender: captures local input and initiates the connection.
    Initiator,
    /// The receiver: listens, approves and replays input.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("sender"),
            Role::Responder => f.write_str("receiver"),
        }
    }
}

/// Position of a session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    AwaitingApproval,
    Active,
    Paused,
    Closing,
    Closed,
}

impl SessionState {
    /// Returns `true` in the two states where input events flow (or are
    /// gated by pause).
    pub fn is_established(self) -> bool {
        matches!(self, SessionState::Active | SessionState::Paused)
    }

    /// Returns `true` once the session can no longer be used.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closing | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingApproval => "awaiting approval",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Who requested a pause or resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Peer,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => f.write_str("local user"),
            Origin::Peer => f.write_str("remote peer"),
        }
    }
}

/// Status notifications surfaced to the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Authenticating,
    Accepted,
    Rejected(String),
    Paused(Origin),
    Resumed(Origin),
    Disconnected(String),
    Error(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Connecting => f.write_str("Connecting..."),
            SessionStatus::Authenticating => f.write_str("Connected, waiting for approval..."),
            SessionStatus::Accepted => f.write_str("Connection accepted"),
            SessionStatus::Rejected(reason) => write!(f, "Connection rejected: {reason}"),
            SessionStatus::Paused(by) => write!(f, "Paused by {by}"),
            SessionStatus::Resumed(by) => write!(f, "Resumed by {by}"),
            SessionStatus::Disconnected(reason) => write!(f, "Disconnected: {reason}"),
            SessionStatus::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}
