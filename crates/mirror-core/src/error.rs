//! Session-level error type shared by both roles.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::protocol::codec::ProtocolError;
use crate::protocol::transport::TransportError;

/// Why a session failed or an operation on it was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The key could not be derived or the cipher could not be set up.
    #[error("crypto initialisation failed: {0}")]
    CryptoInit(String),

    /// The peer's envelope did not authenticate under our key.
    #[error("authentication failed")]
    Authentication,

    /// The transport could not connect, failed or closed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer sent something that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer did not answer within the handshake timeout.
    #[error("timed out waiting for the peer")]
    Timeout,

    /// The peer refused the connection.
    #[error("connection rejected: {0}")]
    Rejected(String),

    /// The local input capture source could not be started.
    #[error("input capture failed: {0}")]
    Capture(String),

    /// The replay sink could not inject an event.
    #[error("replay failed: {0}")]
    ReplayFailure(String),
}

impl From<CryptoError> for SessionError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Init(reason) => SessionError::CryptoInit(reason),
            CryptoError::Encrypt => SessionError::CryptoInit("encryption failed".to_string()),
            CryptoError::Decrypt(_) => SessionError::Authentication,
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(e: TransportError) -> Self {
        SessionError::Transport(e.to_string())
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e.to_string())
    }
}
