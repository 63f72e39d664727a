//! Token, key derivation and authenticated envelope encryption.
//!
//! # How a session is secured (for beginners)
//!
//! The receiver prints a short token such as `K7Q2ZD`.  The user types the
//! same token on the sender.  Both sides independently stretch the token into
//! a 256-bit AES key with PBKDF2 (100 000 rounds of HMAC-SHA256).  Because the
//! token never travels over the network, only a sender that knows it can
//! produce a `connect` envelope the receiver is able to open.
//!
//! Every encrypted payload is an *envelope*:
//!
//! ```text
//! [nonce:12][tag:16][ciphertext:N]   → base64 (standard alphabet, '=' padding)
//! ```
//!
//! The nonce is freshly random for every message.  Re-using a nonce under the
//! same AES-GCM key would leak plaintext, so there is no per-session nonce.

pub mod base64;
pub mod envelope;
pub mod key;
pub mod token;

use thiserror::Error;

/// Errors produced by the crypto layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The key could not be derived or the cipher could not be initialised.
    #[error("crypto provider initialisation failed: {0}")]
    Init(String),

    /// AES-GCM encryption failed.
    #[error("encryption failed")]
    Encrypt,

    /// The envelope was malformed or failed authentication.
    #[error("decryption failed: {0}")]
    Decrypt(String),
}
