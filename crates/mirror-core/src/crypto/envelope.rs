//! AES-256-GCM envelope codec.
//!
//! Layout before base64: `nonce (12) ‖ tag (16) ‖ ciphertext (N)`.
//! The `aes-gcm` crate emits `ciphertext ‖ tag`, so the tag is moved in front
//! of the ciphertext on the way out and back behind it on the way in.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use super::base64;
use super::key::DerivedKey;
use super::CryptoError;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Smallest decoded envelope that can possibly be valid (empty plaintext).
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

fn cipher_for(key: &DerivedKey) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Init(e.to_string()))
}

/// Encrypts `plaintext` into a base64 envelope under a fresh random nonce.
///
/// # Errors
///
/// Returns [`CryptoError::Init`] if the cipher cannot be constructed and
/// [`CryptoError::Encrypt`] if sealing fails.
pub fn try_encrypt(key: &DerivedKey, plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher_for(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut envelope = Vec::with_capacity(MIN_ENVELOPE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(tag);
    envelope.extend_from_slice(ciphertext);

    Ok(base64::encode(&envelope))
}

/// Encrypts `plaintext`, returning an empty string on any failure.
///
/// Callers treat an empty result as "do not send".
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> String {
    match try_encrypt(key, plaintext) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Envelope encryption failed: {e}");
            String::new()
        }
    }
}

/// Opens a base64 envelope and returns the authenticated plaintext.
///
/// # Errors
///
/// Returns [`CryptoError::Decrypt`] when the envelope is too short, was
/// produced under a different key, or has been tampered with.  No partial
/// plaintext is ever returned.
pub fn decrypt(key: &DerivedKey, envelope_b64: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = base64::decode_permissive(envelope_b64);
    if raw.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::Decrypt(format!(
            "envelope too short: {} bytes",
            raw.len()
        )));
    }

    let (nonce, rest) = raw.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let cipher = cipher_for(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map_err(|_| CryptoError::Decrypt("authentication failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::derive_key;

    fn key(token: &str) -> DerivedKey {
        derive_key(token).unwrap()
    }

    #[test]
    fn test_round_trip_recovers_plaintext() {
        // Arrange
        let k = key("ROUND1");
        let plaintext = br#"{"pcName":"desk-01"}"#;

        // Act
        let envelope = encrypt(&k, plaintext);
        let opened = decrypt(&k, &envelope).unwrap();

        // Assert
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_empty_plaintext_produces_minimum_length_envelope() {
        let k = key("EMPTY1");
        let envelope = encrypt(&k, b"");
        assert_eq!(base64::decode_permissive(&envelope).len(), MIN_ENVELOPE_LEN);
        assert!(decrypt(&k, &envelope).unwrap().is_empty());
    }

    #[test]
    fn test_each_encryption_uses_a_fresh_nonce() {
        let k = key("NONCE1");
        let a = encrypt(&k, b"same");
        let b = encrypt(&k, b"same");
        assert_ne!(a, b);
        assert_ne!(
            base64::decode_permissive(&a)[..NONCE_LEN],
            base64::decode_permissive(&b)[..NONCE_LEN]
        );
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        // Arrange
        let envelope = encrypt(&key("TOKENA"), b"secret");

        // Act
        let result = decrypt(&key("TOKENB"), &envelope);

        // Assert
        assert!(matches!(result, Err(CryptoError::Decrypt(_))));
    }

    #[test]
    fn test_flipping_any_tag_or_ciphertext_bit_fails() {
        // Arrange
        let k = key("TAMPER");
        let raw = base64::decode_permissive(&encrypt(&k, b"abc"));

        // Act / Assert – every bit after the nonce is authenticated
        for byte in NONCE_LEN..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&k, &base64::encode(&tampered));
                assert!(result.is_err(), "bit {bit} of byte {byte} went undetected");
            }
        }
    }

    #[test]
    fn test_short_envelope_is_rejected() {
        let k = key("SHORT1");
        let too_short = base64::encode(&[0u8; MIN_ENVELOPE_LEN - 1]);
        assert!(matches!(decrypt(&k, &too_short), Err(CryptoError::Decrypt(_))));
    }

    #[test]
    fn test_envelope_survives_transport_whitespace() {
        // Arrange
        let k = key("SPACES");
        let envelope = encrypt(&k, b"payload");
        let (head, tail) = envelope.split_at(10);
        let mangled = format!("{head}\r\n {tail}");

        // Act / Assert
        assert_eq!(decrypt(&k, &mangled).unwrap(), b"payload");
    }
}
