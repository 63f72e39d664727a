//! PBKDF2 key derivation from the session token.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::CryptoError;

/// Fixed application salt mixed into every key derivation.
pub const APP_SALT: &[u8] = b"InputMirror_v1.0_Salt";

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the derived AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit AES key derived from the session token.
///
/// The bytes are wiped when the value is dropped.  `Debug` never prints the
/// key material.
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derives the session key from `token` with PBKDF2-HMAC-SHA256.
///
/// Identical tokens always yield identical keys.
///
/// # Errors
///
/// Returns [`CryptoError::Init`] when the token is empty.
pub fn derive_key(token: &str) -> Result<DerivedKey, CryptoError> {
    if token.is_empty() {
        return Err(CryptoError::Init("token is empty".to_string()));
    }

    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(token.as_bytes(), APP_SALT, PBKDF2_ITERATIONS, &mut out);
    let key = DerivedKey(out);
    out.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_token_yields_same_key() {
        // Arrange / Act
        let a = derive_key("K7Q2ZD").unwrap();
        let b = derive_key("K7Q2ZD").unwrap();

        // Assert
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_different_tokens_yield_different_keys() {
        let a = derive_key("AAAAAA").unwrap();
        let b = derive_key("AAAAAB").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_empty_token_is_init_error() {
        assert!(matches!(derive_key(""), Err(CryptoError::Init(_))));
    }

    #[test]
    fn test_debug_does_not_leak_key_bytes() {
        let key = derive_key("ABC123").unwrap();
        assert_eq!(format!("{key:?}"), "DerivedKey(<redacted>)");
    }
}
