//! Session token generation and validation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Characters a token may contain.
pub const TOKEN_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default number of characters in a token.
pub const DEFAULT_TOKEN_LENGTH: usize = 6;

/// Generates a random token of `len` characters from [`TOKEN_ALPHABET`].
///
/// Each character is chosen by reducing one byte from the OS CSPRNG modulo 36.
pub fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| TOKEN_ALPHABET[usize::from(*b) % TOKEN_ALPHABET.len()] as char)
        .collect()
}

/// Returns `true` when `token` has exactly `len` characters, all from
/// [`TOKEN_ALPHABET`].
pub fn validate_token(token: &str, len: usize) -> bool {
    token.len() == len && token.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
}

/// Trims whitespace and upper-cases user-typed token input.
pub fn normalize_token_input(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}
