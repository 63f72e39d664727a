//! Base64 helpers for envelopes.
//!
//! Encoding is plain RFC 4648 with `=` padding.  Decoding is permissive, so
//! envelopes survive stray whitespace, line breaks and quoting:
//!
//! - decoding stops at the first `=`;
//! - any character outside the standard alphabet is skipped;
//! - a dangling final character (6 bits, not enough for a byte) is discarded.
//!
//! A mangled envelope still fails at the AES-GCM tag check.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Decoder used after the input has been filtered down to alphabet characters.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Encodes `data` with the standard alphabet and `=` padding.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes `encoded`, skipping non-alphabet characters.
///
/// Never fails: input that contains no decodable data yields an empty vector.
pub fn decode_permissive(encoded: &str) -> Vec<u8> {
    let mut cleaned: Vec<u8> = encoded
        .bytes()
        .take_while(|&b| b != b'=')
        .filter(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
        .collect();

    // A single leftover sextet cannot form a byte.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT.decode(&cleaned).unwrap_or_default()
}
