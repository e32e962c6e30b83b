//! Tolerant base64 handling for manifest payloads.
//!
//! Links get copy-pasted through shells, chat clients and browsers, which
//! swap alphabets, drop padding and add stray escapes or line breaks.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64")]
    InvalidEncoding,

    #[error("payload does not decode to UTF-8 text")]
    InvalidUtf8,
}

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Decode a base64 or base64url payload into text.
pub fn decode(input: &str) -> Result<String, DecodeError> {
    let standard: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .filter(|c| !c.is_whitespace())
        .collect();

    let unescaped = match percent_decode_str(&standard).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => standard,
    };

    if !has_base64_shape(&unescaped) || unescaped.len() % 4 == 1 {
        return Err(DecodeError::InvalidEncoding);
    }

    let mut padded = unescaped;
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let bytes = LENIENT
        .decode(padded.as_bytes())
        .map_err(|_| DecodeError::InvalidEncoding)?;

    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// URL-safe alphabet, no padding. This is what link generators emit.
pub fn encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

// `^[A-Za-z0-9+/]*={0,2}$`
fn has_base64_shape(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    s.len() - body.len() <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}
