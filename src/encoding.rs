//! bech32 envelopes
//!
//! thin layer over the `bech32` crate that only speaks the classic bech32 variant used by NIP-19
//! and enforces the length limit other nostr implementations use.

use bech32::{FromBase32, ToBase32, Variant};
use thiserror::Error;

/// longest bech32 string we will produce
pub const MAX_ENCODED_LEN: usize = 5000;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("bech32 error: {0}")]
    Bech32(#[from] bech32::Error),

    #[error("empty bech32 string")]
    Empty,

    #[error("expected bech32, got bech32m")]
    WrongVariant,

    #[error("encoded string would have {0} chars, the limit is 5000")]
    TooLong(usize),

    #[error("truncated TLV entry at offset {0}")]
    TruncatedTlv(usize),

    #[error("invalid TLV length field at offset {0}")]
    InvalidTlvLength(usize),

    #[error("kind should be 4 bytes, got {0}")]
    InvalidKindLength(usize),
}

/// encode `payload` under the human-readable prefix `hrp`
pub fn encode(hrp: &str, payload: &[u8]) -> Result<String, EncodingError> {
    let encoded_len = hrp.len() + 1 + (payload.len() * 8).div_ceil(5) + 6;
    if encoded_len > MAX_ENCODED_LEN {
        return Err(EncodingError::TooLong(encoded_len));
    }

    Ok(bech32::encode(hrp, payload.to_base32(), Variant::Bech32)?)
}

/// decode a bech32 string into its (lowercase) prefix and payload bytes
pub fn decode(s: &str) -> Result<(String, Vec<u8>), EncodingError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(EncodingError::Empty);
    }

    let (hrp, data, variant) = bech32::decode(s)?;
    if variant != Variant::Bech32 {
        return Err(EncodingError::WrongVariant);
    }

    let payload = Vec::<u8>::from_base32(&data)?;
    Ok((hrp, payload))
}

/// like [`decode`], but an empty or blank input means "nothing was given"
///
/// only meant for optional key fields.
pub fn decode_optional(s: &str) -> Result<Option<(String, Vec<u8>)>, EncodingError> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    decode(s).map(Some)
}
