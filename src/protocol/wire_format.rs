//! Wire format encoding and decoding.
//!
//! Every logical message on the wire is:
//! ```text
//! ┌────────────────┬──────────────────┐
//! │ Length         │ Payload          │
//! │ 3 bytes, BE    │ Length bytes     │
//! └────────────────┴──────────────────┘
//! ```
//!
//! No checksum, no version byte, no padding. The valid length range is
//! 1..=16777215; the decoder sign-extends the first byte, so a length with
//! the top bit set decodes negative and is rejected as a protocol violation
//! alongside zero.

use crate::error::{Result, TransportError};

/// Length prefix size in bytes (fixed, exactly 3).
pub const LENGTH_SIZE: usize = 3;

/// Maximum payload size encodable in the 3-byte prefix (2^24 - 1).
pub const MAX_PAYLOAD_SIZE: usize = 0xFF_FFFF;

/// Decode a 3-byte big-endian length prefix.
///
/// The first byte is sign-extended, so inputs with the top bit set produce
/// a negative value. Callers must treat any result `<= 0` as a protocol
/// violation, never as a valid frame.
#[inline]
pub fn decode_length(buf: &[u8; LENGTH_SIZE]) -> i32 {
    ((buf[0] as i8 as i32) << 16) | ((buf[1] as i32) << 8) | buf[2] as i32
}

/// Encode a payload length into a 3-byte big-endian prefix.
///
/// # Errors
///
/// Returns [`TransportError::InvalidLength`] if `len` is zero or exceeds
/// [`MAX_PAYLOAD_SIZE`].
pub fn encode_length(len: usize) -> Result<[u8; LENGTH_SIZE]> {
    if len == 0 || len > MAX_PAYLOAD_SIZE {
        return Err(TransportError::InvalidLength(len));
    }

    Ok([(len >> 16) as u8, (len >> 8) as u8, len as u8])
}

/// Encode a payload into a complete frame (length prefix + payload).
///
/// # Errors
///
/// Returns [`TransportError::InvalidLength`] if the payload is empty or
/// exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let prefix = encode_length(payload.len())?;
    let mut frame = Vec::with_capacity(LENGTH_SIZE + payload.len());
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(payload);
    Ok(frame)
}
