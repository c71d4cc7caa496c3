//! Fixed-width binary encoding of embedding vectors for persistence.

use crate::error::{IndexError, Result};

/// Encode a vector as little-endian `f32` bytes, 4 bytes per element.
#[must_use]
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// Decode a byte buffer produced by [`encode`] back into a vector.
///
/// # Errors
///
/// Returns [`IndexError::Codec`] if the buffer length is not a multiple of 4.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(IndexError::Codec { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
