//! Zstandard framing for persisted payloads.
//!
//! A compressed payload is the uncompressed length as a little-endian `u64`,
//! followed by one zstd frame. An empty input encodes to an empty payload.
//! This module is a safe, panic-free wrapper around the `zstd` crate.

use std::io::Write;

use crate::error::{Result, StrataError};

const LENGTH_PREFIX: usize = 8;

//==================================================================================
// 1. Public API
//==================================================================================

/// Compresses `input_bytes`, prepending the uncompressed size.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2 + LENGTH_PREFIX);
    let uncompressed_len = input_bytes.len() as u64;
    output_buf.extend_from_slice(&uncompressed_len.to_le_bytes());

    let mut encoder = zstd::stream::Encoder::new(&mut output_buf, level)
        .map_err(|e| StrataError::Compression(e.to_string()))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| StrataError::Compression(e.to_string()))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| StrataError::Compression(e.to_string()))?;

    Ok(output_buf)
}

/// Reverses [`encode`], checking the decoded size against the prefix.
pub fn decode(input_bytes: &[u8]) -> Result<Vec<u8>> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let (prefix, compressed_data) = input_bytes
        .split_first_chunk::<LENGTH_PREFIX>()
        .ok_or_else(|| {
            StrataError::Compression("Input stream too short to contain size header.".to_string())
        })?;
    let uncompressed_len = usize::try_from(u64::from_le_bytes(*prefix)).map_err(|_| {
        StrataError::Compression("Uncompressed size does not fit in memory.".to_string())
    })?;

    let mut decompressed_data = Vec::new();
    decompressed_data
        .try_reserve_exact(uncompressed_len)
        .map_err(|e| StrataError::Allocation(e.to_string()))?;
    zstd::stream::copy_decode(compressed_data, &mut decompressed_data)
        .map_err(|e| StrataError::Compression(e.to_string()))?;

    if decompressed_data.len() != uncompressed_len {
        return Err(StrataError::Compression(format!(
            "Decompressed size does not match header. Expected {}, got {}.",
            uncompressed_len,
            decompressed_data.len()
        )));
    }

    Ok(decompressed_data)
}

//==================================================================================
// 2. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highly_compressible_payload_shrinks() {
        let original_bytes = vec![42u8; 10_000];
        let compressed_bytes = encode(&original_bytes, 5).unwrap();
        // 8-byte length prefix plus a tiny frame.
        assert!(compressed_bytes.len() < 50);
        assert_eq!(decode(&compressed_bytes).unwrap(), original_bytes);
    }

    #[test]
    fn test_empty_payload_is_empty() {
        assert!(encode(&[], 3).unwrap().is_empty());
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_data_is_a_compression_error() {
        assert!(matches!(decode(&[1, 2, 3, 4, 5]), Err(StrataError::Compression(_))));

        let mut tampered = encode(b"some payload bytes, some payload bytes", 3).unwrap();
        tampered[0] = tampered[0].wrapping_add(1);
        assert!(decode(&tampered).is_err());
    }
}
