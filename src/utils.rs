//! This module provides a set of shared, low-level utility functions used
//! throughout the strata core.
//!
//! Its primary responsibilities include:
//! 1.  Providing safe, validated conversions between raw byte slices and typed slices.
//! 2.  Checked size arithmetic for shapes given as dimension vectors.

use crate::error::{Result, StrataError};

//==================================================================================
// 1. Byte <-> Typed Conversions
//==================================================================================

/// Safely reinterprets a byte slice as a slice of a `Pod` type without copying.
///
/// # Errors
/// Returns `StrataError::Format` if the length is not a multiple of the element
/// size or the slice is misaligned for `T`.
pub fn safe_bytes_to_typed_slice<T>(bytes: &[u8]) -> Result<&[T]>
where
    T: bytemuck::Pod,
{
    bytemuck::try_cast_slice(bytes)
        .map_err(|e| StrataError::Format(format!("Failed to cast byte slice: {}", e)))
}

/// Copies a byte slice into an owned, correctly aligned vector of `T`.
///
/// Unlike [`safe_bytes_to_typed_slice`] this never fails on alignment, which
/// matters for payloads sliced out of the middle of a file buffer.
pub fn bytes_to_typed_vec<T>(bytes: &[u8]) -> Result<Vec<T>>
where
    T: bytemuck::Pod,
{
    let width = std::mem::size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(StrataError::Format(format!(
            "Buffer length mismatch: expected a multiple of {}, got {}",
            width,
            bytes.len()
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Little-endian byte image of a typed slice.
pub fn typed_slice_to_bytes<T>(data: &[T]) -> Vec<u8>
where
    T: bytemuck::Pod,
{
    bytemuck::cast_slice(data).to_vec()
}

//==================================================================================
// 2. Shape Arithmetic
//==================================================================================

/// Product of a dimension vector, or an `Allocation` error on overflow.
///
/// An empty vector describes nothing and has a product of zero.
pub fn checked_product(dims: &[usize]) -> Result<usize> {
    if dims.is_empty() {
        return Ok(0);
    }
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d).ok_or_else(|| {
            StrataError::Allocation(format!("dimension product {:?} overflows usize", dims))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_typed_vec_checks_length() {
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];
        assert_eq!(bytes_to_typed_vec::<u32>(&bytes).unwrap(), vec![1, 2]);
        assert!(bytes_to_typed_vec::<u32>(&bytes[..7]).is_err());
    }

    #[test]
    fn test_bytes_to_typed_vec_ignores_alignment() {
        let bytes = [0u8, 1, 0, 2, 0];
        // Offset by one byte so the source is misaligned for u16.
        assert_eq!(bytes_to_typed_vec::<u16>(&bytes[1..]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_typed_slice_roundtrip() {
        let data = [1.5f32, -2.0];
        let bytes = typed_slice_to_bytes(&data);
        assert_eq!(bytes_to_typed_vec::<f32>(&bytes).unwrap(), data);

        // A view borrowed from aligned storage can be cast in place.
        let words = [7u32, 9];
        let view: &[u8] = bytemuck::cast_slice(&words);
        assert_eq!(safe_bytes_to_typed_slice::<u32>(view).unwrap(), &words);
    }

    #[test]
    fn test_checked_product() {
        assert_eq!(checked_product(&[2, 3, 4]).unwrap(), 24);
        assert_eq!(checked_product(&[]).unwrap(), 0);
        assert!(matches!(
            checked_product(&[usize::MAX, 2]),
            Err(StrataError::Allocation(_))
        ));
    }
}
