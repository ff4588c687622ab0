//! This module defines the `Element` trait that links each Rust scalar type to
//! its runtime `ElementKind` and to its variant of the type-erased handle.

use crate::arrays::{AnyArray, TypedArray};
use crate::error::Result;
use crate::types::ElementKind;
use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};
use num_traits::{Bounded, NumCast, ToPrimitive};
use std::fmt::Debug;

/// A scalar type that can be stored in a [`TypedArray`].
pub trait Element: Copy + Default + PartialEq + PartialOrd + Debug + Send + Sync + 'static {
    /// The runtime tag for this type.
    const KIND: ElementKind;

    /// Converts with `as`-cast semantics: out-of-range values saturate or wrap
    /// exactly as the target numeric cast does, fractions truncate.
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;

    /// Converts only if the value is representable by this type.
    fn checked_from_f64(value: f64) -> Option<Self>;

    /// Wraps a typed array in the matching `AnyArray` variant.
    fn wrap(array: TypedArray<Self>) -> AnyArray;

    fn downcast_ref(any: &AnyArray) -> Option<&TypedArray<Self>>;

    fn downcast_mut(any: &mut AnyArray) -> Option<&mut TypedArray<Self>>;

    /// Little-endian byte image of a slice of elements.
    fn encode_le(values: &[Self]) -> Vec<u8>;

    fn decode_le(bytes: &[u8]) -> Result<Vec<Self>>;
}

macro_rules! impl_numeric_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const KIND: ElementKind = ElementKind::$variant;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            fn checked_from_f64(value: f64) -> Option<Self> {
                if ElementKind::$variant.is_float() {
                    // Non-finite values are representable by both float kinds.
                    let max = ToPrimitive::to_f64(&<$t as Bounded>::max_value())?;
                    if value.is_finite() && value.abs() > max {
                        return None;
                    }
                    return Some(value as $t);
                }
                <$t as NumCast>::from(value)
            }

            fn wrap(array: TypedArray<Self>) -> AnyArray {
                AnyArray::$variant(array)
            }

            fn downcast_ref(any: &AnyArray) -> Option<&TypedArray<Self>> {
                match any {
                    AnyArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn downcast_mut(any: &mut AnyArray) -> Option<&mut TypedArray<Self>> {
                match any {
                    AnyArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn encode_le(values: &[Self]) -> Vec<u8> {
                typed_slice_to_bytes(values)
            }

            fn decode_le(bytes: &[u8]) -> Result<Vec<Self>> {
                bytes_to_typed_vec(bytes)
            }
        }
    };
}

impl_numeric_element!(i8, Int8);
impl_numeric_element!(i16, Int16);
impl_numeric_element!(i32, Int32);
impl_numeric_element!(i64, Int64);
impl_numeric_element!(u8, UInt8);
impl_numeric_element!(u16, UInt16);
impl_numeric_element!(u32, UInt32);
impl_numeric_element!(u64, UInt64);
impl_numeric_element!(f32, Float32);
impl_numeric_element!(f64, Float64);

// `bool` is not `Pod`, so it is stored as one byte per element.
impl Element for bool {
    const KIND: ElementKind = ElementKind::Boolean;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn checked_from_f64(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(false)
        } else if value == 1.0 {
            Some(true)
        } else {
            None
        }
    }

    fn wrap(array: TypedArray<Self>) -> AnyArray {
        AnyArray::Boolean(array)
    }

    fn downcast_ref(any: &AnyArray) -> Option<&TypedArray<Self>> {
        match any {
            AnyArray::Boolean(array) => Some(array),
            _ => None,
        }
    }

    fn downcast_mut(any: &mut AnyArray) -> Option<&mut TypedArray<Self>> {
        match any {
            AnyArray::Boolean(array) => Some(array),
            _ => None,
        }
    }

    fn encode_le(values: &[Self]) -> Vec<u8> {
        values.iter().map(|&v| v as u8).collect()
    }

    fn decode_le(bytes: &[u8]) -> Result<Vec<Self>> {
        Ok(bytes.iter().map(|&b| b != 0).collect())
    }
}
