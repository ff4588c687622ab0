//! This module defines the canonical, type-safe representation of the scalar
//! element kinds a typed array can hold.

use crate::error::{Result, StrataError};
use crate::traits::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of scalar element kinds.
///
/// The enum is the runtime tag of the type-erased array handle; generic code is
/// written once against [`Element`] and reached through a single `match`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
}

impl ElementKind {
    /// Every kind, in declaration order.
    pub const ALL: [ElementKind; 11] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Boolean,
    ];

    /// Size of one element in bytes, as stored in memory and on disk.
    pub fn size_of(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Boolean => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns `true` if the kind is a signed integer.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` if the kind is an unsigned integer.
    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    /// Returns `true` if the kind is a floating-point number.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Validates that a user-supplied scalar is representable by this kind.
    ///
    /// Integers accept any in-range value (fractions truncate toward zero on
    /// assignment). Floats reject finite values beyond their range. Booleans
    /// accept only `0` and `1`.
    pub fn check_range(&self, value: f64) -> Result<()> {
        let representable = crate::dispatch_kind!(*self, T => T::checked_from_f64(value).is_some());
        if representable {
            Ok(())
        } else {
            Err(StrataError::Range { value, kind: *self })
        }
    }
}

/// Provides the canonical string representation for an `ElementKind`.
impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These string representations are part of the persisted contract.
        write!(f, "{:?}", self)
    }
}

impl FromStr for ElementKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| StrataError::InvalidParameter(format!("Unknown element kind '{}'", s)))
    }
}
