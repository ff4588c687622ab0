//! The single dispatch points between runtime element kinds and monomorphized code.
//!
//! `dispatch_kind!` binds a type alias for a given `ElementKind` value, and
//! `dispatch_array!` binds the concrete `TypedArray<T>` held by an `AnyArray`.
//! Every kind-generic operation in the crate goes through one of these two
//! macros instead of re-testing the tag.

/// Expands `$body` once per element kind with `$t` bound to the concrete type.
///
/// # Example
/// ```
/// use strata::types::ElementKind;
/// let size = strata::dispatch_kind!(ElementKind::Int16, T => std::mem::size_of::<T>());
/// assert_eq!(size, 2);
/// ```
#[macro_export]
macro_rules! dispatch_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::types::ElementKind::Int8 => {
                #[allow(dead_code)]
                type $t = i8;
                $body
            }
            $crate::types::ElementKind::Int16 => {
                #[allow(dead_code)]
                type $t = i16;
                $body
            }
            $crate::types::ElementKind::Int32 => {
                #[allow(dead_code)]
                type $t = i32;
                $body
            }
            $crate::types::ElementKind::Int64 => {
                #[allow(dead_code)]
                type $t = i64;
                $body
            }
            $crate::types::ElementKind::UInt8 => {
                #[allow(dead_code)]
                type $t = u8;
                $body
            }
            $crate::types::ElementKind::UInt16 => {
                #[allow(dead_code)]
                type $t = u16;
                $body
            }
            $crate::types::ElementKind::UInt32 => {
                #[allow(dead_code)]
                type $t = u32;
                $body
            }
            $crate::types::ElementKind::UInt64 => {
                #[allow(dead_code)]
                type $t = u64;
                $body
            }
            $crate::types::ElementKind::Float32 => {
                #[allow(dead_code)]
                type $t = f32;
                $body
            }
            $crate::types::ElementKind::Float64 => {
                #[allow(dead_code)]
                type $t = f64;
                $body
            }
            $crate::types::ElementKind::Boolean => {
                #[allow(dead_code)]
                type $t = bool;
                $body
            }
        }
    };
}

/// Matches an `AnyArray` (by value, reference or mutable reference) and binds
/// the inner `TypedArray<T>` to `$arr` for every variant.
#[macro_export]
macro_rules! dispatch_array {
    ($any:expr, $arr:ident => $body:expr) => {
        match $any {
            $crate::arrays::AnyArray::Int8($arr) => $body,
            $crate::arrays::AnyArray::Int16($arr) => $body,
            $crate::arrays::AnyArray::Int32($arr) => $body,
            $crate::arrays::AnyArray::Int64($arr) => $body,
            $crate::arrays::AnyArray::UInt8($arr) => $body,
            $crate::arrays::AnyArray::UInt16($arr) => $body,
            $crate::arrays::AnyArray::UInt32($arr) => $body,
            $crate::arrays::AnyArray::UInt64($arr) => $body,
            $crate::arrays::AnyArray::Float32($arr) => $body,
            $crate::arrays::AnyArray::Float64($arr) => $body,
            $crate::arrays::AnyArray::Boolean($arr) => $body,
        }
    };
}
