//! The type-erased array handle.
//!
//! `AnyArray` is a closed enum over every `TypedArray<T>` the engine supports.
//! Generic callers ask it for `describe()` and branch on the kind once, or
//! downcast to the concrete type with `downcast_ref::<T>()`.

use crate::arrays::typed_array::{ArrayInfo, TypedArray};
use crate::dispatch_array;
use crate::error::{Result, StrataError};
use crate::traits::Element;
use crate::types::ElementKind;

#[derive(Debug, Clone, PartialEq)]
pub enum AnyArray {
    Int8(TypedArray<i8>),
    Int16(TypedArray<i16>),
    Int32(TypedArray<i32>),
    Int64(TypedArray<i64>),
    UInt8(TypedArray<u8>),
    UInt16(TypedArray<u16>),
    UInt32(TypedArray<u32>),
    UInt64(TypedArray<u64>),
    Float32(TypedArray<f32>),
    Float64(TypedArray<f64>),
    Boolean(TypedArray<bool>),
}

impl<T: Element> From<TypedArray<T>> for AnyArray {
    fn from(array: TypedArray<T>) -> Self {
        T::wrap(array)
    }
}

impl AnyArray {
    /// Creates an array of the given runtime kind, every element set to `init`
    /// (converted with cast semantics).
    pub fn new(
        kind: ElementKind,
        name: &str,
        num_tuples: usize,
        component_dims: Vec<usize>,
        init: f64,
    ) -> Result<Self> {
        crate::dispatch_kind!(kind, T => {
            TypedArray::<T>::new(name, num_tuples, component_dims, T::from_f64(init)).map(T::wrap)
        })
    }

    /// Creates a zero-tuple, shape-only array of the given runtime kind.
    pub fn unallocated(kind: ElementKind, name: &str, component_dims: Vec<usize>) -> Result<Self> {
        crate::dispatch_kind!(kind, T => {
            TypedArray::<T>::unallocated(name, component_dims).map(T::wrap)
        })
    }

    /// Rebuilds an array from its little-endian byte image.
    pub fn from_le_bytes(
        kind: ElementKind,
        name: &str,
        component_dims: Vec<usize>,
        bytes: &[u8],
    ) -> Result<Self> {
        crate::dispatch_kind!(kind, T => {
            let data = T::decode_le(bytes)?;
            TypedArray::<T>::from_vec(name, component_dims, data).map(T::wrap)
        })
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        dispatch_array!(self, a => Element::encode_le(a.as_slice()))
    }

    pub fn kind(&self) -> ElementKind {
        dispatch_array!(self, a => a.kind())
    }

    pub fn name(&self) -> &str {
        dispatch_array!(self, a => a.name())
    }

    pub fn set_name(&mut self, name: &str) {
        dispatch_array!(self, a => a.set_name(name))
    }

    pub fn num_tuples(&self) -> usize {
        dispatch_array!(self, a => a.num_tuples())
    }

    pub fn num_components(&self) -> usize {
        dispatch_array!(self, a => a.num_components())
    }

    pub fn component_dims(&self) -> &[usize] {
        dispatch_array!(self, a => a.component_dims())
    }

    pub fn is_allocated(&self) -> bool {
        dispatch_array!(self, a => a.is_allocated())
    }

    /// Shape-only copy; see [`TypedArray::placeholder`].
    pub fn placeholder(&self) -> AnyArray {
        dispatch_array!(self, a => Element::wrap(a.placeholder()))
    }

    pub fn describe(&self) -> ArrayInfo {
        dispatch_array!(self, a => a.describe())
    }

    pub fn resize(&mut self, num_tuples: usize) -> Result<()> {
        dispatch_array!(self, a => a.resize(num_tuples))
    }

    /// Resizes, filling new elements with `init` converted to the element kind.
    pub fn resize_with(&mut self, num_tuples: usize, init: f64) -> Result<()> {
        dispatch_array!(self, a => a.resize_with(num_tuples, Element::from_f64(init)))
    }

    pub fn initialize_with_value(&mut self, value: f64) {
        dispatch_array!(self, a => a.initialize_with_value(Element::from_f64(value)))
    }

    pub fn erase_tuples(&mut self, indices: &[usize]) -> Result<()> {
        dispatch_array!(self, a => a.erase_tuples(indices))
    }

    pub fn copy_tuple(&mut self, src: usize, dst: usize) -> Result<()> {
        dispatch_array!(self, a => a.copy_tuple(src, dst))
    }

    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn reorder_copy(&self, new_order: &[usize]) -> Option<Self> {
        dispatch_array!(self, a => a.reorder_copy(new_order).map(AnyArray::from))
    }

    /// Reads one component as `f64`, whatever the element kind.
    pub fn value_f64(&self, tuple: usize, component: usize) -> Option<f64> {
        dispatch_array!(self, a => a.value(tuple, component).map(Element::to_f64))
    }

    /// Appends the tuples of `other` (same kind and component shape) after the
    /// current ones.
    pub fn append(&mut self, other: &AnyArray) -> Result<()> {
        if other.kind() != self.kind() || other.component_dims() != self.component_dims() {
            return Err(StrataError::InvalidParameter(format!(
                "cannot append '{}' ({} {:?}) to '{}' ({} {:?})",
                other.name(),
                other.kind(),
                other.component_dims(),
                self.name(),
                self.kind(),
                self.component_dims()
            )));
        }
        let start = self.num_tuples();
        let count = other.num_tuples();
        self.resize(start + count)?;
        dispatch_array!(self, a => {
            let src = Element::downcast_ref(other)
                .ok_or_else(|| StrataError::Internal("append kinds diverged".into()))?;
            a.copy_from(start, src, 0, count)
        })
    }

    pub fn downcast_ref<T: Element>(&self) -> Option<&TypedArray<T>> {
        T::downcast_ref(self)
    }

    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut TypedArray<T>> {
        T::downcast_mut(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_for_every_kind() {
        for kind in ElementKind::ALL {
            let any = AnyArray::new(kind, "x", 4, vec![2], 1.0).unwrap();
            let info = any.describe();
            assert_eq!(info.kind, kind);
            assert_eq!(info.num_tuples, 4);
            assert_eq!(any.num_components(), 2);
            assert_eq!(any.value_f64(3, 1), Some(1.0), "init value lost for {}", kind);
        }
    }

    #[test]
    fn test_downcast_only_matches_own_kind() {
        let mut any: AnyArray = TypedArray::<u8>::new("a", 3, vec![1], 7).unwrap().into();
        assert!(any.downcast_ref::<u8>().is_some());
        assert!(any.downcast_ref::<i8>().is_none());
        assert!(any.downcast_ref::<bool>().is_none());
        any.downcast_mut::<u8>().unwrap().set_value(0, 0, 9).unwrap();
        assert_eq!(any.value_f64(0, 0), Some(9.0));
    }

    #[test]
    fn test_le_bytes_roundtrip_preserves_shape() {
        let source: AnyArray =
            TypedArray::from_vec("v", vec![3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap()
                .into();
        let bytes = source.to_le_bytes();
        let rebuilt = AnyArray::from_le_bytes(ElementKind::Float32, "v", vec![3], &bytes).unwrap();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_append_requires_matching_shape() {
        let mut a: AnyArray = TypedArray::from_vec("a", vec![1], vec![1i32, 2]).unwrap().into();
        let b: AnyArray = TypedArray::from_vec("b", vec![1], vec![3i32]).unwrap().into();
        a.append(&b).unwrap();
        assert_eq!(a.downcast_ref::<i32>().unwrap().as_slice(), &[1, 2, 3]);

        let c: AnyArray = TypedArray::from_vec("c", vec![1], vec![3i64]).unwrap().into();
        assert!(a.append(&c).is_err());
    }
}
