//! The owned, resizable, homogeneous element buffer at the bottom of the data model.
//!
//! A `TypedArray<T>` stores `N` tuples of `C` components contiguously (tuple-major).
//! `C` is the product of a component-dimension vector, so a 3x3 tensor per tuple is
//! `component_dims = [3, 3]`.

use ndarray::{ArrayView2, ArrayViewMut2};

use crate::error::{Result, StrataError};
use crate::traits::Element;
use crate::types::ElementKind;
use crate::utils::checked_product;

/// The type-erased description of an array's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub kind: ElementKind,
    pub num_tuples: usize,
    pub component_dims: Vec<usize>,
    pub allocated: bool,
}

impl ArrayInfo {
    pub fn num_components(&self) -> usize {
        self.component_dims.iter().product()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedArray<T: Element> {
    name: String,
    num_tuples: usize,
    component_dims: Vec<usize>,
    num_components: usize,
    data: Vec<T>,
    allocated: bool,
}

impl<T: Element> TypedArray<T> {
    //==============================================================================
    // Construction
    //==============================================================================

    /// Creates an array of `num_tuples` tuples with every element set to `init`.
    pub fn new(name: &str, num_tuples: usize, component_dims: Vec<usize>, init: T) -> Result<Self> {
        let mut array = Self::unallocated(name, component_dims)?;
        array.resize_with(num_tuples, init)?;
        Ok(array)
    }

    /// Creates a zero-tuple array that records only its shape. This is what the
    /// preflight pass creates: schema without storage.
    pub fn unallocated(name: &str, component_dims: Vec<usize>) -> Result<Self> {
        let num_components = validate_component_dims(&component_dims)?;
        Ok(Self {
            name: name.to_string(),
            num_tuples: 0,
            component_dims,
            num_components,
            data: Vec::new(),
            allocated: false,
        })
    }

    /// Wraps existing storage. `data.len()` must be a multiple of the component count.
    pub fn from_vec(name: &str, component_dims: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let num_components = validate_component_dims(&component_dims)?;
        if data.len() % num_components != 0 {
            return Err(StrataError::Allocation(format!(
                "{} elements cannot be split into tuples of {} components",
                data.len(),
                num_components
            )));
        }
        Ok(Self {
            name: name.to_string(),
            num_tuples: data.len() / num_components,
            component_dims,
            num_components,
            data,
            allocated: true,
        })
    }

    //==============================================================================
    // Shape Accessors
    //==============================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn component_dims(&self) -> &[usize] {
        &self.component_dims
    }

    /// Total element count, `N * C`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    pub fn describe(&self) -> ArrayInfo {
        ArrayInfo {
            kind: T::KIND,
            num_tuples: self.num_tuples,
            component_dims: self.component_dims.clone(),
            allocated: self.allocated,
        }
    }

    //==============================================================================
    // Element Access
    //==============================================================================

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn value(&self, tuple: usize, component: usize) -> Option<T> {
        if tuple >= self.num_tuples || component >= self.num_components {
            return None;
        }
        Some(self.data[tuple * self.num_components + component])
    }

    pub fn set_value(&mut self, tuple: usize, component: usize, value: T) -> Result<()> {
        if tuple >= self.num_tuples {
            return Err(StrataError::IndexOutOfRange { index: tuple, len: self.num_tuples });
        }
        if component >= self.num_components {
            return Err(StrataError::IndexOutOfRange {
                index: component,
                len: self.num_components,
            });
        }
        self.data[tuple * self.num_components + component] = value;
        Ok(())
    }

    pub fn tuple(&self, index: usize) -> Option<&[T]> {
        if index >= self.num_tuples {
            return None;
        }
        let start = index * self.num_components;
        Some(&self.data[start..start + self.num_components])
    }

    pub fn tuple_mut(&mut self, index: usize) -> Option<&mut [T]> {
        if index >= self.num_tuples {
            return None;
        }
        let start = index * self.num_components;
        Some(&mut self.data[start..start + self.num_components])
    }

    /// A `(num_tuples, num_components)` view over the storage.
    pub fn view2(&self) -> Result<ArrayView2<'_, T>> {
        ArrayView2::from_shape((self.num_tuples, self.num_components), &self.data)
            .map_err(|e| StrataError::Internal(format!("array '{}' view: {}", self.name, e)))
    }

    pub fn view2_mut(&mut self) -> Result<ArrayViewMut2<'_, T>> {
        ArrayViewMut2::from_shape((self.num_tuples, self.num_components), &mut self.data)
            .map_err(|e| StrataError::Internal(format!("array '{}' view: {}", self.name, e)))
    }

    //==============================================================================
    // Mutation
    //==============================================================================

    /// Resizes to exactly `num_tuples` tuples, filling new tuples with `T::default()`.
    pub fn resize(&mut self, num_tuples: usize) -> Result<()> {
        self.resize_with(num_tuples, T::default())
    }

    /// Resizes to exactly `num_tuples` tuples. Existing elements that still fit
    /// are preserved; new elements are set to `init`.
    pub fn resize_with(&mut self, num_tuples: usize, init: T) -> Result<()> {
        let total = checked_product(&[num_tuples, self.num_components])?;
        let byte_len = total.checked_mul(std::mem::size_of::<T>());
        if byte_len.map_or(true, |b| b > isize::MAX as usize) {
            return Err(StrataError::Allocation(format!(
                "array '{}' cannot hold {} tuples of {} components",
                self.name, num_tuples, self.num_components
            )));
        }
        if total > self.data.len() {
            self.data
                .try_reserve_exact(total - self.data.len())
                .map_err(|e| StrataError::Allocation(format!("array '{}': {}", self.name, e)))?;
        }
        self.data.resize(total, init);
        if total < self.data.capacity() / 2 {
            self.data.shrink_to_fit();
        }
        self.num_tuples = num_tuples;
        self.allocated = true;
        Ok(())
    }

    pub fn initialize_with_value(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Removes the given tuples and shifts the remaining ones down, preserving order.
    ///
    /// Indices may be unsorted and repeated. Every index is validated before
    /// anything moves, so a failure leaves the array untouched.
    pub fn erase_tuples(&mut self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.num_tuples) {
            return Err(StrataError::IndexOutOfRange { index: bad, len: self.num_tuples });
        }

        let mut doomed = indices.to_vec();
        doomed.sort_unstable();
        doomed.dedup();

        if doomed.len() == self.num_tuples {
            return self.resize(0);
        }

        // Single compaction pass: every surviving tuple moves down at most once.
        let c = self.num_components;
        let mut write = 0usize;
        let mut next_doomed = doomed.iter().peekable();
        for read in 0..self.num_tuples {
            if next_doomed.peek() == Some(&&read) {
                next_doomed.next();
                continue;
            }
            if read != write {
                self.data.copy_within(read * c..(read + 1) * c, write * c);
            }
            write += 1;
        }
        self.resize(write)
    }

    /// Overwrites tuple `dst` with the components of tuple `src`.
    pub fn copy_tuple(&mut self, src: usize, dst: usize) -> Result<()> {
        for index in [src, dst] {
            if index >= self.num_tuples {
                return Err(StrataError::IndexOutOfRange { index, len: self.num_tuples });
            }
        }
        if src != dst {
            let c = self.num_components;
            self.data.copy_within(src * c..(src + 1) * c, dst * c);
        }
        Ok(())
    }

    /// Copies `count` tuples from `other` starting at `src_start` into this array
    /// starting at `dst_start`. Component counts must match.
    pub fn copy_from(
        &mut self,
        dst_start: usize,
        other: &TypedArray<T>,
        src_start: usize,
        count: usize,
    ) -> Result<()> {
        if other.num_components != self.num_components {
            return Err(StrataError::InvalidParameter(format!(
                "cannot copy tuples of {} components into '{}' with {}",
                other.num_components, self.name, self.num_components
            )));
        }
        if src_start + count > other.num_tuples {
            return Err(StrataError::IndexOutOfRange {
                index: src_start + count,
                len: other.num_tuples,
            });
        }
        if dst_start + count > self.num_tuples {
            return Err(StrataError::IndexOutOfRange {
                index: dst_start + count,
                len: self.num_tuples,
            });
        }
        let c = self.num_components;
        self.data[dst_start * c..(dst_start + count) * c]
            .copy_from_slice(&other.data[src_start * c..(src_start + count) * c]);
        Ok(())
    }

    /// Returns an independent array with identical name, shape and contents.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// An unallocated array with this one's name and component shape.
    pub fn placeholder(&self) -> Self {
        Self {
            name: self.name.clone(),
            num_tuples: 0,
            component_dims: self.component_dims.clone(),
            num_components: self.num_components,
            data: Vec::new(),
            allocated: false,
        }
    }

    /// Returns a copy in which source tuple `i` lands at `new_order[i]`.
    ///
    /// Returns `None` unless `new_order` is a permutation of `0..num_tuples`.
    pub fn reorder_copy(&self, new_order: &[usize]) -> Option<Self> {
        if new_order.len() != self.num_tuples {
            return None;
        }
        let mut seen = bitvec::vec::BitVec::<usize, bitvec::order::Lsb0>::repeat(false, self.num_tuples);
        for &dst in new_order {
            if dst >= self.num_tuples || seen[dst] {
                return None;
            }
            seen.set(dst, true);
        }
        let c = self.num_components;
        let mut copy = self.clone();
        for (src, &dst) in new_order.iter().enumerate() {
            copy.data[dst * c..(dst + 1) * c].copy_from_slice(&self.data[src * c..(src + 1) * c]);
        }
        Some(copy)
    }
}

fn validate_component_dims(component_dims: &[usize]) -> Result<usize> {
    let num_components = checked_product(component_dims)?;
    if num_components == 0 {
        return Err(StrataError::Allocation(format!(
            "component dimensions {:?} must be non-empty and positive",
            component_dims
        )));
    }
    Ok(num_components)
}
