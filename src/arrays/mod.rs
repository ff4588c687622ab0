//! Typed element storage: the generic `TypedArray<T>`, its type-erased handle
//! `AnyArray`, and the variable-length `DynamicListArray` used for adjacency.

pub mod any_array;
pub mod dynamic_list;
pub mod typed_array;

pub use any_array::AnyArray;
pub use dynamic_list::DynamicListArray;
pub use typed_array::{ArrayInfo, TypedArray};
