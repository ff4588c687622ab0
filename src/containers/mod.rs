//! The container hierarchy: `DataContainerArray` -> `DataContainer` ->
//! `AttributeMatrix` -> arrays, plus the `DataArrayPath` that addresses it.

pub mod attribute_matrix;
pub mod data_container;
pub mod data_container_array;
pub mod path;

pub use attribute_matrix::{AttributeMatrix, MatrixCategory};
pub use data_container::DataContainer;
pub use data_container_array::DataContainerArray;
pub use path::DataArrayPath;
