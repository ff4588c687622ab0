//! The built-in filters.
//!
//! Each filter is a plain struct holding its parameters plus a `FilterState`,
//! and is registered by class name so a stored pipeline can rebuild it.

pub mod conditional_set_value;
pub mod element_neighbors;
pub mod io;
pub mod structure;


use crate::filter::FilterRegistry;

pub use conditional_set_value::ConditionalSetValue;
pub use element_neighbors::FindElementNeighbors;
pub use io::{DataContainerReader, DataContainerWriter};
pub use structure::{CreateAttributeMatrix, CreateDataArray, CreateDataContainer, RenameDataArray};

/// Adds a factory for every built-in filter.
pub fn register_builtin_filters(registry: &mut FilterRegistry) {
    registry.register_filter::<CreateDataContainer>();
    registry.register_filter::<CreateAttributeMatrix>();
    registry.register_filter::<CreateDataArray>();
    registry.register_filter::<RenameDataArray>();
    registry.register_filter::<ConditionalSetValue>();
    registry.register_filter::<FindElementNeighbors>();
    registry.register_filter::<DataContainerReader>();
    registry.register_filter::<DataContainerWriter>();
}
