//! The registry of data containers handed to every filter invocation.
//!
//! Lookups by `DataArrayPath` run container -> matrix -> array and report the
//! first failing step with its own error, so callers can tell "no such
//! container" apart from "container exists, array does not".

use std::collections::BTreeMap;

use crate::arrays::{AnyArray, TypedArray};
use crate::containers::attribute_matrix::AttributeMatrix;
use crate::containers::data_container::DataContainer;
use crate::containers::path::DataArrayPath;
use crate::error::{Result, StrataError};
use crate::traits::Element;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContainerArray {
    containers: BTreeMap<String, DataContainer>,
}

impl DataContainerArray {
    pub fn new() -> Self {
        Self::default()
    }

    //==============================================================================
    // Containers
    //==============================================================================

    /// Inserts a container under its own name, replacing (and returning) any previous one.
    pub fn add_container(&mut self, container: DataContainer) -> Result<Option<DataContainer>> {
        if container.name().is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        Ok(self.containers.insert(container.name().to_string(), container))
    }

    /// Creates an empty container; fails if the name is empty or taken.
    pub fn create_container(&mut self, name: &str) -> Result<&mut DataContainer> {
        if name.is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        if self.containers.contains_key(name) {
            return Err(StrataError::AlreadyExists(format!("Data container '{}'", name)));
        }
        Ok(self
            .containers
            .entry(name.to_string())
            .or_insert_with(|| DataContainer::new(name)))
    }

    pub fn get_container(&self, name: &str) -> Option<&DataContainer> {
        self.containers.get(name)
    }

    pub fn get_container_mut(&mut self, name: &str) -> Option<&mut DataContainer> {
        self.containers.get_mut(name)
    }

    pub fn contains_container(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    pub fn remove_container(&mut self, name: &str) -> Option<DataContainer> {
        self.containers.remove(name)
    }

    pub fn rename_container(&mut self, old: &str, new: &str, overwrite: bool) -> Result<()> {
        if new.is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        if !self.containers.contains_key(old) {
            return Err(StrataError::SourceMissing(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.containers.contains_key(new) && !overwrite {
            return Err(StrataError::TargetExists(new.to_string()));
        }
        if let Some(mut container) = self.containers.remove(old) {
            container.set_name(new);
            self.containers.insert(new.to_string(), container);
        }
        Ok(())
    }

    /// Container names in sorted order.
    pub fn container_names(&self) -> Vec<String> {
        self.containers.keys().cloned().collect()
    }

    pub fn containers(&self) -> impl Iterator<Item = &DataContainer> {
        self.containers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Moves every container of `other` into this registry.
    ///
    /// Without `overwrite`, a name collision fails before anything moves.
    pub fn merge_from(&mut self, other: DataContainerArray, overwrite: bool) -> Result<()> {
        if !overwrite {
            if let Some(name) = other.containers.keys().find(|n| self.containers.contains_key(*n)) {
                return Err(StrataError::AlreadyExists(format!("Data container '{}'", name)));
            }
        }
        self.containers.extend(other.containers);
        Ok(())
    }

    //==============================================================================
    // Path Resolution
    //==============================================================================

    /// Resolves a container by name.
    pub fn container(&self, name: &str) -> Result<&DataContainer> {
        if name.is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        self.containers
            .get(name)
            .ok_or_else(|| StrataError::ContainerMissing { container: name.to_string() })
    }

    pub fn container_mut(&mut self, name: &str) -> Result<&mut DataContainer> {
        if name.is_empty() {
            return Err(StrataError::EmptyName("data container".into()));
        }
        self.containers
            .get_mut(name)
            .ok_or_else(|| StrataError::ContainerMissing { container: name.to_string() })
    }

    /// Resolves the container and matrix parts of `path`; the array part is ignored.
    pub fn matrix(&self, path: &DataArrayPath) -> Result<&AttributeMatrix> {
        let container = self.container(&path.container)?;
        container.get_matrix(&path.matrix).ok_or_else(|| StrataError::MatrixMissing {
            container: path.container.clone(),
            matrix: path.matrix.clone(),
        })
    }

    pub fn matrix_mut(&mut self, path: &DataArrayPath) -> Result<&mut AttributeMatrix> {
        let container = self.container_mut(&path.container)?;
        container.get_matrix_mut(&path.matrix).ok_or_else(|| StrataError::MatrixMissing {
            container: path.container.clone(),
            matrix: path.matrix.clone(),
        })
    }

    /// Resolves a full array path, reporting the first missing level.
    pub fn resolve(&self, path: &DataArrayPath) -> Result<&AnyArray> {
        path.validate()?;
        self.matrix(path)?
            .get_array(&path.array)
            .ok_or_else(|| StrataError::ArrayMissing(path.clone()))
    }

    pub fn resolve_mut(&mut self, path: &DataArrayPath) -> Result<&mut AnyArray> {
        path.validate()?;
        self.matrix_mut(path)?
            .get_array_mut(&path.array)
            .ok_or_else(|| StrataError::ArrayMissing(path.clone()))
    }

    /// Resolves and downcasts; a different element kind is a `KindMismatch`.
    pub fn resolve_typed<T: Element>(&self, path: &DataArrayPath) -> Result<&TypedArray<T>> {
        let any = self.resolve(path)?;
        let found = any.kind();
        any.downcast_ref::<T>().ok_or_else(|| StrataError::KindMismatch {
            path: path.clone(),
            expected: T::KIND,
            found,
        })
    }

    pub fn resolve_typed_mut<T: Element>(&mut self, path: &DataArrayPath) -> Result<&mut TypedArray<T>> {
        let any = self.resolve_mut(path)?;
        let found = any.kind();
        any.downcast_mut::<T>().ok_or_else(|| StrataError::KindMismatch {
            path: path.clone(),
            expected: T::KIND,
            found,
        })
    }

    /// The same hierarchy with every array unallocated; no element data is copied.
    pub fn schema_copy(&self) -> Self {
        Self {
            containers: self
                .containers
                .iter()
                .map(|(name, container)| (name.clone(), container.schema_copy()))
                .collect(),
        }
    }

    /// Every array path in the registry, sorted.
    pub fn array_paths(&self) -> Vec<DataArrayPath> {
        let mut paths = Vec::new();
        for container in self.containers.values() {
            for matrix in container.matrices() {
                for (name, _) in matrix.arrays() {
                    paths.push(DataArrayPath::new(container.name(), matrix.name(), name));
                }
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::MatrixCategory;
    use crate::error::codes;
    use crate::types::ElementKind;

    fn sample() -> DataContainerArray {
        let mut dca = DataContainerArray::new();
        let dc = dca.create_container("dc").unwrap();
        let am = dc.create_matrix("Data", vec![10], MatrixCategory::Cell).unwrap();
        am.add_array("A", TypedArray::<u8>::new("", 10, vec![1], 0).unwrap())
            .unwrap();
        dca
    }

    #[test]
    fn test_resolution_codes_are_distinct_per_level() {
        let dca = sample();
        let code_of = |p: DataArrayPath| dca.resolve(&p).unwrap_err().code();

        assert_eq!(code_of(DataArrayPath::default()), codes::EMPTY_PATH);
        assert_eq!(code_of(DataArrayPath::new("dc", "", "A")), codes::INVALID_PATH);
        assert_eq!(code_of(DataArrayPath::new("nope", "Data", "A")), codes::CONTAINER_MISSING);
        assert_eq!(code_of(DataArrayPath::new("dc", "nope", "A")), codes::MATRIX_MISSING);
        assert_eq!(code_of(DataArrayPath::new("dc", "Data", "nope")), codes::ARRAY_MISSING);
        assert_ne!(codes::ARRAY_MISSING, codes::CONTAINER_MISSING);
        assert!(dca.resolve(&DataArrayPath::new("dc", "Data", "A")).is_ok());
    }

    #[test]
    fn test_resolve_typed_reports_kind_mismatch() {
        let dca = sample();
        let path = DataArrayPath::new("dc", "Data", "A");
        assert!(dca.resolve_typed::<u8>(&path).is_ok());
        match dca.resolve_typed::<f32>(&path) {
            Err(StrataError::KindMismatch { expected, found, .. }) => {
                assert_eq!(expected, ElementKind::Float32);
                assert_eq!(found, ElementKind::UInt8);
            }
            other => panic!("expected kind mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_container_lifecycle() {
        let mut dca = sample();
        assert!(matches!(dca.create_container("dc"), Err(StrataError::AlreadyExists(_))));
        dca.rename_container("dc", "renamed", false).unwrap();
        assert_eq!(dca.container_names(), vec!["renamed".to_string()]);
        assert_eq!(
            dca.array_paths(),
            vec![DataArrayPath::new("renamed", "Data", "A")]
        );
        assert!(dca.remove_container("renamed").is_some());
        assert!(dca.is_empty());
    }

    #[test]
    fn test_merge_collision_is_atomic() {
        let mut target = sample();
        let mut incoming = DataContainerArray::new();
        incoming.create_container("other").unwrap();
        incoming.create_container("dc").unwrap();

        assert!(target.merge_from(incoming.clone(), false).is_err());
        assert!(!target.contains_container("other"));

        target.merge_from(incoming, true).unwrap();
        assert!(target.contains_container("other"));
        assert!(target.get_container("dc").unwrap().get_matrix("Data").is_none());
    }

    #[test]
    fn test_schema_copy_keeps_shape_and_drops_data() {
        let dca = sample();
        let copy = dca.schema_copy();
        assert_eq!(copy.schema(), dca.schema());
        assert_eq!(copy.array_paths(), dca.array_paths());
        let a = copy.resolve(&DataArrayPath::new("dc", "Data", "A")).unwrap();
        assert!(!a.is_allocated());
        assert_eq!(a.name(), "A");
        assert_eq!(copy.matrix(&DataArrayPath::matrix_path("dc", "Data")).unwrap().num_tuples(), 10);
    }
}
