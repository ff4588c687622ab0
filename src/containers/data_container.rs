//! A named set of attribute matrices plus at most one geometry.

use std::collections::BTreeMap;

use crate::containers::attribute_matrix::{AttributeMatrix, MatrixCategory};
use crate::error::{Result, StrataError};
use crate::geometry::Geometry;

#[derive(Debug, Clone, PartialEq)]
pub struct DataContainer {
    name: String,
    matrices: BTreeMap<String, AttributeMatrix>,
    geometry: Option<Geometry>,
}

impl DataContainer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            matrices: BTreeMap::new(),
            geometry: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    //==============================================================================
    // Matrices
    //==============================================================================

    /// Inserts `matrix` under its own name, replacing (and returning) any previous one.
    pub fn add_matrix(&mut self, matrix: AttributeMatrix) -> Result<Option<AttributeMatrix>> {
        if matrix.name().is_empty() {
            return Err(StrataError::EmptyName(format!(
                "attribute matrix in data container '{}'",
                self.name
            )));
        }
        Ok(self.matrices.insert(matrix.name().to_string(), matrix))
    }

    /// Creates an empty matrix; fails if the name is empty or taken.
    pub fn create_matrix(
        &mut self,
        name: &str,
        tuple_dims: Vec<usize>,
        category: MatrixCategory,
    ) -> Result<&mut AttributeMatrix> {
        if name.is_empty() {
            return Err(StrataError::EmptyName(format!(
                "attribute matrix in data container '{}'",
                self.name
            )));
        }
        if self.matrices.contains_key(name) {
            return Err(StrataError::AlreadyExists(format!(
                "Attribute matrix '{}/{}'",
                self.name, name
            )));
        }
        Ok(self
            .matrices
            .entry(name.to_string())
            .or_insert_with(|| AttributeMatrix::new(name, tuple_dims, category)))
    }

    pub fn get_matrix(&self, name: &str) -> Option<&AttributeMatrix> {
        self.matrices.get(name)
    }

    pub fn get_matrix_mut(&mut self, name: &str) -> Option<&mut AttributeMatrix> {
        self.matrices.get_mut(name)
    }

    pub fn contains_matrix(&self, name: &str) -> bool {
        self.matrices.contains_key(name)
    }

    pub fn remove_matrix(&mut self, name: &str) -> Option<AttributeMatrix> {
        self.matrices.remove(name)
    }

    pub fn rename_matrix(&mut self, old: &str, new: &str, overwrite: bool) -> Result<()> {
        if new.is_empty() {
            return Err(StrataError::EmptyName(format!(
                "attribute matrix in data container '{}'",
                self.name
            )));
        }
        if !self.matrices.contains_key(old) {
            return Err(StrataError::SourceMissing(format!("{}/{}", self.name, old)));
        }
        if old == new {
            return Ok(());
        }
        if self.matrices.contains_key(new) && !overwrite {
            return Err(StrataError::TargetExists(format!("{}/{}", self.name, new)));
        }
        if let Some(mut matrix) = self.matrices.remove(old) {
            matrix.set_name(new);
            self.matrices.insert(new.to_string(), matrix);
        }
        Ok(())
    }

    /// Matrix names in sorted order.
    pub fn matrix_names(&self) -> Vec<String> {
        self.matrices.keys().cloned().collect()
    }

    pub fn matrices(&self) -> impl Iterator<Item = &AttributeMatrix> {
        self.matrices.values()
    }

    pub fn matrices_mut(&mut self) -> impl Iterator<Item = &mut AttributeMatrix> {
        self.matrices.values_mut()
    }

    //==============================================================================
    // Geometry
    //==============================================================================

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        self.geometry.as_mut()
    }

    /// Sets the geometry, returning the one it replaces.
    pub fn set_geometry(&mut self, geometry: Geometry) -> Option<Geometry> {
        self.geometry.replace(geometry)
    }

    pub fn take_geometry(&mut self) -> Option<Geometry> {
        self.geometry.take()
    }

    /// Same matrices and geometry, with every array unallocated.
    pub fn schema_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            matrices: self
                .matrices
                .iter()
                .map(|(name, matrix)| (name.clone(), matrix.schema_copy()))
                .collect(),
            geometry: self.geometry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImageGeom;

    #[test]
    fn test_create_and_rename_matrices() {
        let mut dc = DataContainer::new("dc");
        dc.create_matrix("Cell Data", vec![2, 2], MatrixCategory::Cell).unwrap();
        assert!(matches!(
            dc.create_matrix("Cell Data", vec![1], MatrixCategory::Cell),
            Err(StrataError::AlreadyExists(_))
        ));
        assert!(matches!(
            dc.create_matrix("", vec![1], MatrixCategory::Cell),
            Err(StrataError::EmptyName(_))
        ));

        dc.rename_matrix("Cell Data", "Voxels", false).unwrap();
        assert_eq!(dc.matrix_names(), vec!["Voxels".to_string()]);
        assert_eq!(dc.get_matrix("Voxels").unwrap().name(), "Voxels");
        assert!(matches!(
            dc.rename_matrix("Cell Data", "X", false),
            Err(StrataError::SourceMissing(_))
        ));
    }

    #[test]
    fn test_single_geometry_slot() {
        let mut dc = DataContainer::new("dc");
        assert!(dc.geometry().is_none());
        assert!(dc.set_geometry(Geometry::Image(ImageGeom::default())).is_none());
        let previous = dc.set_geometry(Geometry::Image(ImageGeom::new([2, 2, 1], [0.0; 3], [1.0; 3])));
        assert!(previous.is_some());
        assert_eq!(dc.geometry().unwrap().num_elements(), 4);
    }
}
