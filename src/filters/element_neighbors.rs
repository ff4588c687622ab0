// In: src/filters/element_neighbors.rs

use crate::arrays::TypedArray;
use crate::containers::{DataArrayPath, DataContainerArray, MatrixCategory};
use crate::error::{Result, StrataError};
use crate::filter::{
    DataCheck, ExecuteContext, Filter, FilterState, ParameterReader, ParameterWriter,
};
use crate::geometry::{Geometry, MeshGeometry, MeshKind};
use crate::traits::Element;
use crate::types::ElementKind;

/// Builds the element neighbour lists of a mesh and stores the per-element
/// neighbour count (and optionally the centroids) in an element matrix.
///
/// The element matrix is created with one tuple per element if it does not
/// exist yet.
#[derive(Debug, Clone)]
pub struct FindElementNeighbors {
    pub container: String,
    pub element_matrix: String,
    pub count_array: String,
    /// Empty means no centroid output.
    pub centroids_array: String,
    state: FilterState,
}

impl Default for FindElementNeighbors {
    fn default() -> Self {
        Self {
            container: String::new(),
            element_matrix: "FaceData".to_string(),
            count_array: "NumNeighbors".to_string(),
            centroids_array: String::new(),
            state: FilterState::default(),
        }
    }
}

impl FindElementNeighbors {
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            ..Self::default()
        }
    }

    pub fn with_centroids(mut self, name: &str) -> Self {
        self.centroids_array = name.to_string();
        self
    }

    fn count_path(&self) -> DataArrayPath {
        DataArrayPath::new(&self.container, &self.element_matrix, &self.count_array)
    }

    fn centroids_path(&self) -> Option<DataArrayPath> {
        if self.centroids_array.is_empty() {
            return None;
        }
        Some(DataArrayPath::new(&self.container, &self.element_matrix, &self.centroids_array))
    }
}

fn element_category(kind: MeshKind) -> MatrixCategory {
    match kind {
        MeshKind::Edge => MatrixCategory::Edge,
        MeshKind::Triangle | MeshKind::Quad => MatrixCategory::Face,
    }
}

fn mesh_mut<'a>(dca: &'a mut DataContainerArray, container: &str) -> Result<&'a mut MeshGeometry> {
    dca.container_mut(container)?
        .geometry_mut()
        .and_then(Geometry::as_mesh_mut)
        .ok_or_else(|| StrataError::GeometryMissing { container: container.to_string() })
}

fn neighbor_count(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| StrataError::Range {
        value: len as f64,
        kind: ElementKind::Int32,
    })
}

fn store<T: Element>(array: &mut TypedArray<T>, values: &[T]) -> Result<()> {
    if array.len() != values.len() {
        return Err(StrataError::Internal(format!(
            "'{}' holds {} values but {} were computed",
            array.name(),
            array.len(),
            values.len()
        )));
    }
    array.as_mut_slice().copy_from_slice(values);
    Ok(())
}

impl Filter for FindElementNeighbors {
    fn class_name(&self) -> &'static str {
        "FindElementNeighbors"
    }

    fn human_label(&self) -> &'static str {
        "Find Element Neighbors"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        let Some(kind) = check.require_mesh(&self.container, None) else {
            return;
        };
        // Placeholder meshes read during preflight carry no element count.
        let num_elements = check
            .dca()
            .get_container(&self.container)
            .and_then(|c| c.geometry())
            .map_or(0, Geometry::num_elements);

        let existing = check
            .dca()
            .get_container(&self.container)
            .and_then(|c| c.get_matrix(&self.element_matrix))
            .map(|m| m.num_tuples());
        match existing {
            None => {
                let dims = vec![num_elements];
                if !check.create_matrix(&self.container, &self.element_matrix, dims, element_category(kind)) {
                    return;
                }
            }
            Some(tuples) if !check.is_preflight() && tuples != num_elements => {
                check.error(StrataError::InvalidParameter(format!(
                    "attribute matrix '{}' has {} tuples but the mesh has {} elements",
                    self.element_matrix, tuples, num_elements
                )));
                return;
            }
            Some(_) => {}
        }

        check.create_array(&self.count_path(), ElementKind::Int32, vec![1], 0.0);
        if let Some(path) = self.centroids_path() {
            check.create_array(&path, ElementKind::Float32, vec![3], 0.0);
        }
    }

    fn compute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> Result<()> {
        let mesh = mesh_mut(dca, &self.container)?;
        let counts = mesh
            .find_element_neighbors()?
            .iter()
            .map(|list| neighbor_count(list.len()))
            .collect::<Result<Vec<i32>>>()?;
        ctx.report(counts.len(), counts.len(), "element neighbours built");
        let centroids = match self.centroids_path() {
            Some(_) => Some(mesh.find_element_centroids()?.as_slice().to_vec()),
            None => None,
        };
        if ctx.is_cancelled() {
            return Err(StrataError::Cancelled);
        }

        store(dca.resolve_typed_mut::<i32>(&self.count_path())?, &counts)?;
        if let (Some(path), Some(values)) = (self.centroids_path(), centroids) {
            store(dca.resolve_typed_mut::<f32>(&path)?, &values)?;
        }
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("MeshContainerName", self.container.as_str());
        writer.write("ElementAttributeMatrixName", self.element_matrix.as_str());
        writer.write("NeighborCountArrayName", self.count_array.as_str());
        writer.write("CentroidsArrayName", self.centroids_array.as_str());
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.container = reader.read_string("MeshContainerName", &self.container);
        self.element_matrix = reader.read_string("ElementAttributeMatrixName", &self.element_matrix);
        self.count_array = reader.read_string("NeighborCountArrayName", &self.count_array);
        self.centroids_array = reader.read_string("CentroidsArrayName", &self.centroids_array);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    #[test]
    fn test_neighbor_count_refuses_to_saturate() {
        assert_eq!(neighbor_count(3).unwrap(), 3);
        assert_eq!(neighbor_count(i32::MAX as usize).unwrap(), i32::MAX);
        let err = neighbor_count(i32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.code(), codes::RANGE);
    }
}
