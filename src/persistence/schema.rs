//! The structural description of a `DataContainerArray`: names, shapes and
//! kinds, with no element data.
//!
//! This is what a file header stores and what a preflight read returns.

use serde::{Deserialize, Serialize};

use crate::arrays::AnyArray;
use crate::containers::{
    AttributeMatrix, DataArrayPath, DataContainer, DataContainerArray, MatrixCategory,
};
use crate::error::Result;
use crate::geometry::{Geometry, ImageGeom, MeshGeometry, MeshKind};
use crate::persistence::format::ARRAY_FORMAT_VERSION;
use crate::types::ElementKind;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub name: String,
    pub kind: ElementKind,
    pub tuple_dims: Vec<usize>,
    pub component_dims: Vec<usize>,
    pub format_version: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatrixSchema {
    pub name: String,
    pub category: MatrixCategory,
    pub tuple_dims: Vec<usize>,
    pub arrays: Vec<ArraySchema>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometrySchema {
    Image(ImageGeom),
    Mesh {
        kind: MeshKind,
        num_vertices: usize,
        num_elements: usize,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContainerSchema {
    pub name: String,
    #[serde(default)]
    pub geometry: Option<GeometrySchema>,
    pub matrices: Vec<MatrixSchema>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DataContainerArraySchema {
    pub containers: Vec<ContainerSchema>,
}

//==================================================================================
// 1. Capture
//==================================================================================

impl ArraySchema {
    fn from_array(name: &str, array: &AnyArray, matrix: &AttributeMatrix) -> Self {
        // A placeholder (or consistent) array inherits the matrix shape.
        let tuple_dims = if !array.is_allocated() || array.num_tuples() == matrix.num_tuples() {
            matrix.tuple_dims().to_vec()
        } else {
            vec![array.num_tuples()]
        };
        Self {
            name: name.to_string(),
            kind: array.kind(),
            tuple_dims,
            component_dims: array.component_dims().to_vec(),
            format_version: ARRAY_FORMAT_VERSION,
        }
    }
}

impl GeometrySchema {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Image(image) => GeometrySchema::Image(image.clone()),
            Geometry::Mesh(mesh) => GeometrySchema::Mesh {
                kind: mesh.kind(),
                num_vertices: mesh.num_vertices(),
                num_elements: mesh.num_elements(),
            },
        }
    }
}

impl ContainerSchema {
    fn from_container(container: &DataContainer) -> Self {
        Self {
            name: container.name().to_string(),
            geometry: container.geometry().map(GeometrySchema::from_geometry),
            matrices: container
                .matrices()
                .map(|m| MatrixSchema {
                    name: m.name().to_string(),
                    category: m.category(),
                    tuple_dims: m.tuple_dims().to_vec(),
                    arrays: m
                        .arrays()
                        .map(|(name, array)| ArraySchema::from_array(name, array, m))
                        .collect(),
                })
                .collect(),
        }
    }
}

impl DataContainerArraySchema {
    pub fn from_dca(dca: &DataContainerArray) -> Self {
        Self {
            containers: dca.containers().map(ContainerSchema::from_container).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn container(&self, name: &str) -> Option<&ContainerSchema> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn array(&self, path: &DataArrayPath) -> Option<&ArraySchema> {
        self.container(&path.container)?
            .matrices
            .iter()
            .find(|m| m.name == path.matrix)?
            .arrays
            .iter()
            .find(|a| a.name == path.array)
    }

    pub fn array_paths(&self) -> Vec<DataArrayPath> {
        let mut paths = Vec::new();
        for container in &self.containers {
            for matrix in &container.matrices {
                for array in &matrix.arrays {
                    paths.push(DataArrayPath::new(&container.name, &matrix.name, &array.name));
                }
            }
        }
        paths
    }

    //==============================================================================
    // 2. Selection
    //==============================================================================

    /// Keeps only what `selection` names. An empty selection keeps everything.
    ///
    /// A full path selects one array; `container|matrix` selects a whole matrix
    /// and a bare container name selects a whole container. Containers and
    /// matrices are kept when anything inside them is selected.
    pub fn select(&self, selection: &[DataArrayPath]) -> Self {
        if selection.is_empty() {
            return self.clone();
        }
        let whole_container = |c: &str| {
            selection
                .iter()
                .any(|p| p.container == c && p.matrix.is_empty() && p.array.is_empty())
        };
        let whole_matrix = |c: &str, m: &str| {
            selection
                .iter()
                .any(|p| p.container == c && p.matrix == m && p.array.is_empty())
        };
        let one_array = |c: &str, m: &str, a: &str| {
            selection
                .iter()
                .any(|p| p.container == c && p.matrix == m && p.array == a)
        };

        let containers = self
            .containers
            .iter()
            .filter_map(|container| {
                if whole_container(&container.name) {
                    return Some(container.clone());
                }
                let matrices: Vec<MatrixSchema> = container
                    .matrices
                    .iter()
                    .filter_map(|matrix| {
                        if whole_matrix(&container.name, &matrix.name) {
                            return Some(matrix.clone());
                        }
                        let arrays: Vec<ArraySchema> = matrix
                            .arrays
                            .iter()
                            .filter(|a| one_array(&container.name, &matrix.name, &a.name))
                            .cloned()
                            .collect();
                        (!arrays.is_empty()).then(|| MatrixSchema {
                            arrays,
                            ..matrix.clone()
                        })
                    })
                    .collect();
                (!matrices.is_empty()).then(|| ContainerSchema {
                    matrices,
                    ..container.clone()
                })
            })
            .collect();
        Self { containers }
    }

    //==============================================================================
    // 3. Materialization
    //==============================================================================

    /// Builds the preflight-time registry: every matrix with its persisted tuple
    /// dimensions, every array unallocated, meshes as placeholders.
    pub fn to_preflight_dca(&self) -> Result<DataContainerArray> {
        let mut dca = DataContainerArray::new();
        for container_schema in &self.containers {
            let container = dca.create_container(&container_schema.name)?;
            if let Some(geometry) = &container_schema.geometry {
                container.set_geometry(match geometry {
                    GeometrySchema::Image(image) => Geometry::Image(image.clone()),
                    GeometrySchema::Mesh { kind, .. } => Geometry::Mesh(MeshGeometry::placeholder(*kind)?),
                });
            }
            for matrix_schema in &container_schema.matrices {
                let matrix = container.create_matrix(
                    &matrix_schema.name,
                    matrix_schema.tuple_dims.clone(),
                    matrix_schema.category,
                )?;
                for array_schema in &matrix_schema.arrays {
                    let array = AnyArray::unallocated(
                        array_schema.kind,
                        &array_schema.name,
                        array_schema.component_dims.clone(),
                    )?;
                    matrix.add_array(&array_schema.name, array)?;
                }
            }
        }
        Ok(dca)
    }
}

impl DataContainerArray {
    /// Snapshot of the structural schema.
    pub fn schema(&self) -> DataContainerArraySchema {
        DataContainerArraySchema::from_dca(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::TypedArray;

    fn sample() -> DataContainerArray {
        let mut dca = DataContainerArray::new();
        let dc = dca.create_container("dc").unwrap();
        dc.set_geometry(Geometry::Image(ImageGeom::new([5, 2, 1], [0.0; 3], [1.0; 3])));
        let am = dc.create_matrix("Cells", vec![5, 2], MatrixCategory::Cell).unwrap();
        am.add_array("Phases", TypedArray::<i32>::new("", 10, vec![1], 1).unwrap()).unwrap();
        am.add_array("Eulers", TypedArray::<f32>::new("", 10, vec![3], 0.0).unwrap()).unwrap();
        let features = dc.create_matrix("Features", vec![3], MatrixCategory::CellFeature).unwrap();
        features.add_array("Active", TypedArray::<bool>::new("", 3, vec![1], true).unwrap()).unwrap();
        dca
    }

    #[test]
    fn test_schema_matches_preflight_materialization() {
        let dca = sample();
        let schema = dca.schema();
        let eulers = schema.array(&DataArrayPath::new("dc", "Cells", "Eulers")).unwrap();
        assert_eq!(eulers.tuple_dims, vec![5, 2]);
        assert_eq!(eulers.component_dims, vec![3]);
        assert_eq!(eulers.format_version, ARRAY_FORMAT_VERSION);

        let preflight = schema.to_preflight_dca().unwrap();
        assert_eq!(preflight.array_paths(), dca.array_paths());
        for path in preflight.array_paths() {
            let array = preflight.resolve(&path).unwrap();
            assert!(!array.is_allocated());
            assert_eq!(array.kind(), dca.resolve(&path).unwrap().kind());
        }
        // Placeholders inherit the matrix shape, so the schema survives the trip.
        assert_eq!(preflight.schema(), schema);
    }

    #[test]
    fn test_selection() {
        let schema = sample().schema();
        let picked = schema.select(&[
            DataArrayPath::new("dc", "Cells", "Phases"),
            DataArrayPath::matrix_path("dc", "Features"),
        ]);
        assert_eq!(
            picked.array_paths(),
            vec![
                DataArrayPath::new("dc", "Cells", "Phases"),
                DataArrayPath::new("dc", "Features", "Active"),
            ]
        );
        assert!(picked.container("dc").unwrap().geometry.is_some());
        assert!(schema.select(&[DataArrayPath::new("zz", "", "")]).is_empty());
        assert_eq!(schema.select(&[]), schema);
    }
}
