//! Unstructured mesh geometry: a shared vertex list, an element list and the
//! derived adjacency caches built by the connectivity builder.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arrays::{DynamicListArray, TypedArray};
use crate::error::{Result, StrataError};
use crate::geometry::connectivity;

pub const SHARED_VERTEX_LIST: &str = "SharedVertexList";
pub const SHARED_ELEMENT_LIST: &str = "SharedElementList";

/// The element shape of a mesh.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeshKind {
    Edge,
    Triangle,
    Quad,
}

impl MeshKind {
    pub fn verts_per_element(&self) -> usize {
        match self {
            MeshKind::Edge => 2,
            MeshKind::Triangle => 3,
            MeshKind::Quad => 4,
        }
    }

    /// Number of shared vertices that makes two elements neighbours.
    pub fn shared_vertex_threshold(&self) -> usize {
        match self {
            MeshKind::Edge => 1,
            MeshKind::Triangle | MeshKind::Quad => 2,
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    kind: MeshKind,
    vertices: TypedArray<f32>,
    elements: TypedArray<i64>,
    elements_containing_vert: Option<DynamicListArray>,
    element_neighbors: Option<DynamicListArray>,
    element_centroids: Option<TypedArray<f32>>,
}

impl MeshGeometry {
    /// Builds a mesh and validates every element index against the vertex count.
    pub fn new(kind: MeshKind, vertices: TypedArray<f32>, elements: TypedArray<i64>) -> Result<Self> {
        if vertices.num_components() != 3 {
            return Err(StrataError::ComponentMismatch {
                path: crate::containers::DataArrayPath::new("", "", SHARED_VERTEX_LIST),
                expected: vec![3],
                found: vertices.component_dims().to_vec(),
            });
        }
        connectivity::validate_elements(&elements, kind, vertices.num_tuples())?;
        Ok(Self {
            kind,
            vertices,
            elements,
            elements_containing_vert: None,
            element_neighbors: None,
            element_centroids: None,
        })
    }

    /// A shape-only mesh with no vertices or elements, as produced by a
    /// preflight read.
    pub fn placeholder(kind: MeshKind) -> Result<Self> {
        let vertices = TypedArray::unallocated(SHARED_VERTEX_LIST, vec![3])?;
        let elements = TypedArray::unallocated(SHARED_ELEMENT_LIST, vec![kind.verts_per_element()])?;
        Self::new(kind, vertices, elements)
    }

    /// Convenience constructor from flat coordinate and index buffers.
    pub fn from_buffers(kind: MeshKind, coords: Vec<f32>, indices: Vec<i64>) -> Result<Self> {
        let vertices = TypedArray::from_vec(SHARED_VERTEX_LIST, vec![3], coords)?;
        let elements = TypedArray::from_vec(SHARED_ELEMENT_LIST, vec![kind.verts_per_element()], indices)?;
        Self::new(kind, vertices, elements)
    }

    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.num_tuples()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.num_tuples()
    }

    pub fn vertices(&self) -> &TypedArray<f32> {
        &self.vertices
    }

    pub fn elements(&self) -> &TypedArray<i64> {
        &self.elements
    }

    /// Mutable vertex access. Positions do not affect adjacency, only centroids.
    pub fn vertices_mut(&mut self) -> &mut TypedArray<f32> {
        self.element_centroids = None;
        &mut self.vertices
    }

    /// Replaces the element list, dropping every derived cache.
    pub fn set_elements(&mut self, elements: TypedArray<i64>) -> Result<()> {
        connectivity::validate_elements(&elements, self.kind, self.num_vertices())?;
        self.elements = elements;
        self.clear_derived();
        Ok(())
    }

    pub fn clear_derived(&mut self) {
        self.elements_containing_vert = None;
        self.element_neighbors = None;
        self.element_centroids = None;
    }

    pub fn elements_containing_vert(&self) -> Option<&DynamicListArray> {
        self.elements_containing_vert.as_ref()
    }

    pub fn element_neighbors(&self) -> Option<&DynamicListArray> {
        self.element_neighbors.as_ref()
    }

    pub fn element_centroids(&self) -> Option<&TypedArray<f32>> {
        self.element_centroids.as_ref()
    }

    pub fn find_elements_containing_vert(&mut self) -> Result<&DynamicListArray> {
        let list = connectivity::find_elements_containing_vert(&self.elements, self.kind, self.num_vertices())?;
        Ok(self.elements_containing_vert.insert(list))
    }

    /// Builds the neighbour lists, building the vertex map first if needed.
    ///
    /// Nothing is cached unless the whole build succeeds, so a degenerate mesh
    /// is left exactly as it was.
    pub fn find_element_neighbors(&mut self) -> Result<&DynamicListArray> {
        let built = match self.elements_containing_vert {
            Some(_) => None,
            None => Some(connectivity::find_elements_containing_vert(
                &self.elements,
                self.kind,
                self.num_vertices(),
            )?),
        };
        let containing = built
            .as_ref()
            .or(self.elements_containing_vert.as_ref())
            .ok_or_else(|| StrataError::Internal("vertex map missing after build".into()))?;
        let neighbors = connectivity::find_element_neighbors(&self.elements, containing, self.kind)?;
        if let Some(map) = built {
            self.elements_containing_vert = Some(map);
        }
        Ok(self.element_neighbors.insert(neighbors))
    }

    pub fn find_element_centroids(&mut self) -> Result<&TypedArray<f32>> {
        let centroids = connectivity::find_element_centroids(&self.elements, &self.vertices, self.kind)?;
        Ok(self.element_centroids.insert(centroids))
    }

    pub fn find_unique_edges(&self) -> Result<TypedArray<i64>> {
        connectivity::find_unique_edges(&self.elements, self.kind)
    }

    pub fn find_boundary_edges(&self) -> Result<TypedArray<i64>> {
        connectivity::find_boundary_edges(&self.elements, self.kind)
    }
}
