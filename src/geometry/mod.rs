//! Optional topological descriptions owned by a data container.

pub mod connectivity;
pub mod image;
pub mod mesh;

#[cfg(test)]
mod connectivity_tests;

pub use image::ImageGeom;
pub use mesh::{MeshGeometry, MeshKind};

/// The geometry attached to a `DataContainer`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Image(ImageGeom),
    Mesh(MeshGeometry),
}

impl Geometry {
    /// Human-readable geometry type, used in messages and persisted schemas.
    pub fn type_name(&self) -> String {
        match self {
            Geometry::Image(_) => "Image".to_string(),
            Geometry::Mesh(mesh) => format!("{}Mesh", mesh.kind()),
        }
    }

    /// Number of cells (image) or elements (mesh).
    pub fn num_elements(&self) -> usize {
        match self {
            Geometry::Image(image) => image.num_elements(),
            Geometry::Mesh(mesh) => mesh.num_elements(),
        }
    }

    pub fn as_image(&self) -> Option<&ImageGeom> {
        match self {
            Geometry::Image(image) => Some(image),
            Geometry::Mesh(_) => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshGeometry> {
        match self {
            Geometry::Mesh(mesh) => Some(mesh),
            Geometry::Image(_) => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshGeometry> {
        match self {
            Geometry::Mesh(mesh) => Some(mesh),
            Geometry::Image(_) => None,
        }
    }
}
