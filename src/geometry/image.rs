//! Regular grid geometry.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// An axis-aligned grid of `dims[0] x dims[1] x dims[2]` cells.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageGeom {
    pub dims: [usize; 3],
    pub origin: [f32; 3],
    pub spacing: [f32; 3],
}

impl Default for ImageGeom {
    fn default() -> Self {
        Self {
            dims: [0; 3],
            origin: [0.0; 3],
            spacing: [1.0; 3],
        }
    }
}

impl ImageGeom {
    pub fn new(dims: [usize; 3], origin: [f32; 3], spacing: [f32; 3]) -> Self {
        Self { dims, origin, spacing }
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// The cell-matrix tuple dimensions matching this grid (x fastest).
    pub fn tuple_dims(&self) -> Vec<usize> {
        self.dims.to_vec()
    }

    /// Linear index of cell `(x, y, z)`, x varying fastest.
    pub fn compute_index(&self, x: usize, y: usize, z: usize) -> Result<usize> {
        for (&v, &d) in [x, y, z].iter().zip(self.dims.iter()) {
            if v >= d {
                return Err(StrataError::IndexOutOfRange { index: v, len: d });
            }
        }
        Ok((z * self.dims[1] + y) * self.dims[0] + x)
    }

    /// Centre of cell `index` in physical coordinates.
    pub fn element_coords(&self, index: usize) -> Option<[f32; 3]> {
        if index >= self.num_elements() {
            return None;
        }
        let x = index % self.dims[0];
        let y = (index / self.dims[0]) % self.dims[1];
        let z = index / (self.dims[0] * self.dims[1]);
        let centre = |i: usize, axis: usize| {
            self.origin[axis] + (i as f32 + 0.5) * self.spacing[axis]
        };
        Some([centre(x, 0), centre(y, 1), centre(z, 2)])
    }
}
