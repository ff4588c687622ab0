//! Mesh connectivity builder.
//!
//! Derives adjacency structures from an element list (`M` tuples of `k` vertex
//! indices) and a vertex count `V`:
//! 1. vertex -> elements containing it (two passes: count, then fill),
//! 2. element -> elements sharing a face/edge/vertex with it,
//! plus the unique edge list, the boundary (unshared) edge list and element
//! centroids. Every function validates indices and reports degenerate input as
//! `StrataError::Structural`.

use bitvec::prelude::*;
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::arrays::{DynamicListArray, TypedArray};
use crate::error::{Result, StrataError};
use crate::geometry::mesh::MeshKind;

pub const ELEMENTS_CONTAINING_VERT: &str = "ElementsContainingVert";
pub const ELEMENT_NEIGHBORS: &str = "ElementNeighbors";

//==================================================================================
// 1. Validation
//==================================================================================

/// Checks the element list against the mesh kind and the vertex count.
///
/// Rejects negative or out-of-range indices and elements that repeat a vertex.
pub fn validate_elements(elements: &TypedArray<i64>, kind: MeshKind, num_vertices: usize) -> Result<()> {
    let k = kind.verts_per_element();
    if elements.num_components() != k {
        return Err(StrataError::Structural(format!(
            "{} elements need {} vertex indices per tuple, found {}",
            kind,
            k,
            elements.num_components()
        )));
    }
    for (e, element) in elements.as_slice().chunks_exact(k).enumerate() {
        for (i, &v) in element.iter().enumerate() {
            if v < 0 || v as u64 >= num_vertices as u64 {
                return Err(StrataError::Structural(format!(
                    "element {} references vertex {} but the mesh has {} vertices",
                    e, v, num_vertices
                )));
            }
            if element[..i].contains(&v) {
                return Err(StrataError::Structural(format!(
                    "element {} repeats vertex {}",
                    e, v
                )));
            }
        }
    }
    Ok(())
}

//==================================================================================
// 2. Adjacency
//==================================================================================

/// Builds the vertex -> element map. Slot counts are exact; nothing is
/// over-allocated.
pub fn find_elements_containing_vert(
    elements: &TypedArray<i64>,
    kind: MeshKind,
    num_vertices: usize,
) -> Result<DynamicListArray> {
    validate_elements(elements, kind, num_vertices)?;
    let k = kind.verts_per_element();

    // Pass 1: how many elements use each vertex.
    let mut counts = vec![0usize; num_vertices];
    for &v in elements.as_slice() {
        counts[v as usize] += 1;
    }

    // Pass 2: fill, tracking a per-vertex write cursor.
    let mut list = DynamicListArray::from_counts(ELEMENTS_CONTAINING_VERT, &counts);
    let mut cursor = vec![0usize; num_vertices];
    for (e, element) in elements.as_slice().chunks_exact(k).enumerate() {
        for &v in element {
            let v = v as usize;
            if let Some(slots) = list.list_mut(v) {
                slots[cursor[v]] = e as i64;
                cursor[v] += 1;
            }
        }
    }
    Ok(list)
}

/// Builds the element -> element adjacency.
///
/// Two elements are neighbours when they share exactly `kind.shared_vertex_threshold()`
/// vertices (1 for edges, 2 for triangles and quads). Sharing more than that
/// means the mesh is degenerate or non-manifold and the build fails.
pub fn find_element_neighbors(
    elements: &TypedArray<i64>,
    elements_containing_vert: &DynamicListArray,
    kind: MeshKind,
) -> Result<DynamicListArray> {
    let started = Instant::now();
    let k = kind.verts_per_element();
    let threshold = kind.shared_vertex_threshold();
    let num_elements = elements.num_tuples();
    validate_elements(elements, kind, elements_containing_vert.num_entities())?;

    let data = elements.as_slice();
    let mut visited = bitvec![0; num_elements];
    let mut touched: Vec<usize> = Vec::with_capacity(32);
    let mut lists: Vec<Vec<i64>> = Vec::with_capacity(num_elements);

    for t in 0..num_elements {
        let seed = &data[t * k..(t + 1) * k];
        let mut neighbors = Vec::new();

        for &v in seed {
            let candidates = elements_containing_vert.list(v as usize).ok_or_else(|| {
                StrataError::Structural(format!("vertex {} has no element list", v))
            })?;
            for &candidate in candidates {
                let c = candidate as usize;
                if c == t || c >= num_elements || visited[c] {
                    continue;
                }
                visited.set(c, true);
                touched.push(c);

                let other = &data[c * k..(c + 1) * k];
                let shared = seed.iter().filter(|&&v| other.contains(&v)).count();
                if shared > threshold {
                    return Err(StrataError::Structural(format!(
                        "{} elements {} and {} share {} vertices (at most {} allowed)",
                        kind, t, c, shared, threshold
                    )));
                }
                if shared == threshold {
                    neighbors.push(candidate);
                }
            }
        }

        // Reset only what this element touched.
        for &c in &touched {
            visited.set(c, false);
        }
        touched.clear();
        lists.push(neighbors);
    }

    log::debug!(
        "element neighbours for {} {} elements built in {:?}",
        num_elements,
        kind,
        started.elapsed()
    );
    Ok(DynamicListArray::from_lists(ELEMENT_NEIGHBORS, &lists))
}

//==================================================================================
// 3. Edges and Centroids
//==================================================================================

fn element_edges(element: &[i64], kind: MeshKind) -> impl Iterator<Item = (i64, i64)> + '_ {
    let k = element.len();
    let n_edges = if kind == MeshKind::Edge { 1 } else { k };
    (0..n_edges).map(move |i| {
        let (a, b) = (element[i], element[(i + 1) % k]);
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    })
}

fn edges_to_array(name: &str, edges: impl IntoIterator<Item = (i64, i64)>) -> Result<TypedArray<i64>> {
    let flat: Vec<i64> = edges.into_iter().flat_map(|(a, b)| [a, b]).collect();
    TypedArray::from_vec(name, vec![2], flat)
}

/// Every distinct edge of the mesh as a sorted `(low, high)` pair, in ascending order.
pub fn find_unique_edges(elements: &TypedArray<i64>, kind: MeshKind) -> Result<TypedArray<i64>> {
    let k = kind.verts_per_element();
    let unique: BTreeSet<(i64, i64)> = elements
        .as_slice()
        .chunks_exact(k)
        .flat_map(|element| element_edges(element, kind))
        .collect();
    edges_to_array("EdgeList", unique)
}

/// Edges used by exactly one element: the boundary of a surface mesh.
pub fn find_boundary_edges(elements: &TypedArray<i64>, kind: MeshKind) -> Result<TypedArray<i64>> {
    if kind == MeshKind::Edge {
        return Err(StrataError::InvalidParameter(
            "boundary edges are defined for triangle and quad meshes only".into(),
        ));
    }
    let k = kind.verts_per_element();
    let mut counts: HashMap<(i64, i64), u32> = HashMap::new();
    for element in elements.as_slice().chunks_exact(k) {
        for edge in element_edges(element, kind) {
            *counts.entry(edge).or_insert(0) += 1;
        }
    }
    let mut boundary: Vec<(i64, i64)> = counts
        .into_iter()
        .filter(|&(_, n)| n == 1)
        .map(|(edge, _)| edge)
        .collect();
    boundary.sort_unstable();
    edges_to_array("BoundaryEdges", boundary)
}

/// The mean vertex position of every element.
pub fn find_element_centroids(
    elements: &TypedArray<i64>,
    vertices: &TypedArray<f32>,
    kind: MeshKind,
) -> Result<TypedArray<f32>> {
    validate_elements(elements, kind, vertices.num_tuples())?;
    let k = kind.verts_per_element();
    let verts = vertices.view2()?;
    let dims = verts.ncols();
    let mut centroids = TypedArray::new("ElementCentroids", elements.num_tuples(), vec![dims], 0.0f32)?;

    for (e, element) in elements.as_slice().chunks_exact(k).enumerate() {
        if let Some(out) = centroids.tuple_mut(e) {
            for &v in element {
                let row = verts.row(v as usize);
                for (o, &x) in out.iter_mut().zip(row.iter()) {
                    *o += x;
                }
            }
            for o in out.iter_mut() {
                *o /= k as f32;
            }
        }
    }
    Ok(centroids)
}
