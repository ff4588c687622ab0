use crate::arrays::TypedArray;
use crate::error::StrataError;
use crate::geometry::connectivity::*;
use crate::geometry::mesh::{MeshGeometry, MeshKind};

// Test Helpers
/// A closed octahedron: V = 6, E = 12, T = 8, so V - E + T = 2.
fn octahedron() -> MeshGeometry {
    let coords = vec![
        1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, -1.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, 0.0, -1.0,
    ];
    let tris = vec![
        0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, //
        2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5,
    ];
    MeshGeometry::from_buffers(MeshKind::Triangle, coords, tris).unwrap()
}

/// Two triangles forming the unit square.
fn square() -> MeshGeometry {
    let coords = vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ];
    MeshGeometry::from_buffers(MeshKind::Triangle, coords, vec![0, 1, 2, 0, 2, 3]).unwrap()
}

/// An `n x n` grid of quads, each split into two triangles.
fn triangulated_grid(n: usize) -> MeshGeometry {
    let mut coords = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            coords.extend_from_slice(&[x as f32, y as f32, 0.0]);
        }
    }
    let idx = |x: usize, y: usize| (y * (n + 1) + x) as i64;
    let mut tris = Vec::new();
    for y in 0..n {
        for x in 0..n {
            tris.extend_from_slice(&[idx(x, y), idx(x + 1, y), idx(x + 1, y + 1)]);
            tris.extend_from_slice(&[idx(x, y), idx(x + 1, y + 1), idx(x, y + 1)]);
        }
    }
    MeshGeometry::from_buffers(MeshKind::Triangle, coords, tris).unwrap()
}

fn sorted(list: &[i64]) -> Vec<i64> {
    let mut v = list.to_vec();
    v.sort_unstable();
    v
}

#[test]
fn test_closed_mesh_every_triangle_has_three_neighbors() {
    let mut mesh = octahedron();
    let v = mesh.num_vertices() as i64;
    let e = mesh.find_unique_edges().unwrap().num_tuples() as i64;
    let t = mesh.num_elements() as i64;
    assert_eq!(v - e + t, 2, "octahedron must satisfy Euler's relation");

    let neighbors = mesh.find_element_neighbors().unwrap().clone();
    assert_eq!(neighbors.num_entities(), 8);
    for (tri, list) in neighbors.iter().enumerate() {
        assert_eq!(list.len(), 3, "triangle {} should have 3 neighbors", tri);
        assert!(!list.contains(&(tri as i64)), "triangle {} lists itself", tri);
    }
    // Face 0 (0,2,4) borders (2,1,4), (3,0,4) and (2,0,5).
    assert_eq!(sorted(neighbors.list(0).unwrap()), vec![1, 3, 4]);
    assert_eq!(mesh.find_boundary_edges().unwrap().num_tuples(), 0);
}

#[test]
fn test_vertex_to_element_map_is_exact() {
    let mut mesh = square();
    let map = mesh.find_elements_containing_vert().unwrap();
    assert_eq!(map.num_entities(), 4);
    assert_eq!(map.list(0).unwrap(), &[0, 1]);
    assert_eq!(map.list(1).unwrap(), &[0]);
    assert_eq!(map.list(2).unwrap(), &[0, 1]);
    assert_eq!(map.list(3).unwrap(), &[1]);
    assert_eq!(map.total_len(), 6);
}

#[test]
fn test_open_mesh_boundary_and_neighbors() {
    let mut mesh = square();
    let neighbors = mesh.find_element_neighbors().unwrap();
    assert_eq!(neighbors.list(0).unwrap(), &[1]);
    assert_eq!(neighbors.list(1).unwrap(), &[0]);

    let boundary = mesh.find_boundary_edges().unwrap();
    assert_eq!(boundary.as_slice(), &[0, 1, 0, 3, 1, 2, 2, 3]);
    assert_eq!(mesh.find_unique_edges().unwrap().num_tuples(), 5);
}

#[test]
fn test_grid_adjacency_is_symmetric() {
    let n = 6;
    let mut mesh = triangulated_grid(n);
    let neighbors = mesh.find_element_neighbors().unwrap().clone();
    for (t, list) in neighbors.iter().enumerate() {
        assert!((1..=3).contains(&list.len()));
        for &other in list {
            let back = neighbors.list(other as usize).unwrap();
            assert!(back.contains(&(t as i64)), "{} -> {} is not mirrored", t, other);
        }
    }
    // Boundary length of an n x n square is 4n unit edges.
    assert_eq!(mesh.find_boundary_edges().unwrap().num_tuples(), 4 * n);
}

#[test]
fn test_polyline_edges_share_one_vertex() {
    let coords = vec![0.0; 12];
    let mut mesh = MeshGeometry::from_buffers(MeshKind::Edge, coords, vec![0, 1, 1, 2, 2, 3]).unwrap();
    let neighbors = mesh.find_element_neighbors().unwrap();
    assert_eq!(neighbors.list(0).unwrap(), &[1]);
    assert_eq!(sorted(neighbors.list(1).unwrap()), vec![0, 2]);
    assert_eq!(neighbors.list(2).unwrap(), &[1]);
}

#[test]
fn test_duplicate_triangle_is_structural_error() {
    let coords = vec![0.0; 9];
    let mut mesh =
        MeshGeometry::from_buffers(MeshKind::Triangle, coords, vec![0, 1, 2, 2, 1, 0]).unwrap();
    assert!(matches!(mesh.find_element_neighbors(), Err(StrataError::Structural(_))));
    assert!(mesh.element_neighbors().is_none());
}

#[test]
fn test_quads_sharing_three_vertices_are_rejected() {
    let coords = vec![0.0; 15];
    let mut mesh =
        MeshGeometry::from_buffers(MeshKind::Quad, coords, vec![0, 1, 2, 3, 0, 1, 2, 4]).unwrap();
    assert!(matches!(mesh.find_element_neighbors(), Err(StrataError::Structural(_))));
}

#[test]
fn test_index_out_of_range_and_repeated_vertex() {
    let coords = vec![0.0; 9];
    let err = MeshGeometry::from_buffers(MeshKind::Triangle, coords.clone(), vec![0, 1, 3]).unwrap_err();
    assert!(matches!(err, StrataError::Structural(_)));
    let err = MeshGeometry::from_buffers(MeshKind::Triangle, coords.clone(), vec![0, 1, -1]).unwrap_err();
    assert!(matches!(err, StrataError::Structural(_)));
    let err = MeshGeometry::from_buffers(MeshKind::Triangle, coords, vec![0, 1, 1]).unwrap_err();
    assert!(matches!(err, StrataError::Structural(_)));
}

#[test]
fn test_centroids() {
    let mut mesh = square();
    let centroids = mesh.find_element_centroids().unwrap();
    let c0 = centroids.tuple(0).unwrap();
    assert!((c0[0] - 2.0 / 3.0).abs() < 1e-6);
    assert!((c0[1] - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(c0[2], 0.0);
}

#[test]
fn test_free_functions_match_cached_methods() {
    let mesh = octahedron();
    let map = find_elements_containing_vert(mesh.elements(), MeshKind::Triangle, 6).unwrap();
    let neighbors = find_element_neighbors(mesh.elements(), &map, MeshKind::Triangle).unwrap();
    assert_eq!(neighbors.name(), ELEMENT_NEIGHBORS);
    assert_eq!(neighbors.num_entities(), 8);

    let wrong_width = TypedArray::from_vec("e", vec![2], vec![0i64, 1]).unwrap();
    assert!(validate_elements(&wrong_width, MeshKind::Triangle, 6).is_err());
}
