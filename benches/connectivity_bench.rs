// In strata-core/benches/connectivity_bench.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strata::geometry::{MeshGeometry, MeshKind};

// --- Mesh Generation ---

/// A `side x side` grid of quads split into two triangles each, with jittered
/// vertex positions. Manifold by construction.
fn generate_triangle_grid(side: usize, rng: &mut StdRng) -> MeshGeometry {
    let verts_per_row = side + 1;
    let mut coords = Vec::with_capacity(verts_per_row * verts_per_row * 3);
    for y in 0..verts_per_row {
        for x in 0..verts_per_row {
            coords.push(x as f32 + rng.random_range(-0.2..0.2));
            coords.push(y as f32 + rng.random_range(-0.2..0.2));
            coords.push(0.0);
        }
    }
    let mut indices = Vec::with_capacity(side * side * 6);
    for y in 0..side {
        for x in 0..side {
            let v0 = (y * verts_per_row + x) as i64;
            let v1 = v0 + 1;
            let v2 = v0 + verts_per_row as i64;
            let v3 = v2 + 1;
            indices.extend_from_slice(&[v0, v1, v3, v0, v3, v2]);
        }
    }
    MeshGeometry::from_buffers(MeshKind::Triangle, coords, indices).unwrap()
}

// --- Benchmark Suite ---

fn bench_connectivity(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut group = c.benchmark_group("Mesh Connectivity");

    for side in [32usize, 128, 256] {
        let mesh = generate_triangle_grid(side, &mut rng);
        group.throughput(criterion::Throughput::Elements(mesh.num_elements() as u64));

        group.bench_with_input(BenchmarkId::new("ElementsContainingVert", side), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| black_box(mesh.find_elements_containing_vert().map(|l| l.total_len())),
                criterion::BatchSize::LargeInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("ElementNeighbors", side), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| black_box(mesh.find_element_neighbors().map(|l| l.total_len())),
                criterion::BatchSize::LargeInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("BoundaryEdges", side), &mesh, |b, mesh| {
            b.iter(|| black_box(mesh.find_boundary_edges().map(|e| e.num_tuples())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_connectivity);
criterion_main!(benches);
