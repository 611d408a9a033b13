use crate::{
    collect_active_cells, contour_cells, edge_samples, is_crossing, post_process, ActiveCell,
    CellKey, DualContourVertex, DualQuad, ExtractionConfig, MeshBuffers, Qef, SparseVoxelOctree,
};
use glam::{Vec2, Vec3, Vec3A};
use rayon::prelude::*;
use std::collections::HashMap;

/// Extracts the iso-surface of `octree` at `config.iso_threshold` with Dual
/// Contouring.
///
/// An empty octree yields empty buffers. The order of vertices and triangles
/// is not part of the contract.
pub fn generate_mesh(octree: &SparseVoxelOctree, config: &ExtractionConfig) -> MeshBuffers {
    if octree.is_empty() {
        return MeshBuffers::default();
    }

    let start = std::time::Instant::now();
    let cells = collect_active_cells(octree, config);
    if cells.is_empty() {
        return MeshBuffers::default();
    }

    // Cells are independent here; each worker produces its own vertices and
    // they are merged below.
    let chunk_size = config.chunk_size(octree.max_depth());
    let estimate = |cell: &ActiveCell| estimate_cell_vertex(octree, cell, config, chunk_size);
    let vertices: Vec<(CellKey, DualContourVertex)> = if config.parallel {
        cells.par_iter().filter_map(estimate).collect()
    } else {
        cells.iter().filter_map(estimate).collect()
    };

    let mut mesh = MeshBuffers::with_capacity(vertices.len());
    let mut vertex_ids = HashMap::with_capacity(vertices.len());
    let mut keys = Vec::with_capacity(vertices.len());
    for (key, vertex) in &vertices {
        vertex_ids.insert(*key, mesh.push_vertex(vertex));
        keys.push(*key);
    }

    contour_cells(&keys, &vertex_ids, |quad| {
        let quad = if faces_outward(octree, config, &mesh, &quad) {
            quad
        } else {
            quad.flipped()
        };
        mesh.push_quad(quad.vertices);
    });
    let raw_vertex_count = mesh.vertex_count();
    post_process(&mut mesh, config.weld_quantization);

    log::debug!(
        "Extracted {} triangles from {} active cells ({} vertices, {} after welding) in {:.1}ms",
        mesh.triangle_count(),
        cells.len(),
        raw_vertex_count,
        mesh.vertex_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    mesh
}

/// Places the surface vertex of one cell. Cells whose edges never cross the
/// threshold have no surface and produce no vertex.
pub fn estimate_cell_vertex(
    octree: &SparseVoxelOctree,
    cell: &ActiveCell,
    config: &ExtractionConfig,
    chunk_size: f32,
) -> Option<(CellKey, DualContourVertex)> {
    let density = |p: Vec3A| octree.sample_density(config.to_local(p), cell.key.depth);
    let samples = edge_samples(
        cell.center,
        cell.size,
        config.iso_threshold,
        config.gradient_step_factor,
        density,
    );
    if samples.is_empty() {
        return None;
    }

    let qef = Qef::from_samples(&samples);
    let position = qef.solve(&config.qef);
    let normal = samples
        .iter()
        .fold(Vec3A::ZERO, |sum, s| sum + s.normal)
        .normalize_or_zero();
    let local = (position - config.chunk_origin) / chunk_size;

    log::trace!(
        "Cell {:?}: {} crossings, vertex {} (error {})",
        cell.key,
        samples.len(),
        position,
        qef.error(position)
    );

    Some((
        cell.key,
        DualContourVertex {
            position,
            normal,
            uv: Vec2::new(local.x, local.z),
            color: cell.node.kind().color(),
        },
    ))
}

/// Whether `quad` in its canonical winding (facing `+edge_axis`) points out
/// of the solid.
///
/// Density rises into the solid, so the quad faces outward when its shared
/// edge runs from solid to air. Edges that don't cross the threshold defer to
/// the vertex normals.
fn faces_outward(
    octree: &SparseVoxelOctree,
    config: &ExtractionConfig,
    mesh: &MeshBuffers,
    quad: &DualQuad,
) -> bool {
    let depth = quad.base.depth;
    let cell_size = config.chunk_size(octree.max_depth()) / (1u32 << depth) as f32;
    let [start, end] = quad.shared_edge().map(|corner| {
        let world = config.chunk_origin + corner.as_vec3a() * cell_size;
        octree.sample_density(config.to_local(world), depth) - config.iso_threshold
    });
    if is_crossing(start, end) {
        return start > 0.0;
    }

    let normal_sum = quad
        .vertices
        .iter()
        .fold(Vec3::ZERO, |sum, &v| sum + mesh.normals[v as usize]);
    normal_sum.dot(quad.edge_axis().as_vec3()) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{density_primitives, ChunkParams, VoxelKind};
    use glam::UVec3;

    fn sphere_chunk(parallel: bool) -> (SparseVoxelOctree, ExtractionConfig) {
        let params = ChunkParams {
            origin: Vec3A::ZERO,
            voxel_size: 1.0,
            max_depth: 4,
            fill_depth: 4,
        };
        let mut octree = SparseVoxelOctree::with_max_depth(params.max_depth).unwrap();
        let source = density_primitives::solid(VoxelKind::Stone, |p| {
            density_primitives::sphere(Vec3A::splat(8.0), 5.0, p)
        });
        octree.fill(&source, &params).unwrap();
        let config = ExtractionConfig::for_chunk(&params).with_parallel(parallel);
        (octree, config)
    }

    #[test]
    fn empty_octree_gives_empty_buffers() {
        let octree = SparseVoxelOctree::new();
        let mesh = generate_mesh(&octree, &ExtractionConfig::default());
        assert!(mesh.is_empty());
        assert_eq!(mesh, MeshBuffers::default());
    }

    #[test]
    fn octree_without_active_cells_gives_empty_buffers() {
        let mut octree = SparseVoxelOctree::with_max_depth(3).unwrap();
        octree.set_region(0, UVec3::ZERO, VoxelKind::Stone, 10.0).unwrap();
        octree.set_voxel(UVec3::ONE, VoxelKind::Stone, 20.0).unwrap();
        let mesh = generate_mesh(&octree, &ExtractionConfig::default());
        assert!(mesh.is_empty());
    }

    #[test]
    fn sphere_produces_consistent_buffers() {
        let (octree, config) = sphere_chunk(true);
        let mesh = generate_mesh(&octree, &config);

        mesh.validate().unwrap();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count()));

        // QEF vertices stay near the sphere shell.
        for p in &mesh.positions {
            let r = (Vec3A::from(*p) - Vec3A::splat(8.0)).length();
            assert!((2.0..8.0).contains(&r), "vertex {p} at radius {r}");
        }
        for uv in &mesh.uvs {
            assert!(uv.cmpge(Vec2::ZERO).all() && uv.cmple(Vec2::ONE).all());
        }
        assert!(mesh.colors.iter().all(|&c| c == VoxelKind::Stone.color()
            || c == VoxelKind::Air.color()));
    }

    #[test]
    fn parallel_and_sequential_agree_on_size() {
        let (octree, config) = sphere_chunk(true);
        let parallel = generate_mesh(&octree, &config);
        let sequential = generate_mesh(&octree, &config.clone().with_parallel(false));
        assert_eq!(parallel.vertex_count(), sequential.vertex_count());
        assert_eq!(parallel.triangle_count(), sequential.triangle_count());
    }

    #[test]
    fn post_processing_again_changes_nothing() {
        let (octree, config) = sphere_chunk(false);
        let mut mesh = generate_mesh(&octree, &config);
        let before = mesh.clone();
        post_process(&mut mesh, config.weld_quantization);
        assert_eq!(mesh, before);
        post_process(&mut mesh, config.weld_quantization);
        assert_eq!(mesh, before);
    }

    #[test]
    fn triangles_face_away_from_sphere_center() {
        let center = Vec3A::splat(16.0);
        let params = ChunkParams {
            origin: Vec3A::ZERO,
            voxel_size: 1.0,
            max_depth: 5,
            fill_depth: 5,
        };
        let mut octree = SparseVoxelOctree::with_max_depth(params.max_depth).unwrap();
        let source = density_primitives::solid(VoxelKind::Stone, |p| {
            density_primitives::sphere(center, 9.0, p)
        });
        octree.fill(&source, &params).unwrap();
        let mesh = generate_mesh(&octree, &ExtractionConfig::for_chunk(&params));
        assert!(mesh.triangle_count() > 0);

        let mut inward = 0;
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|v| Vec3A::from(mesh.positions[v as usize]));
            let face_normal = (b - a).cross(c - a);
            if face_normal.length() < 1e-6 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            if face_normal.dot(centroid - center) <= 0.0 {
                inward += 1;
            }
        }
        assert_eq!(inward, 0, "of {} triangles", mesh.triangle_count());
    }

    #[test]
    fn quad_winding_follows_shared_edge_sign() {
        // Solid below y = 2, so every shared Y edge at the surface runs from
        // solid to air.
        let params = ChunkParams {
            origin: Vec3A::ZERO,
            voxel_size: 1.0,
            max_depth: 3,
            fill_depth: 3,
        };
        let mut octree = SparseVoxelOctree::with_max_depth(params.max_depth).unwrap();
        let source = density_primitives::solid(VoxelKind::Dirt, |p| {
            density_primitives::ground(2.0, p)
        });
        octree.fill(&source, &params).unwrap();
        let mesh = generate_mesh(&octree, &ExtractionConfig::for_chunk(&params));
        assert!(mesh.triangle_count() > 0);

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|v| Vec3A::from(mesh.positions[v as usize]));
            let face_normal = (b - a).cross(c - a);
            if face_normal.length() > 1e-6 {
                assert!(face_normal.y > 0.0, "{face_normal}");
            }
        }
        for n in &mesh.normals {
            assert!(n.y > 0.9, "{n}");
        }
    }

    #[test]
    fn single_crossing_cell_has_vertex_but_no_triangles() {
        // One cell whose bottom edge runs from +0.5 to -0.5, all other corners
        // on the threshold. The voxels behind the edge match the cell, so the
        // gradient there is flat and the vertex falls back to the crossing.
        let mut octree = SparseVoxelOctree::with_max_depth(2).unwrap();
        octree.set_region(0, UVec3::ZERO, VoxelKind::Stone, 0.0).unwrap();
        for p in [[1, 1, 1], [1, 0, 1], [1, 1, 0], [1, 0, 0]] {
            octree.set_voxel(UVec3::from(p), VoxelKind::Stone, 0.5).unwrap();
        }
        octree.set_voxel(UVec3::new(2, 1, 1), VoxelKind::Air, -0.5).unwrap();

        let config = ExtractionConfig::default();
        let cells = collect_active_cells(&octree, &config);
        let cell = cells
            .iter()
            .find(|c| c.key.depth == 2 && c.key.coord == UVec3::new(1, 1, 1))
            .unwrap();

        let (key, vertex) = estimate_cell_vertex(&octree, cell, &config, 4.0).unwrap();
        assert_eq!(key, cell.key);
        // Crossing halfway along the edge from (1,1,1) to (2,1,1).
        assert!((vertex.position - Vec3A::new(1.5, 1.0, 1.0)).length() < 1e-5);

        let ids = HashMap::from([(key, 0)]);
        let mut mesh = MeshBuffers::default();
        mesh.push_vertex(&vertex);
        contour_cells(&[key], &ids, |quad| mesh.push_quad(quad.vertices));
        assert_eq!(mesh.triangle_count(), 0);
    }
}
