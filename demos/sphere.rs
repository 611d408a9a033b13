use glam::Vec3A;
use std::sync::Arc;
use svo_dual_contour::{
    density_primitives::{cuboid, difference, ground, solid, sphere, union},
    spawn_chunk, ChunkParams, ExtractionConfig, VoxelKind,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 64 units across, sampled every 2 units.
    let params = ChunkParams {
        origin: Vec3A::ZERO,
        voxel_size: 0.0625,
        fill_depth: 5,
        ..Default::default()
    };
    let center = Vec3A::splat(32.0);
    let source = solid(VoxelKind::Stone, move |p| {
        let hill = sphere(center, 20.0, p);
        let floor = ground(12.0, p);
        difference(union(hill, floor), cuboid(center, Vec3A::splat(6.0), p))
    });

    let pending = spawn_chunk(Arc::new(source), params, ExtractionConfig::for_chunk(&params));
    let chunk = match pending.wait() {
        Ok(chunk) => chunk,
        Err(e) => {
            log::error!("Chunk generation failed: {e}");
            return;
        }
    };

    if let Err(e) = chunk.mesh.validate() {
        log::error!("{e}");
        return;
    }

    log::info!(
        "Octree: {} nodes, {} leaves, depth {}",
        chunk.octree.node_count(),
        chunk.octree.leaf_count(),
        chunk.octree.depth()
    );
    log::info!(
        "Mesh: {} vertices, {} triangles",
        chunk.mesh.vertex_count(),
        chunk.mesh.triangle_count()
    );
}
