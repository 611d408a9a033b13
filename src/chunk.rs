use crate::{
    generate_mesh, ChunkParams, DensitySource, Error, ExtractionConfig, MeshBuffers, Result,
    SparseVoxelOctree,
};
use std::sync::{
    mpsc::{self, Receiver, TryRecvError},
    Arc,
};

/// A generated chunk: its octree and the surface extracted from it.
#[derive(Clone, Debug)]
pub struct ChunkMesh {
    pub params: ChunkParams,
    pub octree: SparseVoxelOctree,
    pub mesh: MeshBuffers,
}

/// Fills a fresh octree from `source` and extracts its mesh on the calling
/// thread.
pub fn generate_chunk(
    source: &impl DensitySource,
    params: &ChunkParams,
    config: &ExtractionConfig,
) -> Result<ChunkMesh> {
    let start = std::time::Instant::now();
    let mut octree = SparseVoxelOctree::with_max_depth(params.max_depth)?;
    octree.fill(source, params)?;
    let mesh = generate_mesh(&octree, config);

    log::debug!(
        "Generated chunk at {}: {} nodes, {} triangles in {:.1}ms",
        params.origin,
        octree.node_count(),
        mesh.triangle_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ChunkMesh {
        params: *params,
        octree,
        mesh,
    })
}

/// Runs [`generate_chunk`] on the rayon pool. The returned handle delivers
/// the result to whichever thread polls it.
///
/// A started generation always runs to completion; dropping the handle only
/// discards the result.
pub fn spawn_chunk<S>(source: Arc<S>, params: ChunkParams, config: ExtractionConfig) -> PendingChunk
where
    S: DensitySource + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    rayon::spawn(move || {
        let result = generate_chunk(source.as_ref(), &params, &config);
        if sender.send(result).is_err() {
            log::trace!("Discarding chunk at {}: handle was dropped", params.origin);
        }
    });
    PendingChunk { receiver }
}

/// Handle to a chunk generating in the background.
#[derive(Debug)]
pub struct PendingChunk {
    receiver: Receiver<Result<ChunkMesh>>,
}

impl PendingChunk {
    /// Non-blocking poll. Yields the result once; later polls report
    /// [`Error::WorkerDisconnected`].
    pub fn try_take(&self) -> Option<Result<ChunkMesh>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::WorkerDisconnected)),
        }
    }

    /// Blocks until the chunk is done.
    pub fn wait(self) -> Result<ChunkMesh> {
        self.receiver.recv().map_err(|_| Error::WorkerDisconnected)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{density_primitives, DensitySample, SampleError, VoxelKind};
    use glam::Vec3A;

    fn params() -> ChunkParams {
        ChunkParams {
            origin: Vec3A::new(-8.0, -8.0, -8.0),
            voxel_size: 1.0,
            max_depth: 4,
            fill_depth: 4,
        }
    }

    fn terrain(p: Vec3A) -> DensitySample {
        DensitySample::classify(density_primitives::ground(0.3, p), VoxelKind::Grass)
    }

    #[test]
    fn ground_plane_chunk_has_surface() {
        let params = params();
        let chunk = generate_chunk(&terrain, &params, &ExtractionConfig::for_chunk(&params)).unwrap();
        chunk.mesh.validate().unwrap();
        assert!(chunk.mesh.triangle_count() > 0);
        // The surface sits near y = 0.3.
        assert!(chunk.mesh.positions.iter().all(|p| p.y.abs() < 2.0));
    }

    #[test]
    fn spawned_chunk_matches_inline_generation() {
        let params = params();
        let config = ExtractionConfig::for_chunk(&params);
        let inline = generate_chunk(&terrain, &params, &config).unwrap();

        let pending = spawn_chunk(Arc::new(terrain), params, config);
        let spawned = pending.wait().unwrap();
        assert_eq!(spawned.params, params);
        assert_eq!(spawned.mesh.vertex_count(), inline.mesh.vertex_count());
        assert_eq!(spawned.mesh.triangle_count(), inline.mesh.triangle_count());
    }

    fn poll(pending: &PendingChunk) -> Result<ChunkMesh> {
        loop {
            if let Some(result) = pending.try_take() {
                return result;
            }
            std::thread::yield_now();
        }
    }

    #[test]
    fn try_take_yields_result_once() {
        let params = params();
        let pending = spawn_chunk(
            Arc::new(terrain),
            params,
            ExtractionConfig::for_chunk(&params),
        );
        assert!(poll(&pending).is_ok());
        // The worker hangs up right after handing off.
        assert!(matches!(poll(&pending), Err(Error::WorkerDisconnected)));
    }

    struct Unavailable;

    impl DensitySource for Unavailable {
        fn sample(&self, _: Vec3A) -> std::result::Result<DensitySample, SampleError> {
            Err("terrain service offline".into())
        }
    }

    #[test]
    fn source_failure_aborts_generation() {
        let params = params();
        let pending = spawn_chunk(
            Arc::new(Unavailable),
            params,
            ExtractionConfig::for_chunk(&params),
        );
        assert!(matches!(pending.wait(), Err(Error::DensitySource(_))));
    }
}
