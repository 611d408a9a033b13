use crate::{QefParams, MAX_DEPTH};
use glam::Vec3A;

/// Placement and resolution of one chunk during bulk generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkParams {
    /// World-space position of the chunk's minimum corner.
    pub origin: Vec3A,
    /// World-space edge length of a leaf at `max_depth`.
    pub voxel_size: f32,
    /// Depth bound of the chunk's octree.
    pub max_depth: u8,
    /// Depth of the grid sampled from the density source (`2^fill_depth`
    /// samples per axis).
    pub fill_depth: u8,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            origin: Vec3A::ZERO,
            voxel_size: 1.0,
            max_depth: MAX_DEPTH,
            fill_depth: 5,
        }
    }
}

impl ChunkParams {
    pub fn chunk_size(&self) -> f32 {
        chunk_size(self.voxel_size, self.max_depth)
    }
}

/// Parameters of one mesh extraction pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionConfig {
    /// World-space position of the chunk's minimum corner.
    pub chunk_origin: Vec3A,
    /// World-space edge length of a leaf at the octree's depth bound.
    pub voxel_size: f32,
    pub iso_threshold: f32,
    /// A leaf is active when `|density - iso_threshold|` is below this.
    pub leaf_activity_band: f32,
    /// Central-difference step for hermite normals, relative to cell size.
    pub gradient_step_factor: f32,
    pub qef: QefParams,
    /// Positions are rounded to `1 / weld_quantization` before welding.
    pub weld_quantization: f32,
    /// Solve cell QEFs on the rayon pool.
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_origin: Vec3A::ZERO,
            voxel_size: 1.0,
            iso_threshold: 0.0,
            leaf_activity_band: 1.0,
            gradient_step_factor: 0.01,
            qef: QefParams::default(),
            weld_quantization: 1000.0,
            parallel: true,
        }
    }
}

impl ExtractionConfig {
    pub fn new(chunk_origin: Vec3A, voxel_size: f32, iso_threshold: f32) -> Self {
        Self {
            chunk_origin,
            voxel_size,
            iso_threshold,
            ..Default::default()
        }
    }

    pub fn for_chunk(params: &ChunkParams) -> Self {
        Self::new(params.origin, params.voxel_size, 0.0)
    }

    pub fn with_iso_threshold(mut self, iso_threshold: f32) -> Self {
        self.iso_threshold = iso_threshold;
        self
    }

    pub fn with_qef(mut self, qef: QefParams) -> Self {
        self.qef = qef;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// World-space edge length of a chunk whose octree is bounded by
    /// `max_depth`.
    pub fn chunk_size(&self, max_depth: u8) -> f32 {
        chunk_size(self.voxel_size, max_depth)
    }

    /// Converts a world-space position into continuous octree coordinates
    /// (units of leaves at the depth bound).
    #[inline]
    pub fn to_local(&self, world: Vec3A) -> Vec3A {
        (world - self.chunk_origin) / self.voxel_size
    }
}

fn chunk_size(voxel_size: f32, max_depth: u8) -> f32 {
    voxel_size * (1u32 << max_depth) as f32
}
