use glam::UVec3;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort an octree write or a chunk generation pass.
///
/// Geometry edge cases (empty octrees, singular QEFs, missing neighbors) are
/// never reported here; they degrade to well-defined output instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("voxel position {position} is outside the chunk range [0, {extent})")]
    OutOfBounds { position: UVec3, extent: u32 },

    #[error("depth {depth} exceeds the octree depth bound {max_depth}")]
    InvalidDepth { depth: u8, max_depth: u8 },

    #[error("chunk parameters expect depth bound {chunk_depth}, octree has {octree_depth}")]
    DepthMismatch { chunk_depth: u8, octree_depth: u8 },

    #[error("density source failed: {0}")]
    DensitySource(String),

    #[error("mesh buffers are inconsistent: {0}")]
    InconsistentMesh(String),

    #[error("chunk generation worker disconnected before handing off its result")]
    WorkerDisconnected,
}
