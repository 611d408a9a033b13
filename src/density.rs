use crate::VoxelKind;
use glam::Vec3A;

/// Failure reported by an external [`DensitySource`].
pub type SampleError = Box<dyn std::error::Error + Send + Sync>;

/// One evaluation of the terrain density field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensitySample {
    pub kind: VoxelKind,
    /// Positive inside the solid, negative outside.
    pub density: f32,
}

impl DensitySample {
    pub fn new(kind: VoxelKind, density: f32) -> Self {
        Self { kind, density }
    }

    /// Picks `solid` for positive densities and [`VoxelKind::Air`] otherwise.
    pub fn classify(density: f32, solid: VoxelKind) -> Self {
        let kind = if density > 0.0 { solid } else { VoxelKind::Air };
        Self { kind, density }
    }
}

/// The terrain-shaping function consumed during bulk octree fills.
///
/// Sources are sampled from the worker pool, hence `Sync`. Errors are not
/// retried; they abort the fill of the chunk being generated.
pub trait DensitySource: Sync {
    fn sample(&self, position: Vec3A) -> Result<DensitySample, SampleError>;
}

impl<F> DensitySource for F
where
    F: Fn(Vec3A) -> DensitySample + Sync,
{
    #[inline]
    fn sample(&self, position: Vec3A) -> Result<DensitySample, SampleError> {
        Ok(self(position))
    }
}
