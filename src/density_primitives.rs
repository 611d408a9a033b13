//! Analytic density fields. All of them are positive inside the solid.

use crate::{DensitySample, VoxelKind};
use glam::Vec3A;

pub fn sphere(center: Vec3A, r: f32, p: Vec3A) -> f32 {
    r - (p - center).length()
}

/// Solid below the horizontal plane `y = height`.
pub fn ground(height: f32, p: Vec3A) -> f32 {
    height - p.y
}

pub fn cuboid(center: Vec3A, half_extents: Vec3A, p: Vec3A) -> f32 {
    let q = (p - center).abs() - half_extents;
    -(q.max(Vec3A::ZERO).length() + q.max_element().min(0.0))
}

pub fn union(a: f32, b: f32) -> f32 {
    a.max(b)
}

pub fn difference(a: f32, b: f32) -> f32 {
    a.min(-b)
}

/// Wraps a scalar field into a [`crate::DensitySource`] that fills the solid
/// with `kind`.
pub fn solid(
    kind: VoxelKind,
    field: impl Fn(Vec3A) -> f32 + Sync,
) -> impl Fn(Vec3A) -> DensitySample + Sync {
    move |p| DensitySample::classify(field(p), kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_sign_convention() {
        assert!(sphere(Vec3A::ZERO, 2.0, Vec3A::ZERO) > 0.0);
        assert!(sphere(Vec3A::ZERO, 2.0, Vec3A::splat(3.0)) < 0.0);
        assert!(sphere(Vec3A::ZERO, 2.0, Vec3A::new(2.0, 0.0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn cuboid_is_signed_distance() {
        let half = Vec3A::splat(1.0);
        assert!((cuboid(Vec3A::ZERO, half, Vec3A::ZERO) - 1.0).abs() < 1e-6);
        assert!((cuboid(Vec3A::ZERO, half, Vec3A::new(3.0, 0.0, 0.0)) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn solid_classifies_by_sign() {
        let source = solid(VoxelKind::Stone, |p| ground(0.0, p));
        assert_eq!(source(Vec3A::new(0.0, -1.0, 0.0)).kind, VoxelKind::Stone);
        assert_eq!(source(Vec3A::new(0.0, 1.0, 0.0)).kind, VoxelKind::Air);
        assert_eq!(union(-1.0, 2.0), 2.0);
        assert_eq!(difference(2.0, 1.0), -1.0);
    }
}
