use crate::tables::{CUBE_CORNER_OFFSETS, CUBE_EDGES};
use glam::Vec3A;

/// Where the surface crosses a cell edge, and the outward surface normal
/// there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HermiteSample {
    pub point: Vec3A,
    pub normal: Vec3A,
}

/// World-space corners of the cube with the given center and edge length, in
/// [`CUBE_CORNER_OFFSETS`] order.
pub fn cube_corners(center: Vec3A, size: f32) -> [Vec3A; 8] {
    let min = center - Vec3A::splat(0.5 * size);
    CUBE_CORNER_OFFSETS.map(|offset| min + Vec3A::from(offset) * size)
}

/// Numerical gradient of `density` at `p` by central differences with step
/// `h` along each axis.
pub fn central_gradient(density: impl Fn(Vec3A) -> f32, p: Vec3A, h: f32) -> Vec3A {
    let dx = Vec3A::new(h, 0.0, 0.0);
    let dy = Vec3A::new(0.0, h, 0.0);
    let dz = Vec3A::new(0.0, 0.0, h);
    Vec3A::new(
        density(p + dx) - density(p - dx),
        density(p + dy) - density(p - dy),
        density(p + dz) - density(p - dz),
    ) / (2.0 * h)
}

/// True if `d0` and `d1` (relative to the threshold) lie strictly on
/// opposite sides of it.
#[inline]
pub fn is_crossing(d0: f32, d1: f32) -> bool {
    (d0 > 0.0 && d1 < 0.0) || (d0 < 0.0 && d1 > 0.0)
}

/// Collects one hermite sample for each of the cube's 12 edges that crosses
/// `threshold`.
///
/// Crossings are placed by linear interpolation between the corner samples.
/// Density increases into the solid, so normals point down the gradient. A
/// flat neighborhood yields a zero normal.
pub fn edge_samples(
    center: Vec3A,
    size: f32,
    threshold: f32,
    gradient_step_factor: f32,
    density: impl Fn(Vec3A) -> f32,
) -> Vec<HermiteSample> {
    let corners = cube_corners(center, size);
    let samples = corners.map(|c| density(c) - threshold);
    let h = size * gradient_step_factor;

    let mut hermite = Vec::new();
    for [e0, e1] in CUBE_EDGES {
        let d0 = samples[e0];
        let d1 = samples[e1];
        if !is_crossing(d0, d1) {
            continue;
        }

        let t = d0 / (d0 - d1);
        let point = corners[e0].lerp(corners[e1], t);
        let normal = -central_gradient(&density, point, h).normalize_or_zero();
        hermite.push(HermiteSample { point, normal });
    }

    hermite
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trilinear interpolation of values given at the unit cube corners.
    fn trilinear(values: [f32; 8]) -> impl Fn(Vec3A) -> f32 {
        move |p: Vec3A| {
            CUBE_CORNER_OFFSETS
                .iter()
                .zip(values)
                .map(|(o, v)| {
                    let w = |o: f32, x: f32| if o > 0.5 { x } else { 1.0 - x };
                    v * w(o[0], p.x) * w(o[1], p.y) * w(o[2], p.z)
                })
                .sum()
        }
    }

    #[test]
    fn corners_follow_table_order() {
        let corners = cube_corners(Vec3A::splat(1.0), 2.0);
        assert_eq!(corners[0], Vec3A::ZERO);
        assert_eq!(corners[2], Vec3A::new(2.0, 0.0, 2.0));
        assert_eq!(corners[6], Vec3A::splat(2.0));
    }

    #[test]
    fn gradient_of_linear_field() {
        let g = central_gradient(|p| 2.0 * p.x - p.z, Vec3A::new(3.0, 1.0, 2.0), 0.01);
        assert!((g - Vec3A::new(2.0, 0.0, -1.0)).length() < 1e-3);
    }

    #[test]
    fn plane_crosses_four_vertical_edges() {
        // Solid below y = 0.25 inside the unit cell.
        let samples = edge_samples(Vec3A::splat(0.5), 1.0, 0.0, 0.01, |p| 0.25 - p.y);
        assert_eq!(samples.len(), 4);
        for s in samples {
            assert!((s.point.y - 0.25).abs() < 1e-5);
            assert!((s.normal - Vec3A::Y).length() < 1e-4);
        }
    }

    #[test]
    fn threshold_shifts_crossings() {
        let samples = edge_samples(Vec3A::splat(0.5), 1.0, 0.5, 0.01, |p| 1.0 - p.y);
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|s| (s.point.y - 0.5).abs() < 1e-5));
    }

    #[test]
    fn uniform_cell_has_no_crossings() {
        assert!(edge_samples(Vec3A::ZERO, 2.0, 0.0, 0.01, |_| 3.0).is_empty());
        assert!(edge_samples(Vec3A::ZERO, 2.0, 0.0, 0.01, |_| -3.0).is_empty());
    }

    #[test]
    fn single_sign_changing_edge_gives_single_sample() {
        // +1 at corner 0, -1 at corner 1, everything else on the threshold.
        let density = trilinear([1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let samples = edge_samples(Vec3A::splat(0.5), 1.0, 0.0, 0.01, density);
        assert_eq!(samples.len(), 1);
        assert!((samples[0].point - Vec3A::new(0.5, 0.0, 0.0)).length() < 1e-6);
        assert!((samples[0].normal - Vec3A::X).length() < 1e-3);
    }
}
