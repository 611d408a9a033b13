use crate::HermiteSample;
use glam::{Mat3, Vec3, Vec3A};
use std::ops::Add;

/// Constants of [`Qef::solve`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QefParams {
    /// Added to each diagonal entry of `AᵀA` before solving.
    pub regularization: f32,
    /// Systems with `|det|` below this fall back to the mass point.
    pub singular_epsilon: f32,
    /// Solutions are pulled back to at most this distance from the mass point.
    pub max_offset: f32,
}

impl Default for QefParams {
    fn default() -> Self {
        Self {
            regularization: 0.01,
            singular_epsilon: 1e-4,
            max_offset: 0.5,
        }
    }
}

/// Quadratic Error Function
///
/// `x^T A x - 2 b^T x + c`, accumulated from tangent planes as the normal
/// equations `AᵀA = Σ nnᵀ`, `Aᵀb = Σ n(n·p)`, along with the point sum for the
/// mass point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Qef {
    a00: f32,
    a01: f32,
    a02: f32,
    a11: f32,
    a12: f32,
    a22: f32,

    b: Vec3A,

    c: f32,

    point_sum: Vec3A,
    count: u32,
}

impl Qef {
    /// The QEF of a single tangent plane through `p` with normal `n`.
    pub fn plane(p: Vec3A, n: Vec3A) -> Self {
        let d = p.dot(n);
        let [[a00, a01, a02], [_, a11, a12], [_, _, a22]] = self_outer_product(n.into());
        Self {
            // Keep one triangle of the symmetric matrix.
            a00,
            a01,
            a02,
            a11,
            a12,
            a22,
            b: d * n,
            c: d * d,
            point_sum: p,
            count: 1,
        }
    }

    pub fn from_samples(samples: &[HermiteSample]) -> Self {
        samples
            .iter()
            .map(|s| Self::plane(s.point, s.normal))
            .fold(Self::default(), Add::add)
    }

    pub fn add_sample(&mut self, p: Vec3A, n: Vec3A) {
        *self = std::mem::take(self) + Self::plane(p, n);
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Centroid of the accumulated points.
    pub fn mass_point(&self) -> Option<Vec3A> {
        (self.count > 0).then(|| self.point_sum / self.count as f32)
    }

    /// Residual L2 error. `x^T A x - 2 b^T x + c`
    pub fn error(&self, p: Vec3A) -> f32 {
        p.dot(self.mul_a(p)) - 2.0 * p.dot(self.b) + self.c
    }

    /// `AᵀA x`
    fn mul_a(&self, x: Vec3A) -> Vec3A {
        Vec3A::new(
            self.a00 * x[0] + self.a01 * x[1] + self.a02 * x[2],
            self.a01 * x[0] + self.a11 * x[1] + self.a12 * x[2],
            self.a02 * x[0] + self.a12 * x[1] + self.a22 * x[2],
        )
    }

    /// Minimizes the regularized error with Cramer's rule.
    ///
    /// The system is solved for the offset from the mass point, so the
    /// regularization pulls weakly constrained directions toward the mass
    /// point rather than toward the world origin.
    ///
    /// Returns the origin for an empty QEF and the mass point for a
    /// near-singular one. The result never lies farther than
    /// `params.max_offset` from the mass point.
    pub fn solve(&self, params: &QefParams) -> Vec3A {
        let Some(mass_point) = self.mass_point() else {
            return Vec3A::ZERO;
        };

        let r = params.regularization;
        let cols = [
            Vec3::new(self.a00 + r, self.a01, self.a02),
            Vec3::new(self.a01, self.a11 + r, self.a12),
            Vec3::new(self.a02, self.a12, self.a22 + r),
        ];
        let det = Mat3::from_cols(cols[0], cols[1], cols[2]).determinant();
        if det.abs() < params.singular_epsilon {
            return mass_point;
        }

        // (AᵀA + rI) y = Aᵀb - AᵀA m
        let b = Vec3::from(self.b - self.mul_a(mass_point));
        let offset = Vec3A::new(
            Mat3::from_cols(b, cols[1], cols[2]).determinant(),
            Mat3::from_cols(cols[0], b, cols[2]).determinant(),
            Mat3::from_cols(cols[0], cols[1], b).determinant(),
        ) / det;

        if offset.length() > params.max_offset {
            mass_point + offset.normalize() * params.max_offset
        } else {
            mass_point + offset
        }
    }
}

impl Add for Qef {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            a00: self.a00 + rhs.a00,
            a01: self.a01 + rhs.a01,
            a02: self.a02 + rhs.a02,
            a11: self.a11 + rhs.a11,
            a12: self.a12 + rhs.a12,
            a22: self.a22 + rhs.a22,
            b: self.b + rhs.b,
            c: self.c + rhs.c,
            point_sum: self.point_sum + rhs.point_sum,
            count: self.count + rhs.count,
        }
    }
}

fn self_outer_product([a, b, c]: [f32; 3]) -> [[f32; 3]; 3] {
    [
        [a * a, a * b, a * c],
        [a * b, b * b, b * c],
        [a * c, b * c, c * c],
    ]
}
