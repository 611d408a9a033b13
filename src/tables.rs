use glam::UVec3;

/// Unit offsets of the 8 cube corners: the bottom (`-Y`) ring followed by the
/// top (`+Y`) ring, both wound the same way.
pub const CUBE_CORNER_OFFSETS: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Pairs of corners (indices into [`CUBE_CORNER_OFFSETS`]) joined by a cube
/// edge.
pub const CUBE_EDGES: [[usize; 2]; 12] = [
    // bottom
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    // top
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    // vertical
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// `(primary, secondary)` axis steps for the 3 quad orientations. A quad
/// spans the square `{c, c + primary, c + secondary, c + primary + secondary}`.
pub const QUAD_AXES: [[UVec3; 2]; 3] = [
    [UVec3::X, UVec3::Y],
    [UVec3::Y, UVec3::Z],
    [UVec3::Z, UVec3::X],
];

/// Position of child `octant` within its parent, one bit per axis (X is the
/// lowest bit).
#[inline]
pub fn octant_offset(octant: usize) -> UVec3 {
    let o = octant as u32;
    UVec3::new(o & 1, (o >> 1) & 1, (o >> 2) & 1)
}
