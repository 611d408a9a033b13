use crate::{tables::QUAD_AXES, CellKey, MeshVertexId};
use glam::UVec3;
use std::collections::HashMap;

/// Four same-depth cells around one shared cell edge, each carrying a vertex.
///
/// `vertices` belong to `[base, base + primary, base + secondary,
/// base + primary + secondary]`. In that order, [`quad_triangles`] winds the
/// quad to face along `+edge_axis`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DualQuad {
    pub base: CellKey,
    pub axes: [UVec3; 2],
    pub vertices: [MeshVertexId; 4],
}

impl DualQuad {
    /// Axis of the shared edge.
    #[inline]
    pub fn edge_axis(&self) -> UVec3 {
        UVec3::ONE - self.axes[0] - self.axes[1]
    }

    /// Grid corners (at the quad's depth) at the low and high ends of the
    /// shared edge.
    pub fn shared_edge(&self) -> [UVec3; 2] {
        let [primary, secondary] = self.axes;
        let start = self.base.coord + primary + secondary;
        [start, start + self.edge_axis()]
    }

    /// The same quad wound the other way round.
    pub fn flipped(self) -> Self {
        let [v0, v1, v2, v3] = self.vertices;
        Self {
            vertices: [v0, v2, v1, v3],
            ..self
        }
    }
}

/// Visits the dual quad of every unit square of cells that all carry a
/// vertex.
///
/// For each cell `c0` and each of the 3 orientations, the square is
/// `[c0, c0 + primary, c0 + secondary, c0 + primary + secondary]`. Squares
/// with any cell lacking a vertex are skipped; this is the normal situation at
/// the surface boundary. Orienting the quad is up to `visit_quad`.
pub fn contour_cells(
    cells: &[CellKey],
    vertex_ids: &HashMap<CellKey, MeshVertexId>,
    mut visit_quad: impl FnMut(DualQuad),
) {
    for &c0 in cells {
        let Some(&v0) = vertex_ids.get(&c0) else { continue };

        for axes @ [primary, secondary] in QUAD_AXES {
            let c1 = c0.offset(primary);
            let quad = [c1, c0.offset(secondary), c1.offset(secondary)]
                .map(|c| vertex_ids.get(&c).copied());
            if let [Some(v1), Some(v2), Some(v3)] = quad {
                visit_quad(DualQuad {
                    base: c0,
                    axes,
                    vertices: [v0, v1, v2, v3],
                });
            }
        }
    }
}

/// Splits a quad from [`contour_cells`] into two triangles with the same
/// winding.
#[inline]
pub fn quad_triangles([v0, v1, v2, v3]: [MeshVertexId; 4]) -> [MeshVertexId; 6] {
    [v0, v1, v3, v0, v3, v2]
}
