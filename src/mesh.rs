use crate::{contour::quad_triangles, Error, Result};
use glam::{IVec3, Vec2, Vec3, Vec3A, Vec4};
use std::collections::HashMap;

pub type MeshVertexId = u32;

/// The single surface vertex of an active cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualContourVertex {
    pub position: Vec3A,
    pub normal: Vec3A,
    pub uv: Vec2,
    pub color: Vec4,
}

/// Parallel vertex attribute arrays plus a triangle list, as handed to the
/// renderer.
///
/// We don't use `Vec3A` here because it's 16-byte-aligned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    /// Every 3 consecutive indices form one triangle.
    pub indices: Vec<MeshVertexId>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
}

impl MeshBuffers {
    pub fn with_capacity(num_vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(num_vertices),
            indices: Vec::with_capacity(num_vertices * 6),
            normals: Vec::with_capacity(num_vertices),
            uvs: Vec::with_capacity(num_vertices),
            colors: Vec::with_capacity(num_vertices),
        }
    }

    pub fn push_vertex(&mut self, vertex: &DualContourVertex) -> MeshVertexId {
        let id = self.positions.len() as MeshVertexId;
        self.positions.push(vertex.position.into());
        self.normals.push(vertex.normal.into());
        self.uvs.push(vertex.uv);
        self.colors.push(vertex.color);
        id
    }

    pub fn push_quad(&mut self, quad: [MeshVertexId; 4]) {
        self.indices.extend_from_slice(&quad_triangles(quad));
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.indices.is_empty()
    }

    /// Checks the hand-off contract: attribute arrays of equal length, whole
    /// triangles only, and every index in range.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        for (name, len) in [
            ("normals", self.normals.len()),
            ("uvs", self.uvs.len()),
            ("colors", self.colors.len()),
        ] {
            if len != n {
                return Err(Error::InconsistentMesh(format!(
                    "{name} has {len} entries for {n} positions"
                )));
            }
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InconsistentMesh(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            )));
        }
        if let Some(&i) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(Error::InconsistentMesh(format!(
                "index {i} is out of range for {n} vertices"
            )));
        }
        Ok(())
    }
}

/// Welds vertices, then replaces every normal with the average of its
/// incident face normals.
pub fn post_process(mesh: &mut MeshBuffers, weld_quantization: f32) {
    weld(mesh, weld_quantization);
    smooth_normals(mesh);
}

/// Merges vertices whose positions agree after rounding to
/// `1 / quantization`.
///
/// The first vertex seen at a position survives with its own attributes;
/// indices of later duplicates are redirected to it.
pub fn weld(mesh: &mut MeshBuffers, quantization: f32) {
    let mut first_at: HashMap<IVec3, MeshVertexId> = HashMap::with_capacity(mesh.vertex_count());
    let mut remap = Vec::with_capacity(mesh.vertex_count());
    let mut welded = MeshBuffers::with_capacity(mesh.vertex_count());

    for (i, &p) in mesh.positions.iter().enumerate() {
        let key = (p * quantization).round().as_ivec3();
        let id = *first_at.entry(key).or_insert_with(|| {
            welded.positions.push(p);
            welded.normals.push(mesh.normals[i]);
            welded.uvs.push(mesh.uvs[i]);
            welded.colors.push(mesh.colors[i]);
            (welded.positions.len() - 1) as MeshVertexId
        });
        remap.push(id);
    }

    welded.indices = mesh.indices.iter().map(|&i| remap[i as usize]).collect();

    log::trace!(
        "Welded {} vertices into {}",
        mesh.vertex_count(),
        welded.vertex_count()
    );

    *mesh = welded;
}

/// Overwrites each referenced vertex normal with the normalized sum of the
/// face normals around it. Vertices no triangle touches keep their normal.
pub fn smooth_normals(mesh: &mut MeshBuffers) {
    let mut sums = vec![Vec3A::ZERO; mesh.vertex_count()];

    for tri in mesh.indices.chunks_exact(3) {
        let p = [tri[0], tri[1], tri[2]].map(|v| Vec3A::from(mesh.positions[v as usize]));
        let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
        for &v in tri {
            sums[v as usize] += face_normal;
        }
    }

    for (normal, sum) in mesh.normals.iter_mut().zip(sums) {
        if sum != Vec3A::ZERO {
            *normal = sum.normalize_or_zero().into();
        }
    }
}
