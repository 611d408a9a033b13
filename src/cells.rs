use crate::{tables::octant_offset, ExtractionConfig, OctreeNode, SparseVoxelOctree};
use glam::{UVec3, Vec3A};
use ilattice::extent::Extent;

/// Canonical address of a cell: its coordinate in the `2^depth` grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub depth: u8,
    pub coord: UVec3,
}

impl CellKey {
    pub const ROOT: Self = Self {
        depth: 0,
        coord: UVec3::ZERO,
    };

    #[inline]
    pub fn child(self, octant: usize) -> Self {
        Self {
            depth: self.depth + 1,
            coord: self.coord * 2 + octant_offset(octant),
        }
    }

    /// The cell `step` grid units away at the same depth.
    #[inline]
    pub fn offset(self, step: UVec3) -> Self {
        Self {
            depth: self.depth,
            coord: self.coord + step,
        }
    }
}

/// A leaf whose density lies near the iso threshold during one extraction
/// pass.
#[derive(Clone, Copy, Debug)]
pub struct ActiveCell<'a> {
    pub key: CellKey,
    pub node: &'a OctreeNode,
    pub center: Vec3A,
    pub size: f32,
}

impl<'a> ActiveCell<'a> {
    pub fn extent(&self) -> Extent<Vec3A> {
        Extent::from_min_and_shape(
            self.center - Vec3A::splat(0.5 * self.size),
            Vec3A::splat(self.size),
        )
    }
}

/// Leaf test for activity. This looks only at the leaf's own density, not at
/// its neighbors.
#[inline]
pub fn leaf_is_active(density: f32, threshold: f32, band: f32) -> bool {
    (density - threshold).abs() < band
}

/// Gathers every active leaf of `octree` in depth-first octant order.
pub fn collect_active_cells<'a>(
    octree: &'a SparseVoxelOctree,
    config: &ExtractionConfig,
) -> Vec<ActiveCell<'a>> {
    let mut collector = Collector {
        config,
        chunk_size: config.chunk_size(octree.max_depth()),
        cells: Vec::new(),
        straddling_branches: 0,
    };
    collector.visit(octree.root(), CellKey::ROOT);

    log::debug!(
        "Collected {} active cells ({} branches straddle the threshold)",
        collector.cells.len(),
        collector.straddling_branches
    );

    collector.cells
}

struct Collector<'a, 'c> {
    config: &'c ExtractionConfig,
    chunk_size: f32,
    cells: Vec<ActiveCell<'a>>,
    straddling_branches: usize,
}

impl<'a, 'c> Collector<'a, 'c> {
    fn visit(&mut self, node: &'a OctreeNode, key: CellKey) {
        let threshold = self.config.iso_threshold;
        let Some(children) = node.children() else {
            if leaf_is_active(node.density(), threshold, self.config.leaf_activity_band) {
                let size = self.chunk_size / (1u32 << key.depth) as f32;
                let center = self.config.chunk_origin + (key.coord.as_vec3a() + 0.5) * size;
                self.cells.push(ActiveCell {
                    key,
                    node,
                    center,
                    size,
                });
            }
            return;
        };

        // Branches never become cells themselves; descend either way.
        if log::log_enabled!(log::Level::Debug) && node.straddles(threshold) {
            self.straddling_branches += 1;
        }
        for (octant, child) in children.iter().enumerate() {
            self.visit(child, key.child(octant));
        }
    }
}
