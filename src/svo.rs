use crate::{ChunkParams, DensitySource, Error, Result};
use glam::{UVec3, Vec3A, Vec4};
use rayon::prelude::*;

/// Depth bound of a chunk octree: `2^MAX_DEPTH` addressable leaves per axis.
pub const MAX_DEPTH: u8 = 10;

/// Material classification of a voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VoxelKind {
    #[default]
    Air,
    Stone,
    Dirt,
    Grass,
    Sand,
    Snow,
    Water,
}

impl VoxelKind {
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Air
    }

    /// Linear RGBA vertex color for surfaces made of this material.
    pub fn color(self) -> Vec4 {
        match self {
            Self::Air => Vec4::new(1.0, 1.0, 1.0, 1.0),
            Self::Stone => Vec4::new(0.5, 0.5, 0.52, 1.0),
            Self::Dirt => Vec4::new(0.45, 0.32, 0.2, 1.0),
            Self::Grass => Vec4::new(0.3, 0.6, 0.2, 1.0),
            Self::Sand => Vec4::new(0.86, 0.8, 0.55, 1.0),
            Self::Snow => Vec4::new(0.95, 0.95, 0.98, 1.0),
            Self::Water => Vec4::new(0.2, 0.4, 0.8, 0.7),
        }
    }
}

/// Everything stored for a uniform region.
///
/// Only `kind` and `density` take part in meshing; the environmental fields
/// ride along for simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelData {
    pub kind: VoxelKind,
    pub density: f32,
    pub gas: f32,
    pub temperature: f32,
    pub moisture: f32,
}

impl VoxelData {
    /// Value of a freshly created chunk. Air sits one unit outside the
    /// surface so untouched space never looks active to the extractor.
    pub const AIR: Self = Self {
        kind: VoxelKind::Air,
        density: -1.0,
        gas: 0.0,
        temperature: 0.0,
        moisture: 0.0,
    };

    #[inline]
    fn with_material(self, kind: VoxelKind, density: f32) -> Self {
        Self {
            kind,
            density,
            ..self
        }
    }
}

impl Default for VoxelData {
    fn default() -> Self {
        Self::AIR
    }
}

/// A cubic region of the chunk. Its extent is implied by its path from the
/// root.
///
/// A node is either a leaf or owns exactly 8 children.
#[derive(Clone, Debug, Default)]
pub struct OctreeNode {
    data: VoxelData,
    children: Option<Box<[OctreeNode; 8]>>,
}

impl OctreeNode {
    fn leaf(data: VoxelData) -> Self {
        Self {
            data,
            children: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        self.children.as_deref()
    }

    /// For a branch this is the value it held when it was subdivided.
    #[inline]
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    #[inline]
    pub fn kind(&self) -> VoxelKind {
        self.data.kind
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.data.density
    }

    fn subdivide(&mut self) {
        debug_assert!(self.is_leaf());
        let data = self.data;
        self.children = Some(Box::new(std::array::from_fn(|_| Self::leaf(data))));
    }

    /// True if some descendant leaf lies strictly above `threshold` and
    /// another strictly below. Stops scanning once both are found.
    pub fn straddles(&self, threshold: f32) -> bool {
        let mut above = false;
        let mut below = false;
        self.scan_signs(threshold, &mut above, &mut below);
        above && below
    }

    fn scan_signs(&self, threshold: f32, above: &mut bool, below: &mut bool) {
        match self.children() {
            None => {
                *above |= self.data.density > threshold;
                *below |= self.data.density < threshold;
            }
            Some(children) => {
                for child in children {
                    child.scan_signs(threshold, above, below);
                    if *above && *below {
                        return;
                    }
                }
            }
        }
    }

    /// Density seen by the extractor: exact for a leaf, otherwise the plain
    /// average of the immediate children where deeper branches count as 0.
    pub fn sampled_density(&self) -> f32 {
        match self.children() {
            None => self.data.density,
            Some(children) => {
                children
                    .iter()
                    .filter(|c| c.is_leaf())
                    .map(|c| c.data.density)
                    .sum::<f32>()
                    / 8.0
            }
        }
    }

    fn depth(&self) -> u8 {
        self.children()
            .map_or(0, |c| 1 + c.iter().map(Self::depth).max().unwrap_or(0))
    }

    fn node_count(&self) -> usize {
        1 + self
            .children()
            .map_or(0, |c| c.iter().map(Self::node_count).sum())
    }

    fn leaf_count(&self) -> usize {
        self.children()
            .map_or(1, |c| c.iter().map(Self::leaf_count).sum())
    }
}

/// Index of the child containing `position` below a node at `depth`.
///
/// Takes one bit per axis from the position at that depth's resolution:
/// `x + 2y + 4z`.
#[inline]
pub fn octant_index(position: UVec3, depth: u8, max_depth: u8) -> usize {
    debug_assert!(depth < max_depth);
    let shift = u32::from(max_depth - depth - 1);
    let bits = (position >> shift) & UVec3::ONE;
    (bits.x | (bits.y << 1) | (bits.z << 2)) as usize
}

/// Sparse voxel octree covering a single chunk.
///
/// Positions are integer leaf coordinates in `[0, 2^max_depth)` on each axis.
/// Not safe for concurrent writers; each chunk has a single writer.
#[derive(Clone, Debug)]
pub struct SparseVoxelOctree {
    root: OctreeNode,
    max_depth: u8,
}

impl Default for SparseVoxelOctree {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseVoxelOctree {
    /// An all-air chunk bounded by [`MAX_DEPTH`].
    pub fn new() -> Self {
        Self {
            root: OctreeNode::default(),
            max_depth: MAX_DEPTH,
        }
    }

    /// An all-air chunk with a coarser depth bound.
    pub fn with_max_depth(max_depth: u8) -> Result<Self> {
        if max_depth > MAX_DEPTH {
            return Err(Error::InvalidDepth {
                depth: max_depth,
                max_depth: MAX_DEPTH,
            });
        }
        Ok(Self {
            root: OctreeNode::default(),
            max_depth,
        })
    }

    #[inline]
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    #[inline]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Number of addressable leaf positions per axis.
    #[inline]
    pub fn resolution(&self) -> u32 {
        1 << self.max_depth
    }

    /// True if the whole chunk is one air leaf.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_leaf() && self.root.kind().is_empty()
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> u8 {
        self.root.depth()
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn set_voxel(&mut self, position: UVec3, kind: VoxelKind, density: f32) -> Result<()> {
        self.check_bounds(position, self.resolution())?;
        let max_depth = self.max_depth;
        write_node(&mut self.root, position, 0, max_depth, max_depth, &|data: VoxelData| {
            data.with_material(kind, density)
        });
        Ok(())
    }

    /// Assigns a uniform value to the whole node at `depth` whose per-depth
    /// coordinate is `coord`, discarding any finer detail below it.
    pub fn set_region(
        &mut self,
        depth: u8,
        coord: UVec3,
        kind: VoxelKind,
        density: f32,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::InvalidDepth {
                depth,
                max_depth: self.max_depth,
            });
        }
        self.check_bounds(coord, 1 << depth)?;
        let max_depth = self.max_depth;
        let position = coord << u32::from(max_depth - depth);
        write_node(&mut self.root, position, 0, depth, max_depth, &|data: VoxelData| {
            data.with_material(kind, density)
        });
        Ok(())
    }

    /// Updates the environmental fields of a single leaf position.
    pub fn set_environment(
        &mut self,
        position: UVec3,
        gas: f32,
        temperature: f32,
        moisture: f32,
    ) -> Result<()> {
        self.check_bounds(position, self.resolution())?;
        let max_depth = self.max_depth;
        write_node(&mut self.root, position, 0, max_depth, max_depth, &|data: VoxelData| {
            VoxelData {
                gas,
                temperature,
                moisture,
                ..data
            }
        });
        Ok(())
    }

    pub fn get_voxel(&self, position: UVec3) -> Result<(VoxelKind, f32)> {
        let data = self.get_voxel_data(position)?;
        Ok((data.kind, data.density))
    }

    /// Value of the leaf containing `position`. Leaves above the depth bound
    /// are uniform, so every position inside them reads the same value.
    pub fn get_voxel_data(&self, position: UVec3) -> Result<VoxelData> {
        self.check_bounds(position, self.resolution())?;
        Ok(*self.node_at(position, self.max_depth).data())
    }

    /// Density at continuous leaf coordinates `local`, descending no deeper
    /// than `depth_limit`. Positions outside the chunk are clamped to its
    /// border.
    pub fn sample_density(&self, local: Vec3A, depth_limit: u8) -> f32 {
        let max = (self.resolution() - 1) as f32;
        let clamped = local.floor().clamp(Vec3A::ZERO, Vec3A::splat(max));
        let position = UVec3::new(clamped.x as u32, clamped.y as u32, clamped.z as u32);
        self.node_at(position, depth_limit.min(self.max_depth))
            .sampled_density()
    }

    fn node_at(&self, position: UVec3, depth_limit: u8) -> &OctreeNode {
        let mut node = &self.root;
        let mut depth = 0;
        while depth < depth_limit {
            let Some(children) = node.children() else { break };
            node = &children[octant_index(position, depth, self.max_depth)];
            depth += 1;
        }
        node
    }

    /// Replaces the chunk contents with samples of `source` taken at the
    /// centers of the `2^fill_depth` grid.
    ///
    /// Sampling runs on the rayon pool. If any sample fails the octree is
    /// left untouched. `params.max_depth` must match this octree's bound.
    pub fn fill(&mut self, source: &impl DensitySource, params: &ChunkParams) -> Result<()> {
        if params.max_depth != self.max_depth {
            return Err(Error::DepthMismatch {
                chunk_depth: params.max_depth,
                octree_depth: self.max_depth,
            });
        }
        if params.fill_depth > self.max_depth {
            return Err(Error::InvalidDepth {
                depth: params.fill_depth,
                max_depth: self.max_depth,
            });
        }

        let start = std::time::Instant::now();
        let side = 1u32 << params.fill_depth;
        let cell_size = params.voxel_size * (1u32 << (params.max_depth - params.fill_depth)) as f32;
        let samples = (0..side * side * side)
            .into_par_iter()
            .map(|i| {
                let coord = UVec3::new(i % side, (i / side) % side, i / (side * side));
                let center = params.origin + (coord.as_vec3a() + 0.5) * cell_size;
                source.sample(center).map(|sample| (coord, sample))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::DensitySource(e.to_string()))?;

        let mut filled = Self {
            root: OctreeNode::default(),
            max_depth: self.max_depth,
        };
        for (coord, sample) in samples {
            filled.set_region(params.fill_depth, coord, sample.kind, sample.density)?;
        }
        *self = filled;

        log::debug!(
            "Filled chunk at {} with {} samples into {} nodes in {:.1}ms",
            params.origin,
            side * side * side,
            self.node_count(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(())
    }

    fn check_bounds(&self, position: UVec3, extent: u32) -> Result<()> {
        if position.cmpge(UVec3::splat(extent)).any() {
            return Err(Error::OutOfBounds { position, extent });
        }
        Ok(())
    }
}

// Recursive since depth is bounded and each level has a single path.
fn write_node(
    node: &mut OctreeNode,
    position: UVec3,
    depth: u8,
    target_depth: u8,
    max_depth: u8,
    update: &impl Fn(VoxelData) -> VoxelData,
) {
    if depth == target_depth {
        node.children = None;
        node.data = update(node.data);
        return;
    }

    if node.is_leaf() {
        // Writing the value the region already holds keeps it sparse.
        if update(node.data) == node.data {
            return;
        }
        node.subdivide();
    }

    if let Some(children) = node.children.as_deref_mut() {
        let child = &mut children[octant_index(position, depth, max_depth)];
        write_node(child, position, depth + 1, target_depth, max_depth, update);
    }
}
