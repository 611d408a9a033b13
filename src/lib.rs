//! Sparse Voxel Octree Dual Contouring
//!
//! Stores one chunk of a volumetric density field in a sparse voxel octree
//! ([`SparseVoxelOctree`]) and turns it into triangle mesh buffers with Dual
//! Contouring ([`generate_mesh`]).
//!
//! The extraction pipeline runs in these stages:
//!
//! 1. collect active leaf cells (cells whose density lies near the iso
//!    threshold)
//! 2. gather hermite data (edge crossing points and normals) for each cell
//! 3. solve a regularized QEF per cell for its surface vertex (in parallel)
//! 4. stitch vertices of face-adjacent cells into quads, wound to face out of
//!    the solid
//! 5. weld co-located vertices and smooth normals
//!
//! # References
//!
//! - Tao Ju, Frank Losasso, Scott Schaefer, Joe Warren ["Dual Contouring of
//!   Hermite Data"](https://www.cs.rice.edu/~jwarren/papers/dualcontour.pdf)
//!
//! # Known Approximations
//!
//! - a leaf counts as active when its density is within a fixed band of the
//!   threshold, without looking at its neighbors
//! - density between octree levels is a plain average of child leaves rather
//!   than a trilinear interpolation
//! - the QEF is solved with Tikhonov-regularized normal equations rather than
//!   an SVD pseudo-inverse, so sharp features are rounded off

mod cells;
mod chunk;
mod config;
mod contour;
mod density;
mod error;
mod extract;
mod hermite;
mod mesh;
mod qef;
mod svo;
mod tables;

pub mod density_primitives;

pub use cells::*;
pub use chunk::*;
pub use config::*;
pub use contour::*;
pub use density::*;
pub use error::*;
pub use extract::*;
pub use hermite::*;
pub use mesh::*;
pub use qef::*;
pub use svo::*;
