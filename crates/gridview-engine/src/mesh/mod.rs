//! Grid mesh generation.
//!
//! Pure CPU-side computation of the planar N×N grid: positions, triangle
//! indices and per-vertex colors. Nothing here touches the GPU.
//!
//! Layout conventions:
//! - vertices are row-major with x as the outer loop, y as the inner loop
//! - each cell emits `(BL, TL, BR)` then `(TL, TR, BR)`
//! - colors are 4 floats per vertex, addressed via [`point_to_color_offset`]

mod error;
mod grid;

pub use error::MeshError;
pub use grid::{
    compute_colors, compute_colors_with, compute_indices, compute_vertices,
    point_to_color_offset, ColorChannel, GridMesh, GridSize, PointColor,
};
