use std::fmt;

use crate::paint::Color;

use super::MeshError;

/// Side length of an N×N grid of unit cells.
///
/// Invariant: `1 <= n <= GridSize::MAX`. The upper bound keeps the draw's
/// index count (`6·n²`) representable as `u32`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GridSize(u32);

impl GridSize {
    /// Largest grid whose `6·n²` triangle corners still fit a `u32` count.
    pub const MAX: u32 = 26_754;

    /// Validates `n` and wraps it. Fails before anything is allocated.
    pub fn new(n: i64) -> Result<Self, MeshError> {
        if n < 1 || n > i64::from(Self::MAX) {
            return Err(MeshError::InvalidGridSize(n));
        }
        Ok(Self(n as u32))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Number of unit cells (`n²`).
    #[inline]
    pub fn cell_count(self) -> usize {
        let n = self.0 as usize;
        n * n
    }

    /// Number of grid intersection points (`(n + 1)²`).
    #[inline]
    pub fn vertex_count(self) -> usize {
        let side = self.0 as usize + 1;
        side * side
    }

    /// Length of the flat position array (3 floats per vertex).
    #[inline]
    pub fn vertex_array_len(self) -> usize {
        3 * self.vertex_count()
    }

    /// Length of the flat color array (4 floats per vertex).
    #[inline]
    pub fn color_array_len(self) -> usize {
        4 * self.vertex_count()
    }

    /// Number of triangle corners drawn (two triangles per cell).
    ///
    /// This is the element count passed to the indexed draw call, not the
    /// number of unique vertices.
    #[inline]
    pub fn triangle_corner_count(self) -> usize {
        6 * self.cell_count()
    }

    /// Returns true if `(x, y)` is a grid point, i.e. both lie in `[0, n]`.
    #[inline]
    pub fn contains(self, x: u32, y: u32) -> bool {
        x <= self.0 && y <= self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self(2)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0}", self.0)
    }
}

// ── generators ────────────────────────────────────────────────────────────

/// Grid intersection points in row-major order: outer loop over x, inner
/// loop over y. Index computation depends on this ordering.
pub fn compute_vertices(size: GridSize) -> Vec<[f32; 3]> {
    let n = size.get();
    let mut vertices = Vec::with_capacity(size.vertex_count());
    for x in 0..=n {
        for y in 0..=n {
            vertices.push([x as f32, y as f32, 0.0]);
        }
    }
    vertices
}

/// Two triangles per cell, `(BL, TL, BR)` then `(TL, TR, BR)`.
///
/// The shared diagonal always runs from TL to BR.
pub fn compute_indices(size: GridSize) -> Vec<u32> {
    let n = size.get();
    let mut indices = Vec::with_capacity(size.triangle_corner_count());
    for i in 0..n {
        for j in 0..n {
            let bl = i * (n + 1) + j;
            let tl = bl + 1;
            let br = bl + n + 1;
            let tr = br + 1;

            indices.extend_from_slice(&[bl, tl, br]);
            indices.extend_from_slice(&[tl, tr, br]);
        }
    }
    indices
}

/// Per-vertex RGBA, all channels 1.0 (opaque white).
pub fn compute_colors(size: GridSize) -> Vec<f32> {
    vec![1.0; size.color_array_len()]
}

/// Per-vertex RGBA with the given points recolored.
///
/// Every override is range-checked and must have finite channels before the
/// buffer is built. Later entries for the same point win.
pub fn compute_colors_with(
    size: GridSize,
    overrides: &[PointColor],
) -> Result<Vec<f32>, MeshError> {
    for p in overrides {
        if !size.contains(p.x, p.y) {
            return Err(MeshError::PointOutOfRange {
                x: p.x,
                y: p.y,
                size: size.get(),
            });
        }
        if !p.color.is_finite() {
            return Err(MeshError::NonFiniteColor { x: p.x, y: p.y });
        }
    }

    let mut colors = compute_colors(size);
    for p in overrides {
        let rgba = p.color.to_array();
        for channel in ColorChannel::ALL {
            colors[point_to_color_offset(size, p.x, p.y, channel)] = rgba[channel as usize];
        }
    }
    Ok(colors)
}

// ── color addressing ──────────────────────────────────────────────────────

/// Channel within a vertex's RGBA entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; 4] = [
        ColorChannel::Red,
        ColorChannel::Green,
        ColorChannel::Blue,
        ColorChannel::Alpha,
    ];
}

/// Offset of `channel` for grid point `(x, y)` in the flat color buffer.
///
/// `4·(n+1)·x + 4·y + channel`. All per-point color access goes through
/// here so the layout lives in one place. `(x, y)` must be a grid point.
#[inline]
pub fn point_to_color_offset(size: GridSize, x: u32, y: u32, channel: ColorChannel) -> usize {
    debug_assert!(size.contains(x, y), "({x}, {y}) outside {size} grid");
    let side = size.get() as usize + 1;
    4 * side * x as usize + 4 * y as usize + channel as usize
}

/// Color assigned to a single grid point at generation time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointColor {
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

// ── bundled mesh ──────────────────────────────────────────────────────────

/// CPU-side geometry for one grid, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMesh {
    size: GridSize,
    vertices: Vec<[f32; 3]>,
    indices: Vec<u32>,
    colors: Vec<f32>,
}

impl GridMesh {
    /// Validates `n` and generates the mesh. Rejects `n < 1` before any
    /// buffer is allocated.
    pub fn generate(n: i64) -> Result<Self, MeshError> {
        Ok(Self::from_size(GridSize::new(n)?))
    }

    /// Generates vertices, indices and uniform white colors.
    pub fn from_size(size: GridSize) -> Self {
        Self {
            size,
            vertices: compute_vertices(size),
            indices: compute_indices(size),
            colors: compute_colors(size),
        }
    }

    /// Generates the mesh with per-point color overrides.
    pub fn with_point_colors(size: GridSize, overrides: &[PointColor]) -> Result<Self, MeshError> {
        let colors = compute_colors_with(size, overrides)?;
        Ok(Self {
            size,
            vertices: compute_vertices(size),
            indices: compute_indices(size),
            colors,
        })
    }

    #[inline]
    pub fn size(&self) -> GridSize {
        self.size
    }

    #[inline]
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// RGBA of grid point `(x, y)`, or `None` outside the grid.
    pub fn color_at(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if !self.size.contains(x, y) {
            return None;
        }
        let base = point_to_color_offset(self.size, x, y, ColorChannel::Red);
        let mut rgba = [0.0; 4];
        rgba.copy_from_slice(&self.colors[base..base + 4]);
        Some(rgba)
    }
}

// ── tests ─────────────────────────────────────────────────────────────────
