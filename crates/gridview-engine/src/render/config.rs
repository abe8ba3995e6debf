use crate::mesh::{GridSize, PointColor};
use crate::paint::Color;

/// What the render loop draws.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Fixed for the lifetime of the loop.
    pub grid_size: GridSize,
    /// Background the frame is cleared to before the grid is drawn.
    pub clear_color: Color,
    /// Grid points recolored at generation time; every other point is white.
    pub point_colors: Vec<PointColor>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: GridSize::default(),
            clear_color: Color::SLATE,
            point_colors: Vec::new(),
        }
    }
}

impl GridConfig {
    pub fn with_grid_size(mut self, grid_size: GridSize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_clear_color(mut self, clear_color: Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_point_colors(mut self, point_colors: Vec<PointColor>) -> Self {
        self.point_colors = point_colors;
        self
    }
}
