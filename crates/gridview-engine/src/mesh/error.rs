use std::fmt;

/// Error raised by grid mesh generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Grid size below 1. Nothing has been allocated when this is returned.
    InvalidGridSize(i64),
    /// A grid point outside `[0, n]` on either axis.
    PointOutOfRange { x: u32, y: u32, size: u32 },
    /// A point color with a NaN or infinite channel.
    NonFiniteColor { x: u32, y: u32 },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::InvalidGridSize(n) => {
                write!(f, "invalid grid size {n}: a grid needs at least one cell per side")
            }
            MeshError::PointOutOfRange { x, y, size } => {
                write!(f, "grid point ({x}, {y}) is outside a {size}x{size} grid")
            }
            MeshError::NonFiniteColor { x, y } => {
                write!(f, "color of grid point ({x}, {y}) has a non-finite channel")
            }
        }
    }
}

impl std::error::Error for MeshError {}
