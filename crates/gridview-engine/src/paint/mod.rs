//! Color model shared by the mesh generator and the render loop.

pub mod color;

pub use color::Color;
