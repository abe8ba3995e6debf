//! gridview engine crate.
//!
//! Generates a planar N×N grid mesh and renders it through a bind-then-draw
//! graphics backend, with owned shader and buffer lifetimes.
//!
//! Layers, bottom-up:
//! - `mesh`: pure CPU geometry
//! - `backend`: the graphics capability trait (wgpu and recording impls)
//! - `shader`, `resources`: owning wrappers over backend objects
//! - `render`: the per-frame loop
//! - `device`, `window`: wgpu context and winit host

pub mod backend;
pub mod core;
pub mod device;
pub mod logging;
pub mod mesh;
pub mod paint;
pub mod render;
pub mod resources;
pub mod shader;
pub mod time;
pub mod window;
