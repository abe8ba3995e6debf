//! Per-frame grid rendering.
//!
//! [`RenderLoop`] is the [`Lifecycle`](crate::core::Lifecycle) implementor:
//! it builds the program and mesh buffers on `initialize`, then draws the
//! whole grid once per `render`. Binding order inside a frame is carried by
//! [`PipelineBinding`].
//!
//! Convention:
//! - grid space is `[0, n]²` with +Y up
//! - the vertex stage multiplies by the `transform` uniform to reach clip space

mod binding;
mod config;
mod render_loop;
pub mod transform;

pub use binding::{ArrayBound, PipelineBinding, ProgramBound};
pub use config::GridConfig;
pub use render_loop::{RenderLoop, TRANSFORM_UNIFORM};
pub use transform::grid_transform;
