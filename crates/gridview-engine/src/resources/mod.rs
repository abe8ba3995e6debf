//! GPU-side storage for one grid mesh.
//!
//! A [`GpuResourceSet`] owns a vertex array and three buffers (positions,
//! colors, indices). Getting a set requires [`GpuResourceSet::allocate`], and
//! [`GpuResourceSet::release`] consumes it, so uploading before allocation or
//! after release does not compile.

mod handle;
mod set;

pub use handle::{Buffer, VertexArray};
pub use set::{GpuResourceSet, COLOR_ATTRIBUTE, POSITION_ATTRIBUTE};
