//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, binds a GPU context to each window
//! and drives the grid render loop through its lifecycle callbacks.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
