//! wgpu device and window surface.
//!
//! [`Gpu`] owns the device, queue and configured surface of one window and
//! hands out one [`GpuFrame`] at a time. Surface errors are resolved here so
//! the graphics backend only sees [`Acquire`] outcomes.

mod context;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use frame::{Acquire, GpuFrame};
pub use init::GpuInit;
