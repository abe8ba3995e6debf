//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and whatever it drives.

mod lifecycle;

pub use lifecycle::Lifecycle;
