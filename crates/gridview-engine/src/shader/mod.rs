//! Shader compilation and program linking.
//!
//! Raw backend ids are wrapped in owning handles. A [`ShaderHandle`] lives
//! only between compile and link; [`link`] consumes both stages and releases
//! them whatever the outcome. A [`ProgramHandle`] is released by value.
//!
//! Failures never abort the caller: they come back as [`ShaderError`] with
//! the backend's diagnostic text, and [`ProgramHandle::null`] stands in for
//! a program that could not be built (draws against it are no-ops).

mod error;
mod handle;
mod pipeline;

pub use error::ShaderError;
pub use handle::{ProgramHandle, ShaderHandle};
pub use pipeline::{build, compile, link, ShaderSources, INFO_LOG_CAPACITY};
