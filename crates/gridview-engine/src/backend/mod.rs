//! Graphics backend abstraction.
//!
//! `GraphicsBackend` is the only seam between the grid core and the GPU. It
//! mirrors the classic bind-then-draw API: objects are created and referred
//! to by small ids, and draw calls consume whatever program, vertex array and
//! buffers are currently bound.
//!
//! Implementations:
//! - [`WgpuBackend`]: real rendering on a window surface via wgpu
//! - [`RecordingBackend`]: in-memory, records every call (tests, headless hosts)
//!
//! All methods must be called from the thread that owns the rendering
//! context. Nothing here is `Sync`, and nothing isolates one caller's bindings
//! from another's.

mod recording;
mod types;
mod wgpu_backend;

pub use recording::{BackendCall, RecordingBackend};
pub use types::{
    BufferId, BufferTarget, BufferUsage, DrawParams, FrameStatus, IndexType, PrimitiveMode,
    ProgramId, ShaderId, ShaderStage, UniformLocation, VertexArrayId, VertexAttribute,
};
pub use wgpu_backend::WgpuBackend;

use crate::paint::Color;

/// Capability interface over a bind-then-draw graphics API.
///
/// Handles passed in must have been created by the same backend and not yet
/// deleted. Backends are not required to detect violations; the owning
/// wrappers in `shader` and `resources` make them unrepresentable for normal
/// callers.
pub trait GraphicsBackend {
    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    fn compile_shader(&mut self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    /// Diagnostic text from the last compile. May be empty on success.
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> ProgramId;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&mut self, program: ProgramId);

    /// Makes `program` current. `ProgramId::NULL` unbinds.
    fn use_program(&mut self, program: ProgramId);

    /// Looks up a uniform by name. `None` if the linked program has no such
    /// uniform (or is not linked).
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Uploads a column-major 4×4 matrix.
    fn uniform_matrix4(&mut self, location: UniformLocation, matrix: &[f32; 16]);

    // ── vertex arrays & buffers ───────────────────────────────────────────

    fn create_vertex_array(&mut self) -> VertexArrayId;
    fn bind_vertex_array(&mut self, vao: VertexArrayId);
    fn delete_vertex_array(&mut self, vao: VertexArrayId);

    fn create_buffer(&mut self) -> BufferId;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);
    /// Replaces the full contents of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Points `attribute.slot` of the bound vertex array at the bound array
    /// buffer.
    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute);
    fn enable_vertex_attrib_array(&mut self, slot: u32);

    // ── frames ────────────────────────────────────────────────────────────

    fn begin_frame(&mut self) -> FrameStatus;
    /// Clears the whole color target of the open frame.
    fn clear(&mut self, color: Color);
    /// Indexed draw using the current program and vertex array. A null or
    /// unlinked program makes this a no-op.
    fn draw_elements(&mut self, params: DrawParams);
    /// Submits and presents the open frame.
    fn end_frame(&mut self);
}
