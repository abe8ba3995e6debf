use glam::Mat4;

use crate::backend::{GraphicsBackend, ProgramId, ShaderId, ShaderStage};

/// Compiled shader stage. Not `Clone`: exactly one owner releases it.
#[derive(Debug)]
pub struct ShaderHandle {
    pub(super) id: ShaderId,
    pub(super) stage: ShaderStage,
}

impl ShaderHandle {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn release<B: GraphicsBackend + ?Sized>(mut self, gfx: &mut B) {
        gfx.delete_shader(self.id);
        self.id = ShaderId::NULL;
    }
}

impl Drop for ShaderHandle {
    fn drop(&mut self) {
        if !self.id.is_null() {
            log::warn!("shader {:?} dropped without release; GPU object leaked", self.id);
        }
    }
}

/// Linked program, or the null program when a build failed.
#[derive(Debug)]
pub struct ProgramHandle {
    pub(super) id: ProgramId,
}

impl ProgramHandle {
    /// Stand-in for a program that failed to build.
    pub const fn null() -> Self {
        Self { id: ProgramId::NULL }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }

    /// Makes this program current for subsequent draws.
    pub fn use_program<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B) {
        gfx.use_program(self.id);
    }

    /// Uploads `matrix` (column-major) to the uniform `name`.
    ///
    /// A name the program does not declare (or the null program) is a no-op.
    pub fn set_uniform_mat4<B: GraphicsBackend + ?Sized>(
        &self,
        gfx: &mut B,
        name: &str,
        matrix: &Mat4,
    ) {
        match gfx.uniform_location(self.id, name) {
            Some(location) => gfx.uniform_matrix4(location, &matrix.to_cols_array()),
            None => log::trace!("uniform `{name}` not found in {:?}; skipped", self.id),
        }
    }

    pub fn release<B: GraphicsBackend + ?Sized>(mut self, gfx: &mut B) {
        if !self.is_null() {
            gfx.delete_program(self.id);
        }
        self.id = ProgramId::NULL;
    }
}

impl Drop for ProgramHandle {
    fn drop(&mut self) {
        if !self.id.is_null() {
            log::warn!("program {:?} dropped without release; GPU object leaked", self.id);
        }
    }
}
