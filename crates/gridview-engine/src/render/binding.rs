use crate::backend::{DrawParams, GraphicsBackend};
use crate::resources::VertexArray;
use crate::shader::ProgramHandle;

use glam::Mat4;

/// Per-frame draw state, program → vertex array → draw.
///
/// Each step consumes the previous state, so a draw cannot be issued
/// without first binding both.
pub struct PipelineBinding<'g, B: GraphicsBackend + ?Sized> {
    gfx: &'g mut B,
}

/// A program is current.
pub struct ProgramBound<'g, 'p, B: GraphicsBackend + ?Sized> {
    gfx: &'g mut B,
    program: &'p ProgramHandle,
}

/// A program and a vertex array are current.
pub struct ArrayBound<'g, B: GraphicsBackend + ?Sized> {
    gfx: &'g mut B,
}

impl<'g, B: GraphicsBackend + ?Sized> PipelineBinding<'g, B> {
    pub fn new(gfx: &'g mut B) -> Self {
        Self { gfx }
    }

    pub fn bind_program<'p>(self, program: &'p ProgramHandle) -> ProgramBound<'g, 'p, B> {
        program.use_program(self.gfx);
        ProgramBound {
            gfx: self.gfx,
            program,
        }
    }
}

impl<'g, B: GraphicsBackend + ?Sized> ProgramBound<'g, '_, B> {
    /// Uploads a matrix uniform of the bound program.
    pub fn set_uniform_mat4(self, name: &str, matrix: &Mat4) -> Self {
        self.program.set_uniform_mat4(self.gfx, name, matrix);
        self
    }

    pub fn bind_vertex_array(self, vao: &VertexArray) -> ArrayBound<'g, B> {
        vao.bind(self.gfx);
        ArrayBound { gfx: self.gfx }
    }
}

impl<B: GraphicsBackend + ?Sized> ArrayBound<'_, B> {
    pub fn draw_indexed(self, params: DrawParams) {
        self.gfx.draw_elements(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};
    use crate::shader::{self, ShaderSources};

    #[test]
    fn calls_follow_binding_order() {
        let mut gfx = RecordingBackend::new();
        let program = shader::build(
            &mut gfx,
            &ShaderSources::new(
                "@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;\n\
                 @vertex fn vs_main() {}",
                "@fragment fn fs_main() {}",
            ),
        )
        .unwrap();
        let vao = VertexArray::create(&mut gfx);
        gfx.clear_calls();

        PipelineBinding::new(&mut gfx)
            .bind_program(&program)
            .set_uniform_mat4("transform", &Mat4::IDENTITY)
            .bind_vertex_array(&vao)
            .draw_indexed(DrawParams::triangles(6));

        let kinds: Vec<&str> = gfx
            .calls()
            .iter()
            .map(|c| match c {
                BackendCall::UseProgram(_) => "use",
                BackendCall::UniformMatrix4(..) => "uniform",
                BackendCall::BindVertexArray(_) => "bind",
                BackendCall::DrawElements { .. } => "draw",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["use", "uniform", "bind", "draw"]);

        vao.release(&mut gfx);
        program.release(&mut gfx);
    }
}
