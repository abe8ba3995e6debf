use crate::backend::{GraphicsBackend, ShaderStage};

use super::{ProgramHandle, ShaderError, ShaderHandle};

/// Maximum number of info log bytes kept in a [`ShaderError`].
pub const INFO_LOG_CAPACITY: usize = 512;

/// Vertex and fragment source text for one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Compiles one stage. On failure the backend object is deleted before
/// returning.
pub fn compile<B: GraphicsBackend + ?Sized>(
    gfx: &mut B,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderHandle, ShaderError> {
    let id = gfx.create_shader(stage);
    gfx.shader_source(id, source);
    gfx.compile_shader(id);

    if gfx.shader_compile_status(id) {
        let log = gfx.shader_info_log(id);
        if !log.is_empty() {
            log::debug!("{stage} shader compiled with messages:\n{log}");
        }
        return Ok(ShaderHandle { id, stage });
    }

    let log = bounded_log(gfx.shader_info_log(id));
    gfx.delete_shader(id);
    log::error!("{stage} shader failed to compile:\n{log}");
    Err(ShaderError::Compile { stage, log })
}

/// Links a vertex and a fragment stage into a program.
///
/// Both stage handles are consumed and released whether or not linking
/// succeeds. A failed program is deleted.
pub fn link<B: GraphicsBackend + ?Sized>(
    gfx: &mut B,
    vertex: ShaderHandle,
    fragment: ShaderHandle,
) -> Result<ProgramHandle, ShaderError> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        let log = format!(
            "expected a vertex and a fragment shader, got {} and {}",
            vertex.stage, fragment.stage
        );
        vertex.release(gfx);
        fragment.release(gfx);
        log::error!("program failed to link: {log}");
        return Err(ShaderError::Link { log });
    }

    let program = gfx.create_program();
    gfx.attach_shader(program, vertex.id);
    gfx.attach_shader(program, fragment.id);
    gfx.link_program(program);

    let linked = gfx.program_link_status(program);
    let log = gfx.program_info_log(program);

    vertex.release(gfx);
    fragment.release(gfx);

    if linked {
        log::debug!("linked program {program:?}");
        return Ok(ProgramHandle { id: program });
    }

    gfx.delete_program(program);
    let log = bounded_log(log);
    log::error!("program failed to link:\n{log}");
    Err(ShaderError::Link { log })
}

/// Compile vertex, compile fragment, link. Returns the first error; every
/// transient handle is released on the way.
pub fn build<B: GraphicsBackend + ?Sized>(
    gfx: &mut B,
    sources: &ShaderSources,
) -> Result<ProgramHandle, ShaderError> {
    let vertex = compile(gfx, ShaderStage::Vertex, &sources.vertex)?;
    let fragment = match compile(gfx, ShaderStage::Fragment, &sources.fragment) {
        Ok(f) => f,
        Err(e) => {
            vertex.release(gfx);
            return Err(e);
        }
    };
    link(gfx, vertex, fragment)
}

fn bounded_log(mut log: String) -> String {
    if log.len() > INFO_LOG_CAPACITY {
        let mut end = INFO_LOG_CAPACITY;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};

    const VS: &str = "@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;\n\
                      @vertex fn vs_main() {}\n";
    const FS: &str = "@fragment fn fs_main() {}\n";

    fn sources() -> ShaderSources {
        ShaderSources::new(VS, FS)
    }

    // ── compile / link ────────────────────────────────────────────────────

    #[test]
    fn build_links_and_releases_stage_handles() {
        let mut gfx = RecordingBackend::new();
        let program = build(&mut gfx, &sources()).unwrap();

        assert!(!program.is_null());
        assert_eq!(gfx.live_shaders(), 0);
        assert_eq!(gfx.live_objects(), 1);

        program.release(&mut gfx);
        assert_eq!(gfx.live_objects(), 0);
        assert!(gfx.violations().is_empty());
    }

    #[test]
    fn compile_error_carries_stage_and_log() {
        let mut gfx = RecordingBackend::new();
        let err =
            compile(&mut gfx, ShaderStage::Fragment, "@fragment fn fs_main( {\n").unwrap_err();

        match &err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(log.contains("error"), "{log}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(gfx.live_shaders(), 0);
    }

    #[test]
    fn vertex_error_stops_before_fragment() {
        let mut gfx = RecordingBackend::new();
        let err = build(&mut gfx, &ShaderSources::new("@vertex fn vs_main() {", FS)).unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        let created = gfx
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateShader(..)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(gfx.live_objects(), 0);
    }

    #[test]
    fn fragment_error_releases_vertex() {
        let mut gfx = RecordingBackend::new();
        let err = build(&mut gfx, &ShaderSources::new(VS, "fn nothing() {}")).unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert_eq!(gfx.live_objects(), 0);
        assert!(gfx.violations().is_empty());
    }

    #[test]
    fn swapped_stages_fail_to_link_and_release_both() {
        let mut gfx = RecordingBackend::new();
        let v = compile(&mut gfx, ShaderStage::Vertex, VS).unwrap();
        let f = compile(&mut gfx, ShaderStage::Fragment, FS).unwrap();

        let err = link(&mut gfx, f, v).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
        assert_eq!(gfx.live_objects(), 0);
    }

    #[test]
    fn dropped_shader_handle_only_warns() {
        let mut gfx = RecordingBackend::new();
        let v = compile(&mut gfx, ShaderStage::Vertex, VS).unwrap();
        let id = v.id();
        drop(v);

        // The handle has no backend to release through; the object leaks.
        assert_eq!(gfx.live_shaders(), 1);
        assert!(!gfx.calls().iter().any(|c| matches!(c, BackendCall::DeleteShader(..))));

        gfx.delete_shader(id);
        assert_eq!(gfx.live_shaders(), 0);
        assert!(gfx.violations().is_empty());
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn uniform_upload_reaches_program() {
        let mut gfx = RecordingBackend::new();
        let program = build(&mut gfx, &sources()).unwrap();
        let cols: [f32; 16] = std::array::from_fn(|i| i as f32);
        let m = Mat4::from_cols_array(&cols);

        program.use_program(&mut gfx);
        program.set_uniform_mat4(&mut gfx, "transform", &m);

        assert_eq!(gfx.uniform_value(program.id(), "transform"), Some(cols));
        program.release(&mut gfx);
    }

    #[test]
    fn missing_uniform_is_a_no_op() {
        let mut gfx = RecordingBackend::new();
        let program = build(&mut gfx, &sources()).unwrap();
        gfx.clear_calls();

        program.set_uniform_mat4(&mut gfx, "projection", &Mat4::ZERO);

        assert!(gfx.calls().is_empty());
        assert!(gfx.violations().is_empty());
        program.release(&mut gfx);
    }

    #[test]
    fn null_program_release_touches_nothing() {
        let mut gfx = RecordingBackend::new();
        ProgramHandle::null().release(&mut gfx);
        assert!(gfx.calls().is_empty());
    }

    // ── info log ──────────────────────────────────────────────────────────

    #[test]
    fn log_is_bounded_on_char_boundary() {
        let long = "é".repeat(INFO_LOG_CAPACITY);
        let bounded = bounded_log(long);
        assert!(bounded.len() <= INFO_LOG_CAPACITY);
        assert!(bounded.chars().all(|c| c == 'é'));

        assert_eq!(bounded_log("short".to_owned()), "short");
    }
}
