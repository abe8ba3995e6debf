use glam::Mat4;

use crate::backend::{DrawParams, FrameStatus, GraphicsBackend};
use crate::core::Lifecycle;
use crate::mesh::{GridMesh, GridSize};
use crate::resources::GpuResourceSet;
use crate::shader::{self, ProgramHandle, ShaderError, ShaderSources};

use super::binding::PipelineBinding;
use super::config::GridConfig;
use super::transform::grid_transform;

/// Name of the matrix uniform the vertex stage must declare.
pub const TRANSFORM_UNIFORM: &str = "transform";

enum State {
    Uninitialized,
    Ready {
        program: ProgramHandle,
        resources: GpuResourceSet,
    },
    TornDown,
}

/// Draws one N×N grid per frame through a [`GraphicsBackend`].
///
/// Owns the backend, the linked program and the mesh buffers. Shader
/// failures do not stop the loop: they are logged, kept in
/// [`diagnostics`](Self::diagnostics), and frames are still begun, cleared
/// and presented with the null program (whose draws are no-ops).
pub struct RenderLoop<B: GraphicsBackend> {
    gfx: B,
    config: GridConfig,
    sources: ShaderSources,
    state: State,

    diagnostics: Vec<ShaderError>,
    last_draw: Option<DrawParams>,
    last_transform: Option<Mat4>,
    frames_rendered: u64,
}

impl<B: GraphicsBackend> RenderLoop<B> {
    pub fn new(gfx: B, config: GridConfig, sources: ShaderSources) -> Self {
        Self {
            gfx,
            config,
            sources,
            state: State::Uninitialized,
            diagnostics: Vec::new(),
            last_draw: None,
            last_transform: None,
            frames_rendered: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.gfx
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gfx
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn grid_size(&self) -> GridSize {
        self.config.grid_size
    }

    /// Shader errors collected during initialization.
    pub fn diagnostics(&self) -> &[ShaderError] {
        &self.diagnostics
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Initialized, but drawing with the null program.
    pub fn is_degraded(&self) -> bool {
        matches!(&self.state, State::Ready { program, .. } if program.is_null())
    }

    /// Parameters of the most recent draw call.
    pub fn last_draw(&self) -> Option<DrawParams> {
        self.last_draw
    }

    /// Transform uploaded with the most recent draw call.
    pub fn last_transform(&self) -> Option<Mat4> {
        self.last_transform
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Releases the program and mesh buffers. Must run while the backend's
    /// context is still alive; later calls do nothing.
    pub fn teardown(&mut self) {
        match std::mem::replace(&mut self.state, State::TornDown) {
            State::Ready { program, resources } => {
                resources.release(&mut self.gfx);
                program.release(&mut self.gfx);
                log::info!("render loop torn down after {} frames", self.frames_rendered);
            }
            State::Uninitialized | State::TornDown => {}
        }
    }
}

impl<B: GraphicsBackend> Lifecycle for RenderLoop<B> {
    fn initialize(&mut self) {
        if !matches!(self.state, State::Uninitialized) {
            log::warn!("initialize called more than once; ignored");
            return;
        }

        let program = match shader::build(&mut self.gfx, &self.sources) {
            Ok(program) => program,
            Err(err) => {
                log::warn!("continuing without a shader program: {err}");
                self.diagnostics.push(err);
                ProgramHandle::null()
            }
        };

        let size = self.config.grid_size;
        let mesh = match GridMesh::with_point_colors(size, &self.config.point_colors) {
            Ok(mesh) => mesh,
            Err(err) => {
                log::warn!("point colors ignored: {err}");
                GridMesh::from_size(size)
            }
        };
        let resources = GpuResourceSet::allocate(&mut self.gfx);
        resources.upload_mesh(&mut self.gfx, &mesh);

        self.state = State::Ready { program, resources };
        log::info!(
            "render loop initialized: {} grid{}",
            self.config.grid_size,
            if self.is_degraded() { " (degraded)" } else { "" }
        );
    }

    fn render(&mut self) {
        let (program, resources) = match &self.state {
            State::Ready { program, resources } => (program, resources),
            State::Uninitialized => {
                log::warn!("render before initialize; skipped");
                return;
            }
            State::TornDown => {
                log::warn!("render after teardown; skipped");
                return;
            }
        };

        match self.gfx.begin_frame() {
            FrameStatus::Ready => {}
            FrameStatus::Skipped => {
                log::trace!("frame skipped");
                return;
            }
            FrameStatus::Lost => {
                log::warn!("surface lost; frame not rendered");
                return;
            }
        }

        self.gfx.clear(self.config.clear_color);

        let transform = grid_transform(self.config.grid_size);
        // Fits by the `GridSize` upper bound.
        let params = DrawParams::triangles(self.config.grid_size.triangle_corner_count() as u32);

        PipelineBinding::new(&mut self.gfx)
            .bind_program(program)
            .set_uniform_mat4(TRANSFORM_UNIFORM, &transform)
            .bind_vertex_array(resources.vertex_array())
            .draw_indexed(params);

        self.gfx.end_frame();

        self.last_draw = Some(params);
        self.last_transform = Some(transform);
        self.frames_rendered += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Grid size, transform and buffers are independent of the drawable.
        log::debug!("resized to {width}x{height}; grid unchanged");
    }
}

impl<B: GraphicsBackend> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, BufferTarget, RecordingBackend, ShaderStage};
    use crate::mesh::{point_to_color_offset, ColorChannel, PointColor};
    use crate::paint::Color;

    const VS: &str = "\
@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
) -> @builtin(position) vec4<f32> {
    return transform * vec4<f32>(position, 1.0);
}
";
    const FS: &str = "\
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
";

    fn grid_loop(n: i64) -> RenderLoop<RecordingBackend> {
        let config = GridConfig::default().with_grid_size(GridSize::new(n).unwrap());
        RenderLoop::new(RecordingBackend::new(), config, ShaderSources::new(VS, FS))
    }

    fn ready(n: i64) -> RenderLoop<RecordingBackend> {
        let mut view = grid_loop(n);
        view.initialize();
        view
    }

    fn buffer_snapshot(view: &RenderLoop<RecordingBackend>) -> Vec<Vec<u8>> {
        let State::Ready { resources, .. } = &view.state else {
            panic!("not initialized");
        };
        [resources.vertex_buffer(), resources.color_buffer(), resources.index_buffer()]
            .into_iter()
            .map(|id| view.backend().buffer_contents(id).unwrap_or_default().to_vec())
            .collect()
    }

    // ── initialize ────────────────────────────────────────────────────────

    #[test]
    fn initialize_builds_program_and_buffers() {
        let view = ready(2);

        assert!(view.is_initialized());
        assert!(!view.is_degraded());
        assert!(view.diagnostics().is_empty());
        // program + vao + 3 buffers; stage shaders are gone
        assert_eq!(view.backend().live_objects(), 5);
        assert_eq!(view.backend().live_shaders(), 0);
    }

    #[test]
    fn second_initialize_is_ignored() {
        let mut view = ready(2);
        let calls = view.backend().calls().len();

        view.initialize();

        assert_eq!(view.backend().calls().len(), calls);
        assert_eq!(view.backend().live_objects(), 5);
    }

    #[test]
    fn shader_syntax_error_degrades() {
        let config = GridConfig::default();
        let mut view = RenderLoop::new(
            RecordingBackend::new(),
            config,
            ShaderSources::new("@vertex fn vs_main( {", FS),
        );
        view.initialize();

        assert!(view.is_initialized());
        assert!(view.is_degraded());
        assert_eq!(view.diagnostics().len(), 1);
        assert!(matches!(
            view.diagnostics()[0],
            ShaderError::Compile { stage: ShaderStage::Vertex, .. }
        ));

        view.render();
        view.render();

        assert_eq!(view.backend().frames_presented(), 2);
        let draws = view.backend().draws();
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|(program, _, _)| program.is_null()));
        assert!(view.backend().violations().is_empty());
    }

    #[test]
    fn fragment_error_is_recorded() {
        let mut view = RenderLoop::new(
            RecordingBackend::new(),
            GridConfig::default(),
            ShaderSources::new(VS, VS),
        );
        view.initialize();

        assert!(view.is_degraded());
        assert!(matches!(
            view.diagnostics()[0],
            ShaderError::Compile { stage: ShaderStage::Fragment, .. }
        ));
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn render_before_initialize_does_nothing() {
        let mut view = grid_loop(2);
        view.render();

        assert!(view.backend().calls().is_empty());
        assert_eq!(view.last_draw(), None);
    }

    #[test]
    fn render_clears_then_draws_every_corner() {
        let mut view = ready(3);
        view.backend_mut().clear_calls();
        view.render();

        let calls = view.backend().calls();
        assert_eq!(calls.first(), Some(&BackendCall::BeginFrame));
        assert_eq!(calls.get(1), Some(&BackendCall::Clear(Color::SLATE)));
        assert_eq!(calls.last(), Some(&BackendCall::EndFrame));

        let draw = view.last_draw().unwrap();
        assert_eq!(draw, DrawParams::triangles(54));
        assert_eq!(draw.offset, 0);
        assert!(view.backend().violations().is_empty());
    }

    #[test]
    fn render_binds_program_then_vertex_array() {
        let mut view = ready(2);
        view.backend_mut().clear_calls();
        view.render();

        let order: Vec<usize> = view
            .backend()
            .calls()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                BackendCall::UseProgram(p) if !p.is_null() => Some(i),
                BackendCall::BindVertexArray(_) | BackendCall::DrawElements { .. } => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(order.len(), 3);
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(matches!(view.backend().calls()[order[0]], BackendCall::UseProgram(_)));
        assert!(matches!(view.backend().calls()[order[2]], BackendCall::DrawElements { .. }));
    }

    #[test]
    fn draw_params_are_identical_across_frames() {
        let mut view = ready(4);
        view.render();
        let first = (view.last_draw(), view.last_transform());
        view.render();
        view.render();

        assert_eq!((view.last_draw(), view.last_transform()), first);
        let draws = view.backend().draws();
        assert_eq!(draws.len(), 3);
        assert!(draws.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(view.frames_rendered(), 3);
    }

    #[test]
    fn transform_uniform_is_uploaded() {
        let mut view = ready(2);
        view.render();

        let State::Ready { program, .. } = &view.state else {
            panic!("not initialized");
        };
        let uploaded = view.backend().uniform_value(program.id(), TRANSFORM_UNIFORM);
        assert_eq!(uploaded, Some(grid_transform(GridSize::new(2).unwrap()).to_cols_array()));
    }

    #[test]
    fn buffers_are_uploaded_once() {
        let mut view = ready(2);
        view.render();
        view.render();

        let uploads = view
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::BufferData { .. }))
            .count();
        assert_eq!(uploads, 3);
        let index_uploads = view
            .backend()
            .calls()
            .iter()
            .filter(|c| {
                matches!(c, BackendCall::BufferData { target: BufferTarget::ElementArray, .. })
            })
            .count();
        assert_eq!(index_uploads, 1);
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_leaves_grid_untouched() {
        let mut view = ready(5);
        view.render();
        let before = (view.grid_size(), view.last_transform(), buffer_snapshot(&view));

        view.resize(1920, 1080);
        view.resize(1, 1);
        view.render();

        assert_eq!((view.grid_size(), view.last_transform(), buffer_snapshot(&view)), before);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn teardown_releases_everything_once() {
        let mut view = ready(2);
        view.render();
        view.teardown();

        assert_eq!(view.backend().live_objects(), 0);
        assert!(view.backend().violations().is_empty());

        let calls = view.backend().calls().len();
        view.teardown();
        view.render();
        assert_eq!(view.backend().calls().len(), calls);
    }

    #[test]
    fn teardown_of_degraded_loop_is_clean() {
        let mut view = RenderLoop::new(
            RecordingBackend::new(),
            GridConfig::default(),
            ShaderSources::new("", ""),
        );
        view.initialize();
        view.teardown();

        assert_eq!(view.backend().live_objects(), 0);
        assert!(view.backend().violations().is_empty());
    }

    // ── colors ────────────────────────────────────────────────────────────

    fn colors_of(view: &RenderLoop<RecordingBackend>) -> Vec<f32> {
        buffer_snapshot(view)[1]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn point_colors_reach_the_color_buffer() {
        let size = GridSize::new(2).unwrap();
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        let config = GridConfig::default()
            .with_grid_size(size)
            .with_point_colors(vec![PointColor { x: 1, y: 2, color: red }]);
        let mut view = RenderLoop::new(RecordingBackend::new(), config, ShaderSources::new(VS, FS));
        view.initialize();

        let colors = colors_of(&view);
        assert_eq!(colors[point_to_color_offset(size, 1, 2, ColorChannel::Green)], 0.0);
        assert_eq!(colors[point_to_color_offset(size, 1, 2, ColorChannel::Alpha)], 1.0);
        assert_eq!(colors[point_to_color_offset(size, 0, 0, ColorChannel::Green)], 1.0);
    }

    #[test]
    fn out_of_range_point_colors_fall_back_to_white() {
        let config = GridConfig::default()
            .with_point_colors(vec![PointColor { x: 3, y: 0, color: Color::BLACK }]);
        let mut view = RenderLoop::new(RecordingBackend::new(), config, ShaderSources::new(VS, FS));
        view.initialize();

        assert!(colors_of(&view).iter().all(|c| *c == 1.0));
    }

    #[test]
    fn non_finite_point_colors_fall_back_to_white() {
        let nan = Color::new(f32::NAN, 0.0, 0.0, 1.0);
        let config = GridConfig::default()
            .with_point_colors(vec![PointColor { x: 0, y: 0, color: nan }]);
        let mut view = RenderLoop::new(RecordingBackend::new(), config, ShaderSources::new(VS, FS));
        view.initialize();

        assert!(colors_of(&view).iter().all(|c| *c == 1.0));
    }
}
