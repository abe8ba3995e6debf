use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::{Acquire, Gpu, GpuFrame};
use crate::paint::Color;

use super::types::{
    BufferId, BufferTarget, BufferUsage, DrawParams, FrameStatus, IndexType, PrimitiveMode,
    ProgramId, ShaderId, ShaderStage, UniformLocation, VertexArrayId, VertexAttribute,
};
use super::GraphicsBackend;

/// Size of a `mat4x4<f32>` uniform in bytes.
const MAT4_SIZE: u64 = 64;

/// [`GraphicsBackend`] on top of wgpu, rendering to a window surface.
///
/// The bind-then-draw model is emulated:
/// - "compile" parses and validates WGSL with naga; the diagnostic is the log
/// - "link" checks the stage interface, reflects uniforms and creates the
///   bind group; render pipelines are built lazily per vertex layout
/// - vertex arrays are CPU-side binding records
/// - draws are queued and encoded into a single render pass at `end_frame`
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    next_id: u32,

    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayObject>,
    buffers: HashMap<BufferId, BufferObject>,

    current_program: ProgramId,
    bound_vao: VertexArrayId,
    bound_array_buffer: BufferId,

    frame: Option<PendingFrame>,
    surface_lost: bool,
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    module: Option<naga::Module>,
    log: String,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
    log: String,
}

struct LinkedProgram {
    vertex: StageModule,
    fragment: StageModule,
    vertex_inputs: Vec<u32>,
    uniforms: Vec<UniformSlot>,
    bind_group: wgpu::BindGroup,
    layout: wgpu::PipelineLayout,
    /// `None` marks a layout wgpu rejected; its draws are skipped.
    pipelines: HashMap<Vec<VertexAttribute>, Option<wgpu::RenderPipeline>>,
}

struct StageModule {
    module: wgpu::ShaderModule,
    entry_point: String,
}

/// One `@location` of a stage interface.
struct StageIo {
    location: u32,
    inner: naga::TypeInner,
    interpolation: Option<naga::Interpolation>,
    sampling: Option<naga::Sampling>,
}

struct UniformDecl {
    name: String,
    binding: u32,
    size: u64,
    visibility: wgpu::ShaderStages,
}

struct UniformSlot {
    name: String,
    size: u64,
    buffer: wgpu::Buffer,
}

#[derive(Default)]
struct VertexArrayObject {
    attributes: BTreeMap<u32, AttributeBinding>,
    element_buffer: BufferId,
}

#[derive(Debug, Copy, Clone)]
struct AttributeBinding {
    buffer: BufferId,
    layout: VertexAttribute,
    enabled: bool,
}

#[derive(Default)]
struct BufferObject {
    buffer: Option<wgpu::Buffer>,
    len: u64,
}

struct PendingFrame {
    frame: GpuFrame,
    clear: Option<Color>,
    draws: Vec<QueuedDraw>,
}

struct QueuedDraw {
    program: ProgramId,
    layout: Vec<VertexAttribute>,
    vertex_buffers: Vec<BufferId>,
    index_buffer: BufferId,
    params: DrawParams,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let info = gpu.adapter_info();
        let size = gpu.size();
        log::debug!(
            "wgpu backend on {} ({:?}), surface {}x{} {:?}",
            info.name,
            info.backend,
            size.width,
            size.height,
            gpu.surface_format()
        );
        Self {
            gpu,
            next_id: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            current_program: ProgramId::NULL,
            bound_vao: VertexArrayId::NULL,
            bound_array_buffer: BufferId::NULL,
            frame: None,
            surface_lost: false,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the swapchain. Grid state is unaffected.
    pub fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// True once the surface reported an unrecoverable error.
    pub fn surface_lost(&self) -> bool {
        self.surface_lost
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn gpu_buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id).and_then(|b| b.buffer.as_ref())
    }

    /// Resolves the vertex and fragment shader attached to a program.
    fn stage_object(
        &self,
        attached: &[ShaderId],
        stage: ShaderStage,
    ) -> Result<(&ShaderObject, &naga::Module), String> {
        let mut found = None;
        for id in attached {
            let Some(obj) = self.shaders.get(id) else {
                return Err(format!("error: shader {id:?} no longer exists"));
            };
            if obj.stage != stage {
                continue;
            }
            if found.is_some() {
                return Err(format!("error: more than one {stage} shader attached"));
            }
            let Some(module) = obj.module.as_ref() else {
                return Err(format!("error: {stage} shader {id:?} is not compiled"));
            };
            found = Some((obj, module));
        }
        found.ok_or_else(|| format!("error: no {stage} shader attached"))
    }

    fn link(&self, attached: &[ShaderId]) -> Result<LinkedProgram, String> {
        let (vs_obj, vs_module) = self.stage_object(attached, ShaderStage::Vertex)?;
        let (fs_obj, fs_module) = self.stage_object(attached, ShaderStage::Fragment)?;

        let vs_entry = entry_point(vs_module, ShaderStage::Vertex)?;
        let fs_entry = entry_point(fs_module, ShaderStage::Fragment)?;

        let vertex_inputs = check_interface(vs_module, vs_entry, fs_module, fs_entry)?;

        let uniforms = collect_uniforms(&[
            (vs_module, wgpu::ShaderStages::VERTEX),
            (fs_module, wgpu::ShaderStages::FRAGMENT),
        ])?;

        let device = self.gpu.device();
        let (vertex, fragment) = validated(device, |device| {
            (
                StageModule::create(
                    device,
                    "gridview vertex shader",
                    &vs_obj.source,
                    &vs_entry.name,
                ),
                StageModule::create(
                    device,
                    "gridview fragment shader",
                    &fs_obj.source,
                    &fs_entry.name,
                ),
            )
        })?;

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
            .iter()
            .map(|u| wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: u.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(u.size),
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gridview program bgl"),
            entries: &layout_entries,
        });

        let slots: Vec<(u32, UniformSlot)> = uniforms
            .into_iter()
            .map(|u| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("gridview uniform buffer"),
                    size: align_to(u.size.max(16), 16),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (
                    u.binding,
                    UniformSlot {
                        name: u.name,
                        size: u.size,
                        buffer,
                    },
                )
            })
            .collect();

        let group_entries: Vec<wgpu::BindGroupEntry> = slots
            .iter()
            .map(|(binding, slot)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: slot.buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gridview program bind group"),
            layout: &bind_group_layout,
            entries: &group_entries,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gridview pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        Ok(LinkedProgram {
            vertex,
            fragment,
            vertex_inputs,
            uniforms: slots.into_iter().map(|(_, slot)| slot).collect(),
            bind_group,
            layout,
            pipelines: HashMap::new(),
        })
    }

    fn encode_draw(&self, rpass: &mut wgpu::RenderPass<'_>, draw: &QueuedDraw) {
        let Some(linked) = self.programs.get(&draw.program).and_then(|p| p.linked.as_ref()) else {
            return;
        };
        let Some(pipeline) = linked.pipelines.get(&draw.layout).and_then(Option::as_ref) else {
            return;
        };
        let Some(index_buffer) = self.gpu_buffer(draw.index_buffer) else { return };

        let mut vertex_buffers = Vec::with_capacity(draw.vertex_buffers.len());
        for id in &draw.vertex_buffers {
            let Some(buffer) = self.gpu_buffer(*id) else {
                log::debug!("vertex buffer {id:?} released before submit; draw dropped");
                return;
            };
            vertex_buffers.push(buffer);
        }

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &linked.bind_group, &[]);
        for (slot, (attr, buffer)) in draw.layout.iter().zip(vertex_buffers).enumerate() {
            rpass.set_vertex_buffer(slot as u32, buffer.slice(attr.offset..));
        }
        rpass.set_index_buffer(index_buffer.slice(..), index_format(draw.params.index_type));

        let first = draw.params.first_index();
        rpass.draw_indexed(first..first + draw.params.count, 0, 0..1);
    }
}

impl GraphicsBackend for WgpuBackend<'_> {
    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let id = ShaderId(self.next());
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                module: None,
                log: String::new(),
            },
        );
        id
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        match self.shaders.get_mut(&shader) {
            Some(obj) => obj.source = source.to_owned(),
            None => log::warn!("shader_source: unknown shader {shader:?}"),
        }
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        let Some(obj) = self.shaders.get_mut(&shader) else {
            log::warn!("compile_shader: unknown shader {shader:?}");
            return;
        };
        match parse_and_validate(obj.stage, &obj.source) {
            Ok(module) => {
                obj.module = Some(module);
                obj.log.clear();
            }
            Err(log) => {
                obj.module = None;
                obj.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.module.is_some())
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next());
        self.programs.insert(id, ProgramObject::default());
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        match self.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => log::warn!("attach_shader: unknown program {program:?}"),
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        let Some(attached) = self.programs.get(&program).map(|p| p.attached.clone()) else {
            log::warn!("link_program: unknown program {program:?}");
            return;
        };
        let result = self.link(&attached);
        if let Some(p) = self.programs.get_mut(&program) {
            match result {
                Ok(linked) => {
                    p.linked = Some(linked);
                    p.log.clear();
                }
                Err(log) => {
                    p.linked = None;
                    p.log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == program {
            self.current_program = ProgramId::NULL;
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let linked = self.programs.get(&program)?.linked.as_ref()?;
        let index = linked.uniforms.iter().position(|u| u.name == name)? as u32;
        Some(UniformLocation { program, index })
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, matrix: &[f32; 16]) {
        let slot = self
            .programs
            .get(&location.program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.uniforms.get(location.index as usize));
        let Some(slot) = slot else {
            log::trace!("uniform_matrix4: stale location {location:?}");
            return;
        };
        if slot.size < MAT4_SIZE {
            log::warn!("uniform `{}` is {} bytes, too small for a mat4", slot.name, slot.size);
            return;
        }
        self.gpu
            .queue()
            .write_buffer(&slot.buffer, 0, bytemuck::cast_slice(matrix));
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, VertexArrayObject::default());
        id
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        self.bound_vao = vao;
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        self.vertex_arrays.remove(&vao);
        if self.bound_vao == vao {
            self.bound_vao = VertexArrayId::NULL;
        }
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next());
        self.buffers.insert(id, BufferObject::default());
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        match target {
            BufferTarget::Array => self.bound_array_buffer = buffer,
            BufferTarget::ElementArray => match self.vertex_arrays.get_mut(&self.bound_vao) {
                Some(vao) => vao.element_buffer = buffer,
                None => log::warn!("element buffer {buffer:?} bound with no vertex array"),
            },
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let id = match target {
            BufferTarget::Array => self.bound_array_buffer,
            BufferTarget::ElementArray => self
                .vertex_arrays
                .get(&self.bound_vao)
                .map(|v| v.element_buffer)
                .unwrap_or_default(),
        };
        let Some(obj) = self.buffers.get_mut(&id) else {
            log::warn!("buffer_data: nothing bound to {target:?}");
            return;
        };

        let len = data.len() as u64;
        if len == 0 {
            obj.buffer = None;
            obj.len = 0;
            return;
        }
        if let Err(reason) = check_buffer_size(len, self.gpu.device().limits().max_buffer_size) {
            // Draws reading this buffer fail the index range check and are skipped.
            log::error!("buffer {id:?} upload refused: {reason}");
            obj.buffer = None;
            obj.len = 0;
            return;
        }

        // Dynamic buffers are rewritten in place while the data still fits.
        let reuse = usage == BufferUsage::Dynamic
            && len % wgpu::COPY_BUFFER_ALIGNMENT == 0
            && obj.buffer.as_ref().is_some_and(|b| b.size() >= len);

        match obj.buffer.as_ref() {
            Some(buffer) if reuse => self.gpu.queue().write_buffer(buffer, 0, data),
            _ => {
                let label = match usage {
                    BufferUsage::Static => "gridview static buffer",
                    BufferUsage::Dynamic => "gridview dynamic buffer",
                };
                obj.buffer = Some(self.gpu.device().create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: data,
                        usage: wgpu::BufferUsages::VERTEX
                            | wgpu::BufferUsages::INDEX
                            | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
        obj.len = len;
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(obj) = self.buffers.remove(&buffer) {
            if let Some(b) = obj.buffer {
                b.destroy();
            }
        }
        if self.bound_array_buffer == buffer {
            self.bound_array_buffer = BufferId::NULL;
        }
    }

    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute) {
        if !(1..=4).contains(&attribute.components) {
            log::warn!(
                "attribute {}: {} components unsupported",
                attribute.slot,
                attribute.components
            );
            return;
        }
        let buffer = self.bound_array_buffer;
        let Some(vao) = self.vertex_arrays.get_mut(&self.bound_vao) else {
            log::warn!("attribute {} set with no vertex array bound", attribute.slot);
            return;
        };
        let enabled = vao
            .attributes
            .get(&attribute.slot)
            .is_some_and(|a| a.enabled);
        vao.attributes.insert(
            attribute.slot,
            AttributeBinding {
                buffer,
                layout: attribute,
                enabled,
            },
        );
    }

    fn enable_vertex_attrib_array(&mut self, slot: u32) {
        let attr = self
            .vertex_arrays
            .get_mut(&self.bound_vao)
            .and_then(|vao| vao.attributes.get_mut(&slot));
        match attr {
            Some(a) => a.enabled = true,
            None => log::warn!("enable of unset attribute {slot}"),
        }
    }

    fn begin_frame(&mut self) -> FrameStatus {
        if self.surface_lost {
            return FrameStatus::Lost;
        }
        if self.frame.take().is_some() {
            log::warn!("begin_frame: previous frame was never ended; discarded");
        }

        match self.gpu.acquire() {
            Acquire::Frame(frame) => {
                self.frame = Some(PendingFrame {
                    frame,
                    clear: None,
                    draws: Vec::new(),
                });
                FrameStatus::Ready
            }
            Acquire::Skip(reason) => {
                log::debug!("frame skipped: {reason}");
                FrameStatus::Skipped
            }
            Acquire::Lost(reason) => {
                log::error!("surface lost: {reason}");
                self.surface_lost = true;
                FrameStatus::Lost
            }
        }
    }

    fn clear(&mut self, color: Color) {
        match self.frame.as_mut() {
            Some(frame) => {
                // A clear discards everything queued before it.
                frame.clear = Some(color);
                frame.draws.clear();
            }
            None => log::trace!("clear outside a frame ignored"),
        }
    }

    fn draw_elements(&mut self, params: DrawParams) {
        let Some(frame) = self.frame.as_mut() else {
            log::trace!("draw outside a frame ignored");
            return;
        };
        let PrimitiveMode::Triangles = params.mode;

        let program = self.current_program;
        let Some(linked) = self.programs.get_mut(&program).and_then(|p| p.linked.as_mut()) else {
            log::trace!("draw with unlinked program {program:?}: nothing drawn");
            return;
        };
        let Some(vao) = self.vertex_arrays.get(&self.bound_vao) else {
            log::warn!("draw with no vertex array bound; skipped");
            return;
        };
        if vao.element_buffer.is_null() {
            log::warn!("draw with no element buffer; skipped");
            return;
        }
        let index_bytes = self.buffers.get(&vao.element_buffer).map_or(0, |b| b.len);
        let needed = params.offset + u64::from(params.count) * params.index_type.size_bytes();
        if needed > index_bytes {
            log::warn!("draw reads {needed} index bytes, buffer holds {index_bytes}; skipped");
            return;
        }

        let bound: Vec<AttributeBinding> =
            vao.attributes.values().filter(|a| a.enabled).copied().collect();
        if let Some(loc) = linked
            .vertex_inputs
            .iter()
            .find(|loc| !bound.iter().any(|a| a.layout.slot == **loc))
        {
            log::warn!("vertex input @location({loc}) has no enabled attribute; draw skipped");
            return;
        }

        let layout: Vec<VertexAttribute> = bound.iter().map(|a| a.layout).collect();
        if !linked.pipelines.contains_key(&layout) {
            let format = self.gpu.surface_format();
            let built = validated(self.gpu.device(), |device| {
                create_pipeline(device, format, &*linked, &layout)
            });
            let pipeline = match built {
                Ok(pipeline) => {
                    log::debug!(
                        "created render pipeline for {program:?} with {} attributes",
                        layout.len()
                    );
                    Some(pipeline)
                }
                Err(log) => {
                    log::error!(
                        "render pipeline for {program:?} rejected; its draws are skipped\n{log}"
                    );
                    None
                }
            };
            linked.pipelines.insert(layout.clone(), pipeline);
        }
        if linked.pipelines.get(&layout).is_none_or(Option::is_none) {
            log::trace!("draw with rejected pipeline skipped");
            return;
        }

        frame.draws.push(QueuedDraw {
            program,
            layout,
            vertex_buffers: bound.iter().map(|a| a.buffer).collect(),
            index_buffer: vao.element_buffer,
            params,
        });
    }

    fn end_frame(&mut self) {
        let Some(PendingFrame { mut frame, clear, draws }) = self.frame.take() else {
            log::trace!("end_frame without an open frame");
            return;
        };

        {
            let load = match clear {
                Some(c) => wgpu::LoadOp::Clear(c.into()),
                None => wgpu::LoadOp::Load,
            };
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gridview pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &draws {
                self.encode_draw(&mut rpass, draw);
            }
        }

        self.gpu.present(frame);
    }
}

impl StageModule {
    fn create(device: &wgpu::Device, label: &str, source: &str, entry_point: &str) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_owned())),
        });
        Self {
            module,
            entry_point: entry_point.to_owned(),
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    linked: &LinkedProgram,
    layout: &[VertexAttribute],
) -> wgpu::RenderPipeline {
    // One vertex buffer per attribute; the byte offset is applied to the
    // buffer slice at draw time.
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = layout
        .iter()
        .map(|a| {
            [wgpu::VertexAttribute {
                format: vertex_format(a.components),
                offset: 0,
                shader_location: a.slot,
            }]
        })
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = layout
        .iter()
        .zip(&attributes)
        .map(|(a, attrs)| wgpu::VertexBufferLayout {
            array_stride: a.effective_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("gridview pipeline"),
        layout: Some(&linked.layout),

        vertex: wgpu::VertexState {
            module: &linked.vertex.module,
            entry_point: Some(linked.vertex.entry_point.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &linked.fragment.module,
            entry_point: Some(linked.fragment.entry_point.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

// ── naga helpers ──────────────────────────────────────────────────────────

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn parse_and_validate(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    if let Err(err) = validator.validate(&module) {
        let mut log = format!("error: {}", err.as_inner());
        let mut cause = std::error::Error::source(err.as_inner());
        while let Some(c) = cause {
            log.push_str(&format!("\n  caused by: {c}"));
            cause = c.source();
        }
        return Err(log);
    }

    entry_point(&module, stage)?;
    Ok(module)
}

fn entry_point(module: &naga::Module, stage: ShaderStage) -> Result<&naga::EntryPoint, String> {
    let wanted = naga_stage(stage);
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| format!("error: no @{stage} entry point"))
}

/// Collects the `@location` bindings of an argument or result, descending
/// into structs.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<StageIo>,
) {
    match binding {
        Some(naga::Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => out.push(StageIo {
            location: *location,
            inner: module.types[ty].inner.clone(),
            interpolation: *interpolation,
            sampling: *sampling,
        }),
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_locations(module, m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn entry_inputs(module: &naga::Module, entry: &naga::EntryPoint) -> Vec<StageIo> {
    let mut out = Vec::new();
    for arg in &entry.function.arguments {
        collect_locations(module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn entry_outputs(module: &naga::Module, entry: &naga::EntryPoint) -> Vec<StageIo> {
    let mut out = Vec::new();
    if let Some(result) = entry.function.result.as_ref() {
        collect_locations(module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

/// Scalar type and component count of a scalar or vector.
fn numeric(inner: &naga::TypeInner) -> Option<(naga::Scalar, u32)> {
    match *inner {
        naga::TypeInner::Scalar(scalar) => Some((scalar, 1)),
        naga::TypeInner::Vector { size, scalar } => Some((scalar, size as u32)),
        _ => None,
    }
}

fn type_name(inner: &naga::TypeInner) -> String {
    let scalar_name = |s: naga::Scalar| {
        let prefix = match s.kind {
            naga::ScalarKind::Float => "f",
            naga::ScalarKind::Sint => "i",
            naga::ScalarKind::Uint => "u",
            naga::ScalarKind::Bool => return "bool".to_owned(),
            kind => return format!("{kind:?}"),
        };
        format!("{prefix}{}", u32::from(s.width) * 8)
    };
    match numeric(inner) {
        Some((scalar, 1)) => scalar_name(scalar),
        Some((scalar, n)) => format!("vec{n}<{}>", scalar_name(scalar)),
        None => "a non-numeric type".to_owned(),
    }
}

/// Checks the vertex buffer → vertex stage → fragment stage → color target
/// chain with the rules wgpu applies at pipeline creation:
/// - vertex inputs are fed from `Float32xN` buffers, so they must be `f32`
/// - a fragment input must be written by the vertex stage with the same
///   scalar type, at least as many components and the same interpolation
/// - output 0 must be `vec4<f32>` to cover the float color target
///
/// Returns the vertex input locations.
fn check_interface(
    vs_module: &naga::Module,
    vs_entry: &naga::EntryPoint,
    fs_module: &naga::Module,
    fs_entry: &naga::EntryPoint,
) -> Result<Vec<u32>, String> {
    let vertex_inputs = entry_inputs(vs_module, vs_entry);
    for io in &vertex_inputs {
        if !numeric(&io.inner).is_some_and(|(scalar, _)| scalar == naga::Scalar::F32) {
            return Err(format!(
                "error: vertex input @location({}) is {}; vertex buffers hold f32 data",
                io.location,
                type_name(&io.inner)
            ));
        }
    }

    let vertex_outputs = entry_outputs(vs_module, vs_entry);
    for input in entry_inputs(fs_module, fs_entry) {
        let Some(output) = vertex_outputs.iter().find(|o| o.location == input.location) else {
            return Err(format!(
                "error: fragment input @location({}) is not written by the vertex stage",
                input.location
            ));
        };
        let compatible = match (numeric(&input.inner), numeric(&output.inner)) {
            (Some((want, want_n)), Some((have, have_n))) => {
                want.kind == have.kind && want.width <= have.width && want_n <= have_n
            }
            _ => false,
        };
        if !compatible {
            return Err(format!(
                "error: fragment input @location({}) is {}, the vertex stage writes {}",
                input.location,
                type_name(&input.inner),
                type_name(&output.inner)
            ));
        }
        if input.interpolation != output.interpolation || input.sampling != output.sampling {
            return Err(format!(
                "error: interpolation of @location({}) differs between stages",
                input.location
            ));
        }
    }

    let color = entry_outputs(fs_module, fs_entry).into_iter().find(|o| o.location == 0);
    if let Some(color) = color {
        if numeric(&color.inner) != Some((naga::Scalar::F32, 4)) {
            return Err(format!(
                "error: fragment output @location(0) is {}; the color target needs vec4<f32>",
                type_name(&color.inner)
            ));
        }
    }

    Ok(vertex_inputs.into_iter().map(|io| io.location).collect())
}

/// Reflects uniform buffers of both stages into one bind group 0 layout.
fn collect_uniforms(
    stages: &[(&naga::Module, wgpu::ShaderStages)],
) -> Result<Vec<UniformDecl>, String> {
    let mut out: Vec<UniformDecl> = Vec::new();
    for (module, visibility) in stages {
        for (_, var) in module.global_variables.iter() {
            let Some(rb) = var.binding.as_ref() else { continue };
            if var.space != naga::AddressSpace::Uniform {
                return Err(format!(
                    "error: @group({}) @binding({}) is not a uniform buffer; \
                     only uniform buffers are supported",
                    rb.group, rb.binding
                ));
            }
            if rb.group != 0 {
                return Err(format!(
                    "error: uniform in @group({}); only group 0 is supported",
                    rb.group
                ));
            }

            let name = var.name.clone().unwrap_or_default();
            let size = u64::from(module.types[var.ty].inner.size(module.to_ctx()));

            match out.iter_mut().find(|u| u.binding == rb.binding) {
                Some(u) if u.name == name && u.size == size => u.visibility |= *visibility,
                Some(u) => {
                    return Err(format!(
                        "error: stages disagree on @binding({}): `{}` vs `{}`",
                        rb.binding, u.name, name
                    ));
                }
                None => out.push(UniformDecl {
                    name,
                    binding: rb.binding,
                    size,
                    visibility: *visibility,
                }),
            }
        }
    }
    Ok(out)
}

// ── wgpu validation ───────────────────────────────────────────────────────

/// Runs `f` inside a validation error scope. A captured error becomes the
/// `Err` log instead of reaching the device's uncaptured-error handler.
fn validated<T>(device: &wgpu::Device, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f(device);
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(format!("error: {err}")),
        None => Ok(value),
    }
}

/// Refuses uploads the device cannot hold in a single buffer.
fn check_buffer_size(len: u64, max_buffer_size: u64) -> Result<(), String> {
    if len > max_buffer_size {
        return Err(format!(
            "{len} bytes exceed the device buffer limit of {max_buffer_size} bytes"
        ));
    }
    Ok(())
}

// ── format helpers ────────────────────────────────────────────────────────

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn index_format(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::U32 => wgpu::IndexFormat::Uint32,
    }
}

#[inline]
fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = transform * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    fn stages(vs: &str, fs: &str) -> (naga::Module, naga::Module) {
        (
            parse_and_validate(ShaderStage::Vertex, vs).unwrap(),
            parse_and_validate(ShaderStage::Fragment, fs).unwrap(),
        )
    }

    fn interface(vs: &str, fs: &str) -> Result<Vec<u32>, String> {
        let (vs_module, fs_module) = stages(vs, fs);
        check_interface(
            &vs_module,
            entry_point(&vs_module, ShaderStage::Vertex).unwrap(),
            &fs_module,
            entry_point(&fs_module, ShaderStage::Fragment).unwrap(),
        )
    }

    /// Headless device, or `None` on machines without an adapter.
    fn headless_device() -> Option<wgpu::Device> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, _queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some(device)
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn valid_vertex_shader_compiles() {
        let module = parse_and_validate(ShaderStage::Vertex, VS).unwrap();
        let ep = entry_point(&module, ShaderStage::Vertex).unwrap();

        let inputs: Vec<u32> = entry_inputs(&module, ep).iter().map(|io| io.location).collect();
        assert_eq!(inputs, vec![0, 1]);

        let outputs: Vec<u32> = entry_outputs(&module, ep).iter().map(|io| io.location).collect();
        assert_eq!(outputs, vec![0]);
    }

    #[test]
    fn syntax_error_produces_log() {
        let log = parse_and_validate(ShaderStage::Vertex, "@vertex fn vs_main( {").unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn wrong_stage_is_rejected() {
        let log = parse_and_validate(ShaderStage::Fragment, VS).unwrap_err();
        assert_eq!(log, "error: no @fragment entry point");
    }

    #[test]
    fn transform_uniform_is_reflected() {
        let module = parse_and_validate(ShaderStage::Vertex, VS).unwrap();
        let uniforms = collect_uniforms(&[(&module, wgpu::ShaderStages::VERTEX)]).unwrap();
        assert_eq!(uniforms.len(), 1);
        assert_eq!(uniforms[0].name, "transform");
        assert_eq!(uniforms[0].binding, 0);
        assert_eq!(uniforms[0].size, MAT4_SIZE);
    }

    // ── link interface ────────────────────────────────────────────────────

    #[test]
    fn matching_stages_link() {
        assert_eq!(interface(VS, FS), Ok(vec![0, 1]));
    }

    #[test]
    fn integer_vertex_input_is_rejected() {
        let vs = r#"
@vertex
fn vs_main(@location(0) position: vec3<u32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(vec3<f32>(position), 1.0);
}
"#;
        let fs = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let log = interface(vs, fs).unwrap_err();
        assert!(log.contains("@location(0) is vec3<u32>"), "{log}");
    }

    #[test]
    fn integer_color_output_is_rejected() {
        let fs = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<u32> {
    return vec4<u32>(color * 255.0);
}
"#;
        let log = interface(VS, fs).unwrap_err();
        assert!(log.contains("output @location(0) is vec4<u32>"), "{log}");
    }

    #[test]
    fn narrow_color_output_is_rejected() {
        let fs = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec3<f32> {
    return color.rgb;
}
"#;
        assert!(interface(VS, fs).unwrap_err().contains("vec3<f32>"));
    }

    #[test]
    fn fragment_input_must_be_written() {
        let fs = r#"
@fragment
fn fs_main(@location(3) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
        let log = interface(VS, fs).unwrap_err();
        assert!(log.contains("@location(3) is not written"), "{log}");
    }

    #[test]
    fn fragment_input_type_must_match() {
        let fs = r#"
@fragment
fn fs_main(@location(0) @interpolate(flat) color: vec4<i32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color);
}
"#;
        let log = interface(VS, fs).unwrap_err();
        assert!(log.contains("is vec4<i32>, the vertex stage writes vec4<f32>"), "{log}");
    }

    #[test]
    fn fragment_may_read_fewer_components() {
        let fs = r#"
@fragment
fn fs_main(@location(0) color: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 0.0, 1.0);
}
"#;
        assert!(interface(VS, fs).is_ok());
    }

    // ── wgpu validation ───────────────────────────────────────────────────

    #[test]
    fn oversized_buffer_is_refused() {
        let max = 256 << 20;
        let size = crate::mesh::GridSize::new(5000).unwrap();
        let index_bytes = size.triangle_corner_count() as u64 * 4;

        assert!(check_buffer_size(index_bytes, max).unwrap_err().contains("600000000 bytes"));
        assert!(check_buffer_size(max, max).is_ok());
    }

    #[test]
    fn validation_errors_are_captured() {
        let Some(device) = headless_device() else {
            return;
        };

        let rejected = validated(&device, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: None,
                source: wgpu::ShaderSource::Wgsl("@vertex fn broken( {".into()),
            })
        });
        assert!(rejected.is_err());

        let accepted = validated(&device, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: None,
                source: wgpu::ShaderSource::Wgsl(VS.into()),
            })
        });
        assert!(accepted.is_ok());
    }

    #[test]
    fn alignment() {
        assert_eq!(align_to(64, 16), 64);
        assert_eq!(align_to(65, 16), 80);
    }
}
