use std::collections::{BTreeMap, HashMap};

use crate::paint::Color;

use super::types::{
    BufferId, BufferTarget, BufferUsage, DrawParams, FrameStatus, ProgramId, ShaderId,
    ShaderStage, UniformLocation, VertexArrayId, VertexAttribute,
};
use super::GraphicsBackend;

/// One call made against a [`RecordingBackend`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateShader(ShaderId, ShaderStage),
    ShaderSource(ShaderId),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    UniformMatrix4(UniformLocation, [f32; 16]),
    CreateVertexArray(VertexArrayId),
    BindVertexArray(VertexArrayId),
    DeleteVertexArray(VertexArrayId),
    CreateBuffer(BufferId),
    BindBuffer(BufferTarget, BufferId),
    BufferData {
        target: BufferTarget,
        buffer: BufferId,
        len: usize,
        usage: BufferUsage,
    },
    DeleteBuffer(BufferId),
    VertexAttribPointer(VertexAttribute),
    EnableVertexAttribArray(u32),
    BeginFrame,
    Clear(Color),
    DrawElements {
        program: ProgramId,
        vao: VertexArrayId,
        params: DrawParams,
    },
    EndFrame,
}

/// In-memory backend that records every call and simulates object state.
///
/// Compilation is simulated with two checks: delimiters `()`, `{}`, `[]`
/// must balance (line comments are ignored), and the source must carry the
/// stage's `@vertex` / `@fragment` entry attribute. Linking requires exactly
/// one successfully compiled shader per stage. Uniforms are discovered from
/// `var<uniform> name` declarations.
///
/// Misuse (unknown or deleted ids, draws outside a frame, ...) does not
/// panic; it is collected in [`violations`](Self::violations) so tests can
/// assert the caller's ordering contract.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,

    shaders: HashMap<ShaderId, RecShader>,
    programs: HashMap<ProgramId, RecProgram>,
    vertex_arrays: HashMap<VertexArrayId, RecVertexArray>,
    buffers: HashMap<BufferId, RecBuffer>,

    current_program: ProgramId,
    bound_vao: VertexArrayId,
    bound_array_buffer: BufferId,

    frame_open: bool,
    frames_presented: u64,
    violations: Vec<String>,
}

#[derive(Debug)]
struct RecShader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct RecProgram {
    attached: Vec<ShaderId>,
    linked: bool,
    log: String,
    uniforms: Vec<String>,
    uniform_values: HashMap<u32, [f32; 16]>,
}

#[derive(Debug, Default)]
struct RecVertexArray {
    attributes: BTreeMap<u32, RecAttribute>,
    element_buffer: BufferId,
}

#[derive(Debug, Copy, Clone)]
struct RecAttribute {
    buffer: BufferId,
    layout: VertexAttribute,
    enabled: bool,
}

#[derive(Debug, Default)]
struct RecBuffer {
    data: Vec<u8>,
    usage: Option<BufferUsage>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls in issue order.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forgets recorded calls; object state is kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Contract violations observed so far.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Number of objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.vertex_arrays.len() + self.buffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Current contents of `buffer`, if it exists.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// Usage hint given with the last upload to `buffer`.
    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&buffer).and_then(|b| b.usage)
    }

    /// Last matrix uploaded to uniform `name` of `program`.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<[f32; 16]> {
        let p = self.programs.get(&program)?;
        let index = p.uniforms.iter().position(|u| u == name)? as u32;
        p.uniform_values.get(&index).copied()
    }

    /// Attribute layout recorded for `slot` of `vao`, with its source buffer.
    pub fn attribute(
        &self,
        vao: VertexArrayId,
        slot: u32,
    ) -> Option<(BufferId, VertexAttribute, bool)> {
        let a = self.vertex_arrays.get(&vao)?.attributes.get(&slot)?;
        Some((a.buffer, a.layout, a.enabled))
    }

    /// Element buffer recorded in `vao`.
    pub fn element_buffer(&self, vao: VertexArrayId) -> Option<BufferId> {
        self.vertex_arrays
            .get(&vao)
            .map(|v| v.element_buffer)
            .filter(|b| !b.is_null())
    }

    /// Parameters of every recorded draw call, in order.
    pub fn draws(&self) -> Vec<(ProgramId, VertexArrayId, DrawParams)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::DrawElements { program, vao, params } => {
                    Some((*program, *vao, *params))
                }
                _ => None,
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn violation(&mut self, msg: String) {
        log::debug!("recording backend: {msg}");
        self.violations.push(msg);
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let id = ShaderId(self.next());
        self.shaders.insert(
            id,
            RecShader {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        self.calls.push(BackendCall::CreateShader(id, stage));
        id
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.calls.push(BackendCall::ShaderSource(shader));
        match self.shaders.get_mut(&shader) {
            Some(s) => s.source = source.to_owned(),
            None => self.violation(format!("shader_source on unknown shader {shader:?}")),
        }
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.calls.push(BackendCall::CompileShader(shader));
        let Some(s) = self.shaders.get_mut(&shader) else {
            self.violation(format!("compile_shader on unknown shader {shader:?}"));
            return;
        };
        match check_source(s.stage, &s.source) {
            Ok(()) => {
                s.compiled = true;
                s.log.clear();
            }
            Err(log) => {
                s.compiled = false;
                s.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.calls.push(BackendCall::DeleteShader(shader));
        if shader.is_null() {
            return;
        }
        if self.shaders.remove(&shader).is_none() {
            self.violation(format!("delete of unknown shader {shader:?}"));
        }
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next());
        self.programs.insert(id, RecProgram::default());
        self.calls.push(BackendCall::CreateProgram(id));
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.calls.push(BackendCall::AttachShader(program, shader));
        if !self.shaders.contains_key(&shader) {
            self.violation(format!("attach of unknown shader {shader:?}"));
            return;
        }
        match self.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => self.violation(format!("attach to unknown program {program:?}")),
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::LinkProgram(program));
        let Some(p) = self.programs.get(&program) else {
            self.violation(format!("link of unknown program {program:?}"));
            return;
        };

        let mut stages = Vec::new();
        let mut uniforms: Vec<String> = Vec::new();
        let mut log = String::new();
        for id in &p.attached {
            match self.shaders.get(id) {
                Some(s) if s.compiled => {
                    stages.push(s.stage);
                    for name in uniform_names(&s.source) {
                        if !uniforms.contains(&name) {
                            uniforms.push(name);
                        }
                    }
                }
                Some(s) => {
                    log.push_str(&format!("error: {} shader {id:?} is not compiled\n", s.stage));
                }
                None => log.push_str(&format!("error: shader {id:?} no longer exists\n")),
            }
        }
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let count = stages.iter().filter(|s| **s == stage).count();
            if count != 1 {
                log.push_str(&format!("error: expected one {stage} shader, found {count}\n"));
            }
        }

        let linked = log.is_empty();
        if let Some(p) = self.programs.get_mut(&program) {
            p.linked = linked;
            p.log = log;
            p.uniforms = if linked { uniforms } else { Vec::new() };
            p.uniform_values.clear();
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::DeleteProgram(program));
        if program.is_null() {
            return;
        }
        if self.programs.remove(&program).is_none() {
            self.violation(format!("delete of unknown program {program:?}"));
        }
        if self.current_program == program {
            self.current_program = ProgramId::NULL;
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::UseProgram(program));
        if !program.is_null() && !self.programs.contains_key(&program) {
            self.violation(format!("use of unknown program {program:?}"));
        }
        self.current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(&program).filter(|p| p.linked)?;
        let index = p.uniforms.iter().position(|u| u == name)? as u32;
        Some(UniformLocation { program, index })
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, matrix: &[f32; 16]) {
        self.calls.push(BackendCall::UniformMatrix4(location, *matrix));
        if self.current_program != location.program {
            self.violation(format!(
                "uniform upload for {:?} while {:?} is current",
                location.program, self.current_program
            ));
        }
        match self.programs.get_mut(&location.program) {
            Some(p) => {
                p.uniform_values.insert(location.index, *matrix);
            }
            None => self.violation(format!(
                "uniform upload to unknown program {:?}",
                location.program
            )),
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.vertex_arrays.insert(id, RecVertexArray::default());
        self.calls.push(BackendCall::CreateVertexArray(id));
        id
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        self.calls.push(BackendCall::BindVertexArray(vao));
        if !vao.is_null() && !self.vertex_arrays.contains_key(&vao) {
            self.violation(format!("bind of unknown vertex array {vao:?}"));
        }
        self.bound_vao = vao;
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        self.calls.push(BackendCall::DeleteVertexArray(vao));
        if vao.is_null() {
            return;
        }
        if self.vertex_arrays.remove(&vao).is_none() {
            self.violation(format!("delete of unknown vertex array {vao:?}"));
        }
        if self.bound_vao == vao {
            self.bound_vao = VertexArrayId::NULL;
        }
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next());
        self.buffers.insert(id, RecBuffer::default());
        self.calls.push(BackendCall::CreateBuffer(id));
        id
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        self.calls.push(BackendCall::BindBuffer(target, buffer));
        if !buffer.is_null() && !self.buffers.contains_key(&buffer) {
            self.violation(format!("bind of unknown buffer {buffer:?}"));
        }
        match target {
            BufferTarget::Array => self.bound_array_buffer = buffer,
            BufferTarget::ElementArray => match self.vertex_arrays.get_mut(&self.bound_vao) {
                Some(vao) => vao.element_buffer = buffer,
                None => self.violation("element buffer bound without a vertex array".to_owned()),
            },
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let buffer = match target {
            BufferTarget::Array => self.bound_array_buffer,
            BufferTarget::ElementArray => self
                .vertex_arrays
                .get(&self.bound_vao)
                .map(|v| v.element_buffer)
                .unwrap_or_default(),
        };
        self.calls.push(BackendCall::BufferData {
            target,
            buffer,
            len: data.len(),
            usage,
        });
        match self.buffers.get_mut(&buffer) {
            Some(b) => {
                b.data = data.to_vec();
                b.usage = Some(usage);
            }
            None => self.violation(format!("buffer_data with nothing bound to {target:?}")),
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.calls.push(BackendCall::DeleteBuffer(buffer));
        if buffer.is_null() {
            return;
        }
        if self.buffers.remove(&buffer).is_none() {
            self.violation(format!("delete of unknown buffer {buffer:?}"));
        }
        if self.bound_array_buffer == buffer {
            self.bound_array_buffer = BufferId::NULL;
        }
    }

    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute) {
        self.calls.push(BackendCall::VertexAttribPointer(attribute));
        let buffer = self.bound_array_buffer;
        if buffer.is_null() {
            self.violation(format!("attribute {} set with no array buffer bound", attribute.slot));
            return;
        }
        match self.vertex_arrays.get_mut(&self.bound_vao) {
            Some(vao) => {
                let enabled = vao
                    .attributes
                    .get(&attribute.slot)
                    .is_some_and(|a| a.enabled);
                vao.attributes.insert(
                    attribute.slot,
                    RecAttribute {
                        buffer,
                        layout: attribute,
                        enabled,
                    },
                );
            }
            None => self.violation(format!(
                "attribute {} set with no vertex array bound",
                attribute.slot
            )),
        }
    }

    fn enable_vertex_attrib_array(&mut self, slot: u32) {
        self.calls.push(BackendCall::EnableVertexAttribArray(slot));
        let attr = self
            .vertex_arrays
            .get_mut(&self.bound_vao)
            .and_then(|vao| vao.attributes.get_mut(&slot));
        match attr {
            Some(a) => a.enabled = true,
            None => self.violation(format!("enable of unset attribute {slot}")),
        }
    }

    fn begin_frame(&mut self) -> FrameStatus {
        self.calls.push(BackendCall::BeginFrame);
        if self.frame_open {
            self.violation("begin_frame while a frame is open".to_owned());
        }
        self.frame_open = true;
        FrameStatus::Ready
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(BackendCall::Clear(color));
        if !self.frame_open {
            self.violation("clear outside a frame".to_owned());
        }
    }

    fn draw_elements(&mut self, params: DrawParams) {
        self.calls.push(BackendCall::DrawElements {
            program: self.current_program,
            vao: self.bound_vao,
            params,
        });
        if !self.frame_open {
            self.violation("draw outside a frame".to_owned());
        }
        if self.current_program.is_null() {
            // Null program: nothing is rasterized.
            return;
        }
        if self.element_buffer(self.bound_vao).is_none() {
            self.violation("draw without an element buffer".to_owned());
        }
    }

    fn end_frame(&mut self) {
        self.calls.push(BackendCall::EndFrame);
        if !self.frame_open {
            self.violation("end_frame without begin_frame".to_owned());
            return;
        }
        self.frame_open = false;
        self.frames_presented += 1;
    }
}

fn check_source(stage: ShaderStage, source: &str) -> Result<(), String> {
    let mut open: Vec<(char, usize)> = Vec::new();
    for (n, line) in source.lines().enumerate() {
        let line_no = n + 1;
        let code = line.split("//").next().unwrap_or_default();
        for ch in code.chars() {
            let expected = match ch {
                '(' | '{' | '[' => {
                    open.push((ch, line_no));
                    continue;
                }
                ')' => '(',
                '}' => '{',
                ']' => '[',
                _ => continue,
            };
            match open.pop() {
                Some((o, _)) if o == expected => {}
                _ => return Err(format!("{line_no}: error: unexpected '{ch}'")),
            }
        }
    }
    if let Some((o, line_no)) = open.pop() {
        return Err(format!("{line_no}: error: unclosed '{o}'"));
    }

    let attr = match stage {
        ShaderStage::Vertex => "@vertex",
        ShaderStage::Fragment => "@fragment",
    };
    if !source.contains(attr) {
        return Err(format!("error: no {attr} entry point"));
    }
    Ok(())
}

fn uniform_names(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let (_, rest) = line.split_once("var<uniform>")?;
        let name = rest.split(':').next()?.trim();
        (!name.is_empty()).then(|| name.to_owned())
    })
}
