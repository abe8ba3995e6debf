use crate::backend::{
    BufferId, BufferTarget, BufferUsage, GraphicsBackend, VertexArrayId, VertexAttribute,
};
use crate::mesh::GridMesh;

use super::{Buffer, VertexArray};

/// Slot 0: `vec3<f32>` position, tightly packed.
pub const POSITION_ATTRIBUTE: VertexAttribute = VertexAttribute {
    slot: 0,
    components: 3,
    stride: 12,
    offset: 0,
};

/// Slot 1: `vec4<f32>` RGBA color, tightly packed.
pub const COLOR_ATTRIBUTE: VertexAttribute = VertexAttribute {
    slot: 1,
    components: 4,
    stride: 16,
    offset: 0,
};

/// Vertex array plus position, color and index buffers for one mesh.
#[derive(Debug)]
pub struct GpuResourceSet {
    vao: VertexArray,
    vbo: Buffer,
    color_vbo: Buffer,
    ebo: Buffer,
}

impl GpuResourceSet {
    pub fn allocate<B: GraphicsBackend + ?Sized>(gfx: &mut B) -> Self {
        let set = Self {
            vao: VertexArray::create(gfx),
            vbo: Buffer::create(gfx),
            color_vbo: Buffer::create(gfx),
            ebo: Buffer::create(gfx),
        };
        log::debug!(
            "allocated resource set vao={:?} vbo={:?} color={:?} ebo={:?}",
            set.vao.id(),
            set.vbo.id(),
            set.color_vbo.id(),
            set.ebo.id()
        );
        set
    }

    /// Replaces the position buffer and points slot 0 at it.
    pub fn upload_vertices<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B, vertices: &[[f32; 3]]) {
        self.upload_attribute(
            gfx,
            &self.vbo,
            bytemuck::cast_slice(vertices),
            BufferUsage::Static,
            POSITION_ATTRIBUTE,
        );
    }

    /// Replaces the color buffer and points slot 1 at it.
    pub fn upload_colors<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B, colors: &[f32]) {
        self.upload_attribute(
            gfx,
            &self.color_vbo,
            bytemuck::cast_slice(colors),
            BufferUsage::Dynamic,
            COLOR_ATTRIBUTE,
        );
    }

    /// Replaces the index buffer and records it in the vertex array.
    pub fn upload_indices<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B, indices: &[u32]) {
        self.vao.bind(gfx);
        self.ebo.bind(gfx, BufferTarget::ElementArray);
        gfx.buffer_data(
            BufferTarget::ElementArray,
            bytemuck::cast_slice(indices),
            BufferUsage::Static,
        );
    }

    /// Uploads vertices, colors, then indices.
    pub fn upload_mesh<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B, mesh: &GridMesh) {
        self.upload_vertices(gfx, mesh.vertices());
        self.upload_colors(gfx, mesh.colors());
        self.upload_indices(gfx, mesh.indices());
        log::debug!(
            "uploaded {} mesh: {} vertices, {} indices",
            mesh.size(),
            mesh.vertices().len(),
            mesh.indices().len()
        );
    }

    fn upload_attribute<B: GraphicsBackend + ?Sized>(
        &self,
        gfx: &mut B,
        buffer: &Buffer,
        bytes: &[u8],
        usage: BufferUsage,
        attribute: VertexAttribute,
    ) {
        self.vao.bind(gfx);
        buffer.bind(gfx, BufferTarget::Array);
        gfx.buffer_data(BufferTarget::Array, bytes, usage);
        gfx.vertex_attrib_pointer(attribute);
        gfx.enable_vertex_attrib_array(attribute.slot);
    }

    pub fn vertex_array(&self) -> &VertexArray {
        &self.vao
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.vbo.id()
    }

    pub fn color_buffer(&self) -> BufferId {
        self.color_vbo.id()
    }

    pub fn index_buffer(&self) -> BufferId {
        self.ebo.id()
    }

    pub fn vao_id(&self) -> VertexArrayId {
        self.vao.id()
    }

    /// Frees all four objects.
    pub fn release<B: GraphicsBackend + ?Sized>(self, gfx: &mut B) {
        let Self {
            vao,
            vbo,
            color_vbo,
            ebo,
        } = self;
        vao.release(gfx);
        vbo.release(gfx);
        color_vbo.release(gfx);
        ebo.release(gfx);
    }
}
