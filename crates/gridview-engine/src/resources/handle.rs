use crate::backend::{BufferId, BufferTarget, GraphicsBackend, VertexArrayId};

// Dropping a handle that was never released only logs: the backend is not
// reachable from `Drop`, and the context may not be current there.

/// Owned vertex array object.
#[derive(Debug)]
pub struct VertexArray {
    id: VertexArrayId,
}

impl VertexArray {
    pub fn create<B: GraphicsBackend + ?Sized>(gfx: &mut B) -> Self {
        Self {
            id: gfx.create_vertex_array(),
        }
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    pub fn bind<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B) {
        gfx.bind_vertex_array(self.id);
    }

    pub fn release<B: GraphicsBackend + ?Sized>(mut self, gfx: &mut B) {
        gfx.delete_vertex_array(self.id);
        self.id = VertexArrayId::NULL;
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if !self.id.is_null() {
            log::warn!("vertex array {:?} dropped without release; GPU object leaked", self.id);
        }
    }
}

/// Owned GPU buffer.
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
}

impl Buffer {
    pub fn create<B: GraphicsBackend + ?Sized>(gfx: &mut B) -> Self {
        Self {
            id: gfx.create_buffer(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn bind<B: GraphicsBackend + ?Sized>(&self, gfx: &mut B, target: BufferTarget) {
        gfx.bind_buffer(target, self.id);
    }

    pub fn release<B: GraphicsBackend + ?Sized>(mut self, gfx: &mut B) {
        gfx.delete_buffer(self.id);
        self.id = BufferId::NULL;
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if !self.id.is_null() {
            log::warn!("buffer {:?} dropped without release; GPU object leaked", self.id);
        }
    }
}
