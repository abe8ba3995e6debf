use std::fmt;

// ── object ids ────────────────────────────────────────────────────────────

macro_rules! object_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// Id `0` is the null object: binding it unbinds, deleting it is a no-op.
        #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const NULL: $name = $name(0);

            #[inline]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

object_id!(
    /// Backend id of a shader stage object.
    ShaderId
);
object_id!(
    /// Backend id of a program object.
    ProgramId
);
object_id!(
    /// Backend id of a vertex array object (attribute + element bindings).
    VertexArrayId
);
object_id!(
    /// Backend id of a GPU buffer.
    BufferId
);

/// Location of a named uniform inside a linked program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub index: u32,
}

// ── enums ─────────────────────────────────────────────────────────────────

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Buffer binding point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Array,
    /// Index data; binding it records the buffer in the bound vertex array.
    ElementArray,
}

/// Upload frequency hint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten occasionally (e.g. per-point recoloring).
    Dynamic,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Triangles,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IndexType {
    U32,
}

impl IndexType {
    #[inline]
    pub const fn size_bytes(self) -> u64 {
        match self {
            IndexType::U32 => 4,
        }
    }
}

/// Result of trying to start a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame is open; draw commands will be presented on `end_frame`.
    Ready,
    /// No frame this time (surface reconfigured or timed out).
    Skipped,
    /// The surface is gone for good; the host should stop rendering.
    Lost,
}

// ── layouts ───────────────────────────────────────────────────────────────

/// Float vertex attribute sourced from the currently bound array buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexAttribute {
    /// Shader input location.
    pub slot: u32,
    /// Number of `f32` components (1–4).
    pub components: u32,
    /// Distance between consecutive elements in bytes. `0` means tightly packed.
    pub stride: u64,
    /// Byte offset of the first element.
    pub offset: u64,
}

impl VertexAttribute {
    /// Stride with the tightly-packed case resolved.
    #[inline]
    pub const fn effective_stride(self) -> u64 {
        if self.stride == 0 {
            self.components as u64 * 4
        } else {
            self.stride
        }
    }
}

/// Parameters of one indexed draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawParams {
    pub mode: PrimitiveMode,
    /// Number of indices consumed (every triangle corner, not unique vertices).
    pub count: u32,
    pub index_type: IndexType,
    /// Byte offset into the element buffer.
    pub offset: u64,
}

impl DrawParams {
    /// Indexed triangle list of `count` `u32` indices starting at offset 0.
    #[inline]
    pub const fn triangles(count: u32) -> Self {
        Self {
            mode: PrimitiveMode::Triangles,
            count,
            index_type: IndexType::U32,
            offset: 0,
        }
    }

    /// First index consumed by the draw.
    #[inline]
    pub const fn first_index(self) -> u32 {
        (self.offset / self.index_type.size_bytes()) as u32
    }
}
