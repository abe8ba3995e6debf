/// Swapchain image being drawn this frame, with its encoder.
///
/// No other image can be acquired while one is held; pass it to
/// `Gpu::present` before the next `Gpu::acquire`.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// Result of `Gpu::acquire`.
pub enum Acquire {
    Frame(GpuFrame),
    /// Nothing to draw into this time (timeout, zero-sized or just
    /// reconfigured surface). The reason is for logging.
    Skip(String),
    /// The surface cannot be rendered to anymore.
    Lost(String),
}
