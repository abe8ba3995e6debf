use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::{self, Recovery};
use super::{Acquire, GpuFrame, GpuInit};

/// Device, queue and configured surface of one window.
///
/// Borrows the window for `'w`; the window must outlive it.
pub struct Gpu<'w> {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Last size reported by the window; may be 0x0 while `config` keeps the
    /// last drawable size.
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(surface::is_drawable(size), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;
        let (device, queue) = request_device(&adapter).await?;
        // Errors outside a validation scope are logged; wgpu's default handler panics.
        device.on_uncaptured_error(Arc::new(|err| log::error!("wgpu: {err}")));

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_format(&caps.formats, init.prefer_srgb)
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: surface::choose_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: init.max_frame_latency,
        };
        surface.configure(&device, &config);

        let gpu = Self {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        };
        gpu.log_context_info();
        Ok(gpu)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Follows the window size. A 0x0 size is remembered but the surface
    /// keeps its configuration until the window is drawable again.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if !surface::is_drawable(size) {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next swapchain image, resolving surface errors on the
    /// way: outdated or lost surfaces are reconfigured and the frame skipped.
    pub fn acquire(&mut self) -> Acquire {
        if !surface::is_drawable(self.size) {
            return Acquire::Skip("window is zero-sized".to_owned());
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                let reason = err.to_string();
                return match surface::recovery_for(&err) {
                    Recovery::Reconfigure => {
                        self.surface.configure(&self.device, &self.config);
                        Acquire::Skip(format!("{reason}; surface reconfigured"))
                    }
                    Recovery::Skip => Acquire::Skip(reason),
                    Recovery::Fatal => Acquire::Lost(reason),
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gridview frame"),
            });

        Acquire::Frame(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    pub fn present(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    fn log_context_info(&self) {
        let info = self.adapter.get_info();
        log::info!(
            "adapter: {} ({:?}, {:?}), driver {} {}",
            info.name,
            info.backend,
            info.device_type,
            info.driver,
            info.driver_info
        );
        log::info!(
            "surface: {}x{} {:?}, {:?}, {:?}",
            self.config.width,
            self.config.height,
            self.config.format,
            self.config.present_mode,
            self.config.alpha_mode
        );
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    // Only vertex and index buffers plus one uniform block are needed.
    let required_limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("gridview device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device")
}
