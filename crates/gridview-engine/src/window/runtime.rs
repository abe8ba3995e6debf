use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::WgpuBackend;
use crate::core::Lifecycle;
use crate::device::{Gpu, GpuInit};
use crate::render::{GridConfig, RenderLoop};
use crate::shader::ShaderSources;
use crate::time::FrameClock;

/// Window title and size.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "gridview".to_string(),
            initial_size: LogicalSize::new(700.0, 700.0),
        }
    }
}

/// Runs one grid window on the winit event loop.
pub struct Runtime;

impl Runtime {
    /// Opens a window and drives a grid [`RenderLoop`] until it is closed.
    ///
    /// Returns an error if the event loop, the window or the GPU context
    /// could not be created. Shader failures are not errors here: the loop
    /// keeps running in degraded mode.
    pub fn run(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        grid: GridConfig,
        sources: ShaderSources,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut host = GridHost {
            config,
            gpu_init,
            grid,
            sources,
            view: None,
            failure: None,
        };
        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        host.failure.map_or(Ok(()), Err)
    }
}

/// The window and the render loop drawing into it. The loop's backend
/// borrows the window through its surface.
#[self_referencing]
struct GridWindow {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    view: RenderLoop<WgpuBackend<'this>>,
}

impl GridWindow {
    fn open(
        event_loop: &ActiveEventLoop,
        config: &RuntimeConfig,
        gpu_init: GpuInit,
        grid: GridConfig,
        sources: ShaderSources,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let mut entry = GridWindowTryBuilder {
            clock: FrameClock::default(),
            window,
            view_builder: |w| {
                let gpu = pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed")?;
                Ok::<_, anyhow::Error>(RenderLoop::new(WgpuBackend::new(gpu), grid, sources))
            },
        }
        .try_build()?;

        entry.with_view_mut(|view| view.initialize());
        for err in entry.borrow_view().diagnostics() {
            log::warn!("shader diagnostic: {err}");
        }
        Ok(entry)
    }

    fn id(&self) -> WindowId {
        self.borrow_window().id()
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.with_view_mut(|view| {
            view.backend_mut().resize_surface(size);
            view.resize(size.width, size.height);
        });
        self.borrow_window().request_redraw();
    }

    /// Renders one frame. Returns false once the surface is gone.
    fn redraw(&mut self) -> bool {
        self.with_mut(|fields| {
            let ft = fields.clock.tick();
            log::trace!(
                "frame {} dt {:.2}ms ({:.1} fps avg)",
                ft.frame_index,
                ft.dt * 1000.0,
                ft.fps
            );

            fields.window.pre_present_notify();
            fields.view.render();
            if fields.view.backend().surface_lost() {
                return false;
            }
            fields.window.request_redraw();
            true
        })
    }
}

struct GridHost {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    grid: GridConfig,
    sources: ShaderSources,

    view: Option<GridWindow>,
    failure: Option<anyhow::Error>,
}

impl GridHost {
    /// Dropping the window tears the render loop down before the surface
    /// and window go away.
    fn close(&mut self, event_loop: &ActiveEventLoop) {
        self.view = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for GridHost {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.view.is_some() {
            return;
        }

        match GridWindow::open(
            event_loop,
            &self.config,
            self.gpu_init.clone(),
            self.grid.clone(),
            self.sources.clone(),
        ) {
            Ok(view) => {
                view.borrow_window().request_redraw();
                self.view = Some(view);
            }
            Err(e) => {
                log::error!("failed to open the grid window: {e:#}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(view) = self.view.as_mut().filter(|v| v.id() == window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.close(event_loop),

            WindowEvent::Resized(size) => view.resize(size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = view.borrow_window().inner_size();
                view.resize(size);
            }

            WindowEvent::RedrawRequested => {
                if !view.redraw() {
                    log::error!("surface lost; closing window");
                    self.close(event_loop);
                }
            }

            _ => {}
        }
    }
}
