use std::path::Path;

use anyhow::{Context, Result};

use gridview_engine::device::GpuInit;
use gridview_engine::logging::{init_logging, LoggingConfig};
use gridview_engine::mesh::GridSize;
use gridview_engine::render::GridConfig;
use gridview_engine::shader::ShaderSources;
use gridview_engine::window::{Runtime, RuntimeConfig};

mod cli;

const BUILTIN_VERTEX: &str = include_str!("../shaders/grid.vert.wgsl");
const BUILTIN_FRAGMENT: &str = include_str!("../shaders/grid.frag.wgsl");

fn main() -> Result<()> {
    let args = cli::parse();

    init_logging(LoggingConfig {
        env_filter: args.log_level.clone(),
        ..Default::default()
    });

    let grid_size = GridSize::new(args.grid_size).context("invalid --grid-size")?;

    let sources = ShaderSources::new(
        load_source(args.vertex.as_deref(), BUILTIN_VERTEX)?,
        load_source(args.fragment.as_deref(), BUILTIN_FRAGMENT)?,
    );

    let gpu_init = GpuInit::default()
        .with_srgb(args.srgb)
        .with_vsync(!args.no_vsync);

    let mut grid = GridConfig::default()
        .with_grid_size(grid_size)
        .with_point_colors(args.points);
    if let Some(clear) = args.clear_color {
        grid = grid.with_clear_color(clear);
    }

    log::info!("gridview {grid_size}, {} recolored points", grid.point_colors.len());

    Runtime::run(
        RuntimeConfig {
            title: format!("gridview {grid_size}"),
            ..Default::default()
        },
        gpu_init,
        grid,
        sources,
    )
}

fn load_source(path: Option<&Path>, builtin: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display())),
        None => Ok(builtin.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_engine::backend::RecordingBackend;
    use gridview_engine::core::Lifecycle;
    use gridview_engine::render::RenderLoop;

    #[test]
    fn builtin_shaders_build() {
        let mut view = RenderLoop::new(
            RecordingBackend::new(),
            GridConfig::default(),
            ShaderSources::new(BUILTIN_VERTEX, BUILTIN_FRAGMENT),
        );
        view.initialize();
        view.render();

        assert!(!view.is_degraded(), "{:?}", view.diagnostics());
        assert_eq!(view.backend().frames_presented(), 1);
    }

    #[test]
    fn missing_shader_file_is_an_error() {
        let err = load_source(Some(Path::new("/nonexistent/grid.wgsl")), "").unwrap_err();
        assert!(err.to_string().contains("failed to read shader"));
    }

    #[test]
    fn builtin_used_without_path() {
        assert_eq!(load_source(None, BUILTIN_FRAGMENT).unwrap(), BUILTIN_FRAGMENT);
    }
}
