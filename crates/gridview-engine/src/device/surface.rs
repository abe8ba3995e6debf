use winit::dpi::PhysicalSize;

/// What to do after the surface refused to hand out a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Recovery {
    /// Configure the surface again and retry on the next frame.
    Reconfigure,
    Skip,
    Fatal,
}

pub(crate) fn recovery_for(err: &wgpu::SurfaceError) -> Recovery {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Recovery::Reconfigure,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Recovery::Skip,
        wgpu::SurfaceError::OutOfMemory => Recovery::Fatal,
    }
}

/// First format matching the sRGB preference, else the first one offered.
pub(crate) fn choose_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| formats.first().copied())
}

/// The grid covers every pixel, so an opaque surface is preferred.
pub(crate) fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        return wgpu::CompositeAlphaMode::Opaque;
    }
    modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// wgpu rejects zero-sized surfaces; minimized windows report 0x0.
pub(crate) fn is_drawable(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

#[cfg(test)]
mod tests {
    use wgpu::CompositeAlphaMode::{Auto, Opaque, PreMultiplied};
    use wgpu::TextureFormat::{Bgra8Unorm, Bgra8UnormSrgb, Rgba8Unorm};

    use super::*;

    // ── format ──────────────────────────────────────────────────────────

    #[test]
    fn linear_format_by_default() {
        assert_eq!(choose_format(&[Bgra8UnormSrgb, Bgra8Unorm], false), Some(Bgra8Unorm));
    }

    #[test]
    fn srgb_format_when_preferred() {
        assert_eq!(choose_format(&[Rgba8Unorm, Bgra8UnormSrgb], true), Some(Bgra8UnormSrgb));
    }

    #[test]
    fn format_falls_back_to_first() {
        assert_eq!(choose_format(&[Rgba8Unorm], true), Some(Rgba8Unorm));
        assert_eq!(choose_format(&[], false), None);
    }

    // ── alpha / size / errors ───────────────────────────────────────────

    #[test]
    fn opaque_alpha_preferred() {
        assert_eq!(choose_alpha_mode(&[PreMultiplied, Opaque]), Opaque);
        assert_eq!(choose_alpha_mode(&[PreMultiplied]), PreMultiplied);
        assert_eq!(choose_alpha_mode(&[]), Auto);
    }

    #[test]
    fn zero_sized_surface_is_not_drawable() {
        assert!(is_drawable(PhysicalSize::new(700, 700)));
        assert!(!is_drawable(PhysicalSize::new(0, 700)));
        assert!(!is_drawable(PhysicalSize::new(700, 0)));
    }

    #[test]
    fn surface_errors_map_to_recovery() {
        assert_eq!(recovery_for(&wgpu::SurfaceError::Outdated), Recovery::Reconfigure);
        assert_eq!(recovery_for(&wgpu::SurfaceError::Lost), Recovery::Reconfigure);
        assert_eq!(recovery_for(&wgpu::SurfaceError::Timeout), Recovery::Skip);
        assert_eq!(recovery_for(&wgpu::SurfaceError::OutOfMemory), Recovery::Fatal);
    }
}
