/// Straight-alpha RGBA color with `f32` channels in `[0, 1]`.
///
/// Used for the frame clear color and for per-vertex grid colors. The grid
/// pipeline does not blend, so no premultiplication is applied.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    /// Default background behind the grid (dark slate).
    pub const SLATE: Color = Color::new(0.2, 0.3, 0.3, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from `0`–`255` channel bytes.
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Clamps all channels to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_maps_full_range() {
        assert_eq!(Color::from_u8(255, 0, 255, 255), Color::new(1.0, 0.0, 1.0, 1.0));
        assert_eq!(Color::from_u8(0, 0, 0, 0), Color::default());
    }

    #[test]
    fn clamped_limits_channels() {
        let c = Color::new(-0.5, 2.0, 0.5, 1.5).clamped();
        assert_eq!(c, Color::new(0.0, 1.0, 0.5, 1.0));
    }

    #[test]
    fn converts_to_wgpu_color() {
        let c: wgpu::Color = Color::SLATE.into();
        assert_eq!(c.a, 1.0);
        assert!((c.r - 0.2).abs() < 1e-6);
    }
}
