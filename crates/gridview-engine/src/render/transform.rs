use glam::{vec3, Mat4};

use crate::mesh::GridSize;

/// Maps grid space `[0, n]²` onto clip space `[-1, 1]²`.
///
/// `M = S(2/n, 2/n, 1) · T(-n/2, -n/2, 0)`: the grid is centered on the
/// origin, then scaled. z is untouched and there is no aspect correction.
pub fn grid_transform(size: GridSize) -> Mat4 {
    let n = size.get() as f32;
    let half = n / 2.0;
    let s = 2.0 / n;
    Mat4::from_scale(vec3(s, s, 1.0)) * Mat4::from_translation(vec3(-half, -half, 0.0))
}

#[cfg(test)]
mod tests {
    use glam::{vec4, Vec4};

    use super::*;

    fn apply(m: Mat4, x: f32, y: f32) -> Vec4 {
        m * vec4(x, y, 0.0, 1.0)
    }

    #[test]
    fn translation_applies_before_scale() {
        let m = grid_transform(GridSize::new(4).unwrap());
        // (0, 0) moves to (-2, -2) first, then halves.
        assert!(apply(m, 0.0, 0.0).abs_diff_eq(vec4(-1.0, -1.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn grid_of_two_has_expected_columns() {
        let m = grid_transform(GridSize::new(2).unwrap());
        assert_eq!(
            m.to_cols_array(),
            [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                -1.0, -1.0, 0.0, 1.0, //
            ]
        );
    }

    #[test]
    fn corners_map_to_clip_bounds() {
        for n in [1, 2, 3, 7, 64] {
            let m = grid_transform(GridSize::new(n).unwrap());
            let n = n as f32;

            assert!(apply(m, 0.0, 0.0).abs_diff_eq(vec4(-1.0, -1.0, 0.0, 1.0), 1e-5));
            assert!(apply(m, n, n).abs_diff_eq(vec4(1.0, 1.0, 0.0, 1.0), 1e-5));
            assert!(apply(m, n, 0.0).abs_diff_eq(vec4(1.0, -1.0, 0.0, 1.0), 1e-5));
            assert!(apply(m, n / 2.0, n / 2.0).abs_diff_eq(Vec4::new(0.0, 0.0, 0.0, 1.0), 1e-5));
        }
    }

    #[test]
    fn z_is_untouched() {
        let m = grid_transform(GridSize::new(5).unwrap());
        let p = m * vec4(1.0, 1.0, 0.25, 1.0);
        assert!((p.z - 0.25).abs() < 1e-6);
    }
}
