//! Fixed numeric precision used for geometry comparisons.

use glam::Vec3;

/// Smallest difference treated as a real change.
///
/// Also the lower bound for aspect ratios, so that divisions by a ratio never
/// blow up.
pub const NUMBER_PRECISION: f32 = 1e-4;

/// Compare two scalars under [`NUMBER_PRECISION`].
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= NUMBER_PRECISION
}

/// Component-wise comparison of two vectors under [`NUMBER_PRECISION`].
pub fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, NUMBER_PRECISION)
}

/// Clamp every component to be non-negative.
pub fn non_negative(v: Vec3) -> Vec3 {
    v.max(Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_threshold() {
        assert!(approx_eq(1.0, 1.0 + NUMBER_PRECISION / 2.0));
        assert!(!approx_eq(1.0, 1.0 + NUMBER_PRECISION * 10.0));
    }

    #[test]
    fn test_vec_approx_eq() {
        let a = Vec3::new(10.0, 20.0, 0.0);
        assert!(vec_approx_eq(a, Vec3::new(10.00001, 20.0, 0.0)));
        assert!(!vec_approx_eq(a, Vec3::new(10.0, 20.1, 0.0)));
    }

    #[test]
    fn test_non_negative() {
        let v = non_negative(Vec3::new(-1.0, 2.0, -0.5));
        assert_eq!(v, Vec3::new(0.0, 2.0, 0.0));
    }
}
