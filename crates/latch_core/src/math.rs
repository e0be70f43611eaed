//! Math utilities
//!
//! Re-exports glam with the handedness helpers used by the importers

pub use glam::*;

/// Mirror matrix flipping the Z axis (right-handed <-> left-handed).
pub const MIRROR_Z: Mat4 = Mat4::from_cols(
    Vec4::X,
    Vec4::Y,
    Vec4::NEG_Z,
    Vec4::W,
);

/// Express a transform authored in a right-handed basis in a left-handed one.
pub fn mirror_z(transform: Mat4) -> Mat4 {
    MIRROR_Z * transform * MIRROR_Z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_z_translation() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mirrored = mirror_z(m);
        assert_eq!(mirrored.w_axis, Vec4::new(1.0, 2.0, -3.0, 1.0));
    }

    #[test]
    fn test_mirror_z_is_involution() {
        let m = Mat4::from_rotation_y(0.7) * Mat4::from_scale(Vec3::splat(2.0));
        assert!(mirror_z(mirror_z(m)).abs_diff_eq(m, 1e-6));
    }
}
