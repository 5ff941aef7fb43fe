//! Quaternion to Euler decomposition and the placement rotation order

use glam::{Mat4, Quat, Vec3};

/// Pitch, yaw and roll (radians, about X, Y and Z) of a unit quaternion.
///
/// Uses the glm `eulerAngles` formulas, including its fallback for the
/// pitch singularity, so transforms match assets baked with that convention.
pub fn euler_angles(q: Quat) -> Vec3 {
    let pitch_y = 2.0 * (q.y * q.z + q.w * q.x);
    let pitch_x = q.w * q.w - q.x * q.x - q.y * q.y + q.z * q.z;
    let pitch = if pitch_x.abs() <= f32::EPSILON && pitch_y.abs() <= f32::EPSILON {
        2.0 * q.x.atan2(q.w)
    } else {
        pitch_y.atan2(pitch_x)
    };

    let yaw = (-2.0 * (q.x * q.z - q.w * q.y)).clamp(-1.0, 1.0).asin();

    let roll = (2.0 * (q.x * q.y + q.w * q.z))
        .atan2(q.w * q.w + q.x * q.x - q.y * q.y - q.z * q.z);

    Vec3::new(pitch, yaw, roll)
}

/// Rotation matrix `Rx(pitch) * Ry(yaw) * Rz(-roll)` built from `rotation`.
///
/// The negated roll and this multiplication order are what the IPL data
/// expects; do not replace with `Mat4::from_quat`.
pub fn placement_rotation(rotation: Quat) -> Mat4 {
    let ea = euler_angles(rotation);
    Mat4::from_rotation_x(ea.x) * Mat4::from_rotation_y(ea.y) * Mat4::from_rotation_z(-ea.z)
}

/// Normalize a quaternion, falling back to identity for a zero-length one
pub fn normalize_or_identity(q: Quat) -> Quat {
    let len = q.length();
    if len <= 0.0 || !len.is_finite() {
        Quat::IDENTITY
    } else {
        q / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn test_identity_has_zero_angles() {
        assert!(approx(euler_angles(Quat::IDENTITY), Vec3::ZERO));
        assert!(placement_rotation(Quat::IDENTITY).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_single_axis_angles() {
        let qx = Quat::from_rotation_x(0.5);
        assert!(approx(euler_angles(qx), Vec3::new(0.5, 0.0, 0.0)));

        let qy = Quat::from_rotation_y(0.25);
        assert!(approx(euler_angles(qy), Vec3::new(0.0, 0.25, 0.0)));

        let qz = Quat::from_rotation_z(FRAC_PI_2);
        assert!(approx(euler_angles(qz), Vec3::new(0.0, 0.0, FRAC_PI_2)));
    }

    #[test]
    fn test_roll_is_negated() {
        // A pure Z rotation comes out mirrored
        let m = placement_rotation(Quat::from_rotation_z(FRAC_PI_2));
        let expected = Mat4::from_rotation_z(-FRAC_PI_2);
        assert!(m.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_zero_quaternion_normalizes_to_identity() {
        let q = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert_eq!(normalize_or_identity(q), Quat::IDENTITY);

        let q = normalize_or_identity(Quat::from_xyzw(0.0, 0.0, 0.0, 2.0));
        assert!((q.w - 1.0).abs() < 1e-6);
    }
}
