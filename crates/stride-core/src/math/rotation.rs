//! SO(3) rotation utilities
//!
//! Roll-pitch-yaw extraction, yaw averaging and axis-angle helpers used by
//! the walking generator.

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use std::f64::consts::PI;

/// Rotation matrix for a rotation of `angle` about `axis`
///
/// A zero-length axis yields the identity.
pub fn axis_angle_matrix(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    match Unit::try_new(*axis, 1e-12) {
        Some(axis) => Rotation3::from_axis_angle(&axis, angle).into_inner(),
        None => Matrix3::identity(),
    }
}

/// Rotation about the world z axis
pub fn yaw_matrix(yaw: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), yaw).into_inner()
}

/// Angle [rad] of a rotation matrix, in [0, π]
///
/// ```text
/// θ = acos((tr(R) - 1) / 2)
/// ```
pub fn rotation_angle(rot: &Matrix3<f64>) -> f64 {
    ((rot.trace() - 1.0) / 2.0).clamp(-1.0, 1.0).acos()
}

/// Roll, pitch and yaw (ZYX Euler angles) of a rotation matrix
///
/// Returns `[roll, pitch, yaw]` such that `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
/// Near the pitch singularity (cos(pitch) ≈ 0) the roll is resolved from the
/// remaining matrix entries.
pub fn rpy_from_rot(r: &Matrix3<f64>) -> Vector3<f64> {
    let roll;
    let pitch;
    let yaw;

    if r[(0, 0)].abs() < r[(2, 0)].abs() && r[(1, 0)].abs() < r[(2, 0)].abs() {
        // cos(pitch) is nearly zero
        let sp = (-r[(2, 0)]).clamp(-1.0, 1.0);
        pitch = sp.asin();

        let mut rl = (sp * r[(0, 1)] + r[(1, 2)]).atan2(sp * r[(0, 2)] - r[(1, 1)]);
        if r[(0, 0)] > 0.0 {
            if rl < 0.0 {
                rl += PI;
            } else {
                rl -= PI;
            }
        }
        roll = rl;

        let sr = roll.sin();
        let cr = roll.cos();
        yaw = if sp > 0.0 {
            (sr * r[(1, 1)] + cr * r[(1, 2)]).atan2(sr * r[(0, 1)] + cr * r[(0, 2)])
        } else {
            (-sr * r[(1, 1)] - cr * r[(1, 2)]).atan2(-sr * r[(0, 1)] - cr * r[(0, 2)])
        };
    } else {
        yaw = r[(1, 0)].atan2(r[(0, 0)]);
        let sa = yaw.sin();
        let ca = yaw.cos();
        pitch = (-r[(2, 0)]).atan2(ca * r[(0, 0)] + sa * r[(1, 0)]);
        roll = (sa * r[(0, 2)] - ca * r[(1, 2)]).atan2(-sa * r[(0, 1)] + ca * r[(1, 1)]);
    }

    Vector3::new(roll, pitch, yaw)
}

/// Wrap an angle into [-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Pure yaw rotation halfway between the yaws of two orientations
///
/// The yaw difference is wrapped into [-π, π] first, so the average always
/// lies on the shorter arc. Roll and pitch are discarded.
pub fn mid_yaw(a: &Matrix3<f64>, b: &Matrix3<f64>) -> Matrix3<f64> {
    let yaw_a = rpy_from_rot(a).z;
    let yaw_b = rpy_from_rot(b).z;

    let dyaw = wrap_angle(yaw_b - yaw_a);
    yaw_matrix(yaw_a + dyaw / 2.0)
}
