//! Quaternion operations for orientation interpolation
//!
//! Implements:
//! - Conversion between rotation matrices and unit quaternions
//! - Spherical linear interpolation (SLERP) along the shorter arc

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector4};

/// Angle below which two quaternions are treated as coincident in [`slerp`]
const SLERP_ANGLE_EPSILON: f64 = 1e-10;

/// Unit quaternion equivalent of a rotation matrix
pub fn quaternion_from_matrix(rot: &Matrix3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rot))
}

/// Rotation matrix equivalent of a unit quaternion
pub fn matrix_from_quaternion(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}

/// Spherical linear interpolation between two unit quaternions
///
/// ```text
/// slerp(q0, q1, t) = sin((1-t)θ)/sin θ · q0 + sin(tθ)/sin θ · q1,   cos θ = q0·q1
/// ```
///
/// The shorter arc is taken by flipping `q1` when `q0·q1 < 0`. When θ is
/// within epsilon of 0 or π the sine term vanishes and the coefficients are
/// blended linearly instead.
///
/// # Arguments
/// * `q0` - Orientation at `t = 0`
/// * `q1` - Orientation at `t = 1`
/// * `t` - Blend factor, normally in [0, 1]
pub fn slerp(q0: &UnitQuaternion<f64>, q1: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    let a: Vector4<f64> = q0.coords;
    let mut b: Vector4<f64> = q1.coords;

    let mut dot = a.dot(&b);
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();

    let blended = if theta < SLERP_ANGLE_EPSILON
        || (std::f64::consts::PI - theta) < SLERP_ANGLE_EPSILON
        || sin_theta.abs() < SLERP_ANGLE_EPSILON
    {
        a * (1.0 - t) + b * t
    } else {
        a * (((1.0 - t) * theta).sin() / sin_theta) + b * ((t * theta).sin() / sin_theta)
    };

    UnitQuaternion::from_quaternion(Quaternion::from(blended))
}
