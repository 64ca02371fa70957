//! Orientation interpolator
//!
//! A scalar [`Interpolator`] drives a blend factor from 0 to 1 under the
//! requested polynomial profile; the factor is mapped onto SO(3) either by
//! SLERP or by a two-axis decomposition of the relative rotation.

use std::collections::VecDeque;

use nalgebra::{Matrix3, UnitQuaternion, Vector1, Vector3};
use serde::{Deserialize, Serialize};

use super::{InterpolationError, InterpolationKind, Interpolator, TrajectoryGoal};
use crate::math::{axis_angle_matrix, matrix_from_quaternion, quaternion_from_matrix, slerp};

/// Angle below which a rotation component is treated as zero or π
const AXIS_EPSILON: f64 = 1e-9;

/// How the blend factor is mapped onto a rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationKind {
    /// Tilt the reference axis onto its target, then twist about it
    #[default]
    TwoAxis,
    /// Spherical linear interpolation along the shorter arc
    Slerp,
}

#[derive(Debug, Clone, Copy)]
struct RotationGoal {
    rotation: Matrix3<f64>,
    duration: f64,
    rot_kind: RotationKind,
    pos_kind: InterpolationKind,
}

/// Precomputed endpoints of the active goal
#[derive(Debug, Clone, Copy)]
enum Blend {
    Slerp {
        from: UnitQuaternion<f64>,
        to: UnitQuaternion<f64>,
    },
    TwoAxis {
        tilt_axis: Vector3<f64>,
        tilt_angle: f64,
        twist_axis: Vector3<f64>,
        twist_angle: f64,
    },
}

/// Rotation generator fed by a queue of target orientations
#[derive(Debug, Clone)]
pub struct OrientationInterpolator {
    progress: Interpolator<1>,
    start: Matrix3<f64>,
    goals: VecDeque<RotationGoal>,
    active: Option<(Blend, Matrix3<f64>)>,
    axis: Vector3<f64>,
}

impl OrientationInterpolator {
    pub fn new(dt: f64) -> Self {
        Self {
            progress: Interpolator::new(dt),
            start: Matrix3::identity(),
            goals: VecDeque::new(),
            active: None,
            axis: Vector3::z(),
        }
    }

    /// Reset the start orientation
    pub fn init(&mut self, rotation: Matrix3<f64>) {
        self.start = rotation;
    }

    /// Reference axis (start-local frame) kept linear in the blend factor by
    /// [`RotationKind::TwoAxis`]. A zero vector is ignored.
    pub fn set_axis(&mut self, axis: Vector3<f64>) {
        if let Some(axis) = axis.try_normalize(AXIS_EPSILON) {
            self.axis = axis;
        }
    }

    /// Queue a target orientation
    ///
    /// # Arguments
    /// * `rotation` - Target orientation
    /// * `duration` - Segment duration [s]
    /// * `rot_kind` - SO(3) mapping
    /// * `pos_kind` - Blend factor profile
    pub fn set(
        &mut self,
        rotation: Matrix3<f64>,
        duration: f64,
        rot_kind: RotationKind,
        pos_kind: InterpolationKind,
    ) -> Result<(), InterpolationError> {
        self.progress
            .validate(&TrajectoryGoal::new(Vector1::new(1.0), duration, pos_kind))?;

        self.goals.push_back(RotationGoal {
            rotation,
            duration,
            rot_kind,
            pos_kind,
        });
        if self.active.is_none() {
            self.activate();
        }
        Ok(())
    }

    /// Current orientation, advancing one tick if `pop` is set
    pub fn get(&mut self, pop: bool) -> Matrix3<f64> {
        let Some((blend, goal)) = self.active else {
            return self.start;
        };

        let s = self.progress.get(pop).position[0];
        let rotation = self.blend(&blend, s);

        if pop && self.progress.is_empty() {
            self.start = goal;
            self.active = None;
            self.activate();
        }
        rotation
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.goals.is_empty()
    }

    pub fn clear(&mut self) {
        self.progress.clear();
        self.goals.clear();
        self.active = None;
    }

    /// Number of pending samples of the active goal
    pub fn len(&self) -> usize {
        self.progress.len()
    }

    pub fn remaining_time(&self) -> f64 {
        self.progress.remaining_time() + self.goals.iter().map(|g| g.duration).sum::<f64>()
    }

    pub fn start(&self) -> &Matrix3<f64> {
        &self.start
    }

    fn activate(&mut self) {
        while let Some(goal) = self.goals.pop_front() {
            self.progress.clear();
            self.progress.init(Vector1::new(0.0), None, None);
            // Validated in set()
            if self
                .progress
                .set_position(Vector1::new(1.0), goal.duration, goal.pos_kind)
                .is_err()
                || self.progress.is_empty()
            {
                self.start = goal.rotation;
                continue;
            }

            let blend = match goal.rot_kind {
                RotationKind::Slerp => Blend::Slerp {
                    from: quaternion_from_matrix(&self.start),
                    to: quaternion_from_matrix(&goal.rotation),
                },
                RotationKind::TwoAxis => two_axis(&self.axis, &(self.start.transpose() * goal.rotation)),
            };
            self.active = Some((blend, goal.rotation));
            return;
        }
    }

    fn blend(&self, blend: &Blend, s: f64) -> Matrix3<f64> {
        match blend {
            Blend::Slerp { from, to } => matrix_from_quaternion(&slerp(from, to, s)),
            Blend::TwoAxis {
                tilt_axis,
                tilt_angle,
                twist_axis,
                twist_angle,
            } => {
                self.start
                    * axis_angle_matrix(tilt_axis, s * tilt_angle)
                    * axis_angle_matrix(twist_axis, s * twist_angle)
            }
        }
    }
}

/// Split `rel` into a tilt carrying `axis` onto `rel · axis` and a twist about `axis`
///
/// ```text
/// rel = R(k1, θ1) · R(a, θ2),   k1 = a × (rel a),   cos θ1 = a · (rel a)
/// ```
///
/// With no tilt the tilt axis is fixed to x; with a half-turn tilt any axis
/// perpendicular to `a` is used.
fn two_axis(axis: &Vector3<f64>, rel: &Matrix3<f64>) -> Blend {
    let image = rel * axis;
    let tilt_angle = axis.dot(&image).clamp(-1.0, 1.0).acos();

    let tilt_axis = match axis.cross(&image).try_normalize(AXIS_EPSILON) {
        Some(k) => k,
        None if tilt_angle < AXIS_EPSILON => Vector3::x(),
        None => perpendicular(axis),
    };

    // Residual rotation about `axis`, measured on a vector normal to it
    let twist = axis_angle_matrix(&tilt_axis, tilt_angle).transpose() * rel;
    let normal = perpendicular(axis);
    let turned = twist * normal;
    let twist_angle = axis.dot(&normal.cross(&turned)).atan2(normal.dot(&turned));

    Blend::TwoAxis {
        tilt_axis,
        tilt_angle,
        twist_axis: *axis,
        twist_angle,
    }
}

/// Unit vector normal to `axis`
fn perpendicular(axis: &Vector3<f64>) -> Vector3<f64> {
    let helper = if axis.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    axis.cross(&helper).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{rotation_angle, rpy_from_rot, yaw_matrix};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    const DT: f64 = 0.01;

    fn drain(inter: &mut OrientationInterpolator) -> Vec<Matrix3<f64>> {
        let mut out = Vec::new();
        while !inter.is_empty() {
            out.push(inter.get(true));
        }
        out
    }

    fn reaches(rot_kind: RotationKind, goal: Matrix3<f64>) {
        let mut inter = OrientationInterpolator::new(DT);
        inter.init(yaw_matrix(0.3));
        inter.set(goal, 0.5, rot_kind, InterpolationKind::Cubic).unwrap();

        let samples = drain(&mut inter);
        assert_eq!(samples.len(), 50);
        assert_relative_eq!(samples[49], goal, epsilon = 1e-9);
        assert_relative_eq!(inter.get(true), goal, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_reaches_goal() {
        reaches(RotationKind::Slerp, axis_angle_matrix(&Vector3::new(1.0, -2.0, 0.5), 1.1));
    }

    #[test]
    fn test_two_axis_reaches_goal() {
        reaches(RotationKind::TwoAxis, axis_angle_matrix(&Vector3::new(1.0, -2.0, 0.5), 1.1));
    }

    #[test]
    fn test_two_axis_half_turn_tilt() {
        reaches(RotationKind::TwoAxis, yaw_matrix(0.3) * axis_angle_matrix(&Vector3::x(), PI));
    }

    #[test]
    fn test_two_axis_pure_yaw_is_twist_only() {
        let mut inter = OrientationInterpolator::new(DT);
        inter.set(yaw_matrix(1.0), 1.0, RotationKind::TwoAxis, InterpolationKind::Linear).unwrap();

        for (i, r) in drain(&mut inter).iter().enumerate() {
            let rpy = rpy_from_rot(r);
            assert_relative_eq!(rpy.x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(rpy.y, 0.0, epsilon = 1e-9);
            assert_relative_eq!(rpy.z, (i + 1) as f64 * DT, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_identical_rotation_stays_put() {
        let r = axis_angle_matrix(&Vector3::new(0.0, 1.0, 1.0), 0.4);
        let mut inter = OrientationInterpolator::new(DT);
        inter.init(r);
        inter.set(r, 0.2, RotationKind::TwoAxis, InterpolationKind::Quintic).unwrap();

        for sample in drain(&mut inter) {
            assert_relative_eq!(rotation_angle(&(r.transpose() * sample)), 0.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_queued_goals_and_remaining_time() {
        let mut inter = OrientationInterpolator::new(DT);
        inter.set(yaw_matrix(0.5), 0.2, RotationKind::Slerp, InterpolationKind::Cubic).unwrap();
        inter.set(yaw_matrix(-0.5), 0.3, RotationKind::Slerp, InterpolationKind::Cubic).unwrap();
        assert_relative_eq!(inter.remaining_time(), 0.5, epsilon = 1e-12);

        let samples = drain(&mut inter);
        assert_eq!(samples.len(), 50);
        assert_relative_eq!(samples[19], yaw_matrix(0.5), epsilon = 1e-9);
        assert_relative_eq!(samples[49], yaw_matrix(-0.5), epsilon = 1e-9);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut inter = OrientationInterpolator::new(DT);
        inter.set(yaw_matrix(0.5), 0.2, RotationKind::TwoAxis, InterpolationKind::Cubic).unwrap();
        inter.get(true);

        let a = inter.get(false);
        let b = inter.get(false);
        assert_eq!(a, b);
        assert_eq!(inter.len(), 19);
    }

    #[test]
    fn test_infeasible_blend_rejected() {
        let mut inter = OrientationInterpolator::new(DT);
        let result = inter.set(
            yaw_matrix(0.5),
            0.2,
            RotationKind::Slerp,
            InterpolationKind::QuarticLinear { blend: 0.1 },
        );
        assert!(result.is_err());
        assert!(inter.is_empty());
    }
}
