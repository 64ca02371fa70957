//! Robot kinematics interface
//!
//! The walking generator never touches joints. It reads the initial CoM and
//! foot poses through [`BipedKinematics`] and hands per-tick targets back to
//! whatever kinematics stack implements it.

use nalgebra::{Matrix3, Vector3};
use stride_core::math::{mid_yaw, Pose};

use crate::step::{FootType, StepData};

/// Which leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FootSide {
    Right,
    Left,
}

/// Capabilities the walking generator needs from a robot model
///
/// Implementations own convergence and joint limits; the generator does not
/// retry a failed solve.
pub trait BipedKinematics {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current center of mass in the world frame [m]
    fn center_of_mass(&self) -> Vector3<f64>;

    /// Current sole pose of one foot in the world frame
    fn foot_pose(&self, side: FootSide) -> Pose;

    /// Move the joints so the robot tracks `targets`
    fn solve_ik(&mut self, targets: &IkTargets) -> Result<(), Self::Error>;
}

/// Kinematic targets for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkTargets {
    /// Foot the solve should treat as fixed
    pub support_foot: FootType,
    pub com: Vector3<f64>,
    pub trunk_rotation: Matrix3<f64>,
    pub rfoot: Pose,
    pub lfoot: Pose,
}

impl IkTargets {
    /// Targets for a generator sample; the trunk faces the mean yaw of both feet
    pub fn from_step(step: &StepData) -> Self {
        Self {
            support_foot: step.support_foot,
            com: step.com,
            trunk_rotation: mid_yaw(&step.rfoot.rotation, &step.lfoot.rotation),
            rfoot: step.rfoot,
            lfoot: step.lfoot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stride_core::math::{rpy_from_rot, yaw_matrix};

    #[test]
    fn test_trunk_faces_mid_yaw() {
        let step = StepData {
            rfoot: Pose::new(Vector3::new(0.0, -0.1, 0.0), yaw_matrix(0.1)),
            lfoot: Pose::new(Vector3::new(0.0, 0.1, 0.0), yaw_matrix(0.5)),
            com: Vector3::new(0.0, 0.0, 0.8),
            support_foot: FootType::Left,
            ..StepData::default()
        };

        let targets = IkTargets::from_step(&step);
        assert_eq!(targets.support_foot, FootType::Left);
        assert_relative_eq!(rpy_from_rot(&targets.trunk_rotation).z, 0.3, epsilon = 1e-12);
        assert_relative_eq!(targets.com, step.com);
    }

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_boxed(_: Box<dyn BipedKinematics<Error = std::io::Error>>) {}
    }
}
