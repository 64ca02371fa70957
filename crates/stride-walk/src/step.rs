//! Step data
//!
//! The per-tick output of the walking generator and the goal format the
//! planner queues. Both use the same [`StepData`] record.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use stride_core::interpolation::InterpolationKind;
use stride_core::math::Pose;

/// Contact regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FootType {
    /// Right foot supports, left foot swings
    Right,
    /// Left foot supports, right foot swings
    Left,
    #[default]
    Double,
    Airborne,
}

impl FootType {
    /// The other single-support foot; `Double` and `Airborne` map to themselves
    pub fn opposite(self) -> Self {
        match self {
            FootType::Right => FootType::Left,
            FootType::Left => FootType::Right,
            other => other,
        }
    }

    pub fn is_single(self) -> bool {
        matches!(self, FootType::Right | FootType::Left)
    }
}

/// What a step goal asks the generator to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StepType {
    /// Swing along a cycloid
    Cycloid,
    /// Swing along quintic polynomials
    Quintic,
    /// Swing along cubic polynomials
    Cubic,
    /// Bring the capture point to rest
    Stop,
    /// Shift the capture point before stepping
    Start,
    /// Move the capture point in double support
    #[default]
    Wait,
}

impl StepType {
    /// Whether this step moves a foot
    pub fn is_stepping(self) -> bool {
        matches!(self, StepType::Cycloid | StepType::Quintic | StepType::Cubic)
    }

    /// Polynomial profile for polynomial swing types
    pub fn interpolation_kind(self) -> Option<InterpolationKind> {
        match self {
            StepType::Quintic => Some(InterpolationKind::Quintic),
            StepType::Cubic => Some(InterpolationKind::Cubic),
            _ => None,
        }
    }
}

/// Foot placements, support regime and balance references at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    pub rfoot: Pose,
    pub lfoot: Pose,
    /// Support foot during this step (for goals: the foot that stays down)
    pub support_foot: FootType,
    pub step_type: StepType,
    /// Center of mass [m]
    pub com: Vector3<f64>,
    /// Zero moment point reference [m]
    pub zmp: Vector3<f64>,
    /// Capture point reference [m]
    pub cp: Vector3<f64>,
    /// CoM height above the ground [m]
    pub com_height: f64,
    /// Single support duration [s]
    pub single_support_time: f64,
    /// Double support duration [s], split evenly before and after the swing
    pub double_support_time: f64,
}

impl Default for StepData {
    fn default() -> Self {
        Self {
            rfoot: Pose::identity(),
            lfoot: Pose::identity(),
            support_foot: FootType::Double,
            step_type: StepType::Wait,
            com: Vector3::zeros(),
            zmp: Vector3::zeros(),
            cp: Vector3::zeros(),
            com_height: 0.0,
            single_support_time: 0.0,
            double_support_time: 0.0,
        }
    }
}

impl StepData {
    /// Total step duration [s]
    pub fn duration(&self) -> f64 {
        self.single_support_time + self.double_support_time
    }

    /// Pose of a single foot; `None` for `Double` and `Airborne`
    pub fn foot(&self, foot: FootType) -> Option<&Pose> {
        match foot {
            FootType::Right => Some(&self.rfoot),
            FootType::Left => Some(&self.lfoot),
            _ => None,
        }
    }

    pub fn foot_mut(&mut self, foot: FootType) -> Option<&mut Pose> {
        match foot {
            FootType::Right => Some(&mut self.rfoot),
            FootType::Left => Some(&mut self.lfoot),
            _ => None,
        }
    }

    /// Midpoint between both feet
    pub fn feet_center(&self) -> Vector3<f64> {
        (self.rfoot.translation + self.lfoot.translation) / 2.0
    }
}
