//! Rigid-body pose
//!
//! A pose is a translation together with a 3x3 rotation matrix, the
//! representation used for foot placements and swing targets.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Rigid transform: world position and orientation of a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position [m]
    pub translation: Vector3<f64>,
    /// Orientation as a rotation matrix
    pub rotation: Matrix3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(translation: Vector3<f64>, rotation: Matrix3<f64>) -> Self {
        Self { translation, rotation }
    }

    /// Identity pose at the origin
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Matrix3::identity(),
        }
    }

    /// Pose with identity orientation at the given position
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            translation,
            rotation: Matrix3::identity(),
        }
    }

    /// Map a point from this frame into the world frame
    pub fn transform_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.translation + self.rotation * local
    }

    /// Express a world point in this frame
    pub fn inverse_transform_point(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * (world - self.translation)
    }

    /// World direction of one of this frame's axes
    pub fn axis(&self, axis: Axis) -> Vector3<f64> {
        self.rotation.column(axis.index()).into_owned()
    }
}
