//! Mathematical utilities for stride
//!
//! Implements rigid poses, quaternion interpolation, SO(3) rotation
//! utilities and plane geometry used by the support-polygon tests.

pub mod pose;
pub mod quaternion;
pub mod rotation;
pub mod geometry;

pub use pose::*;
pub use quaternion::*;
pub use rotation::*;
pub use geometry::*;
