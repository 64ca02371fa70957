//! Tick-based interpolators
//!
//! Goals are queued FIFO and expanded into one sample per control tick when
//! they become active. Reading from an empty interpolator is not an error:
//! the last known state is returned so callers can sample at a fixed rate
//! while idle.
//!
//! - [`trajectory`]: N-dimensional polynomial position/velocity/acceleration
//! - [`orientation`]: rotation blending driven by a scalar progress profile

pub mod trajectory;
pub mod orientation;

pub use trajectory::*;
pub use orientation::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interpolation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("Quartic-linear blend {blend}s does not fit in a {duration}s segment")]
    InfeasibleBlend { duration: f64, blend: f64 },
    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),
}

/// Polynomial profile used to move from the start state to a goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InterpolationKind {
    /// Constant velocity; goal velocity and acceleration are ignored
    Linear,
    /// Hermite cubic matching position and velocity at both ends
    Cubic,
    /// Degree-5 polynomial matching position, velocity and acceleration
    Quintic,
    /// Hoff-Arbib minimum-jerk form; same polynomial as [`InterpolationKind::Quintic`]
    HoffArbib,
    /// Quartic ease-in, linear cruise, quartic ease-out ("4-1-4")
    ///
    /// `blend` is the half-width [s] of each ease segment.
    QuarticLinear { blend: f64 },
}

impl Default for InterpolationKind {
    fn default() -> Self {
        InterpolationKind::Linear
    }
}
