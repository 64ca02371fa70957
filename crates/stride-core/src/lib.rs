//! # Stride Core
//!
//! Numeric foundation for the stride biped walking pattern generator.
//!
//! This library provides the fixed-size math types, rigid-body helpers and
//! tick-based trajectory interpolators that the walking generator advances
//! once per control period.
//!
//! ## Modules
//!
//! - [`math`]: Mathematical utilities (poses, quaternions, rotations, planes)
//! - [`interpolation`]: Polynomial trajectory and orientation interpolators

pub mod math;
pub mod interpolation;

/// Standard gravity [m/s²]
pub const GRAVITY: f64 = 9.80665;

/// Convert a duration into a number of control ticks of length `dt`.
///
/// Rounds to the nearest tick so that `0.6 / 0.01` does not truncate to 59.
/// Negative or non-finite durations yield zero ticks.
pub fn ticks(duration: f64, dt: f64) -> usize {
    if !(duration.is_finite() && dt > 0.0) || duration <= 0.0 {
        return 0;
    }
    ((duration + 0.5 * dt) / dt).floor() as usize
}
