//! Capture point engine
//!
//! Linear inverted pendulum (LIPM) references for one transition at a time.
//! For a constant ZMP `p` the capture point `ξ` and CoM `c` evolve as
//!
//! ```text
//! ξ(t) = p + e^{ωt} (ξ₀ - p)
//! ċ    = -ω (c - ξ)              ω = √(g / h)
//! ```
//!
//! so a transition `ξ₀ → ξ_g` over `T` is produced by the single ZMP
//!
//! ```text
//! p = ξ_g / (1 - b) - b ξ₀ / (1 - b),   b = e^{ωT}
//! ```
//!
//! Samples are generated by applying the exact exponential solution once
//! per tick, so the last capture point lands on the goal without drift.

use std::collections::VecDeque;

use nalgebra::{Vector1, Vector3};
use stride_core::interpolation::{InterpolationKind, Interpolator};
use stride_core::{ticks, GRAVITY};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapturePointError {
    #[error("Degenerate capture point duration: {0}s")]
    DegenerateDuration(f64),
    #[error("CoM height must be positive, got {0}m")]
    NonPositiveComHeight(f64),
}

/// ZMP, CoM and capture point at one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePointSample {
    pub zmp: Vector3<f64>,
    pub com: Vector3<f64>,
    pub cp: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct CapturePoint {
    dt: f64,
    gravity: f64,
    /// CoM height above the ground [m]
    com_height: f64,
    /// Lateral capture point bias [m]
    offset: f64,

    start_com: Vector3<f64>,
    start_cp: Vector3<f64>,
    goal_com: Vector3<f64>,
    goal_cp: Vector3<f64>,
    zmp: Vector3<f64>,

    /// (CoM, CP) per tick
    samples: VecDeque<(Vector3<f64>, Vector3<f64>)>,
}

impl CapturePoint {
    pub fn new(dt: f64) -> Self {
        Self::with_gravity(dt, GRAVITY)
    }

    pub fn with_gravity(dt: f64, gravity: f64) -> Self {
        Self {
            dt,
            gravity,
            com_height: 1.0,
            offset: 0.0,
            start_com: Vector3::zeros(),
            start_cp: Vector3::zeros(),
            goal_com: Vector3::zeros(),
            goal_cp: Vector3::zeros(),
            zmp: Vector3::zeros(),
            samples: VecDeque::new(),
        }
    }

    /// Reset to rest at `com` with the capture point `cp` on the ground
    ///
    /// `cp.z` is the ground height; the CoM height becomes `com.z - cp.z`.
    pub fn init(&mut self, com: Vector3<f64>, cp: Vector3<f64>) -> Result<(), CapturePointError> {
        let com_height = com.z - cp.z;
        if !(com_height > 0.0) {
            return Err(CapturePointError::NonPositiveComHeight(com_height));
        }

        self.start_com = com;
        self.start_cp = cp;
        self.goal_com = com;
        self.goal_cp = cp;
        self.zmp = Vector3::new(com.x, com.y, cp.z);
        self.com_height = com_height;
        self.samples.clear();
        Ok(())
    }

    /// LIPM natural frequency for a transition between two CoM heights
    ///
    /// ```text
    /// ω = √(g / ((h₀ + h₁) / 2))
    /// ```
    pub fn natural_frequency(&self, from_height: f64, to_height: f64) -> Result<f64, CapturePointError> {
        let mid = (from_height + to_height) / 2.0;
        if !(mid > 0.0) {
            return Err(CapturePointError::NonPositiveComHeight(mid));
        }
        Ok((self.gravity / mid).sqrt())
    }

    /// `b = e^{ωT}` for a transition to `com_height`, with `T` rounded to whole ticks
    fn growth(&self, duration: f64, com_height: f64) -> Result<(f64, f64), CapturePointError> {
        let num = ticks(duration, self.dt);
        if num == 0 {
            return Err(CapturePointError::DegenerateDuration(duration));
        }
        let omega = self.natural_frequency(self.com_height, com_height)?;
        Ok((omega, (omega * num as f64 * self.dt).exp()))
    }

    /// Queue the transition from the current capture point to `goal_cp`
    ///
    /// The ZMP is held constant on the current ground height (`start_cp.z`)
    /// while the CoM height follows a cubic from its start value to
    /// `goal_cp.z + goal_com_height`. Any pending samples are replaced.
    ///
    /// # Arguments
    /// * `goal_cp` - Capture point at the end of the transition
    /// * `duration` - Transition duration [s]
    /// * `goal_com_height` - CoM height above `goal_cp.z` at the end [m]
    pub fn set(&mut self, goal_cp: Vector3<f64>, duration: f64, goal_com_height: f64) -> Result<(), CapturePointError> {
        if !(goal_com_height > 0.0) {
            return Err(CapturePointError::NonPositiveComHeight(goal_com_height));
        }

        let ground = self.start_cp.z;
        let start_height = self.start_com.z - ground;
        let goal_com_z = goal_cp.z + goal_com_height;

        let num = ticks(duration, self.dt);
        if num == 0 {
            return Err(CapturePointError::DegenerateDuration(duration));
        }
        let omega = self.natural_frequency(start_height, goal_com_z - ground)?;
        let b = (omega * num as f64 * self.dt).exp();
        let wdt = omega * self.dt;

        let mut zmp = goal_cp / (1.0 - b) - self.start_cp * (b / (1.0 - b));
        zmp.z = ground;

        let mut com_z = Interpolator::<1>::new(self.dt);
        com_z.init(Vector1::new(self.start_com.z), None, None);
        com_z
            .set_position(Vector1::new(goal_com_z), num as f64 * self.dt, InterpolationKind::Cubic)
            .map_err(|_| CapturePointError::DegenerateDuration(duration))?;

        self.samples.clear();
        let mut com = self.start_com;
        let mut cp = self.start_cp;
        while !com_z.is_empty() {
            let z = com_z.get(true).position[0];

            cp = zmp + (cp - zmp) * wdt.exp();
            com = cp + (com - cp) * (-wdt).exp();
            cp.z = ground;
            com.z = z;

            self.samples.push_back((com, cp));
        }

        self.zmp = zmp;
        if let Some(&(com, cp)) = self.samples.back() {
            self.goal_com = com;
            self.goal_cp = cp;
        }
        self.com_height = goal_com_height;

        debug!(
            ticks = num,
            omega,
            zmp_x = zmp.x,
            zmp_y = zmp.y,
            "capture point transition queued"
        );
        Ok(())
    }

    /// Hold the capture point where it is while the CoM settles onto it
    ///
    /// The ZMP coincides with the capture point, so the capture point stays
    /// fixed and the horizontal CoM converges exponentially to it. Returns
    /// `false` when `duration` rounds to zero ticks.
    pub fn stop(&mut self, duration: f64) -> bool {
        let num = ticks(duration, self.dt);
        if num == 0 {
            return false;
        }

        let ground = self.start_cp.z;
        let decay = (-(self.gravity / self.com_height).sqrt() * self.dt).exp();

        let mut zmp = self.start_cp;
        zmp.z = ground;

        self.samples.clear();
        let cp = zmp;
        let mut com = self.start_com;
        for _ in 0..num {
            let z = com.z;
            com = cp + (com - cp) * decay;
            com.z = z;
            self.samples.push_back((com, cp));
        }

        self.zmp = zmp;
        self.goal_com = com;
        self.goal_cp = cp;

        debug!(ticks = num, "capture point hold queued");
        true
    }

    /// Current references, advancing one tick if `pop` is set
    ///
    /// With no pending samples the start state is returned.
    pub fn get(&mut self, pop: bool) -> CapturePointSample {
        let Some(&(com, cp)) = self.samples.front() else {
            return CapturePointSample {
                zmp: self.zmp,
                com: self.start_com,
                cp: self.start_cp,
            };
        };

        if pop {
            self.samples.pop_front();
            if self.samples.is_empty() {
                self.start_com = self.goal_com;
                self.start_cp = self.goal_cp;
            }
        }

        CapturePointSample { zmp: self.zmp, com, cp }
    }

    /// Constant ZMP that carries `start_cp` to `goal_cp` in `duration`
    ///
    /// Does not modify the engine.
    pub fn expected_zmp(
        &self,
        start_cp: &Vector3<f64>,
        goal_cp: &Vector3<f64>,
        duration: f64,
        com_height: f64,
    ) -> Result<Vector3<f64>, CapturePointError> {
        let (_, b) = self.growth(duration, com_height)?;
        Ok(goal_cp / (1.0 - b) - start_cp * (b / (1.0 - b)))
    }

    /// Capture point to aim for so the CoM averages `velocity` over the next step
    ///
    /// ```text
    /// ξ = foot + offset · direction + v T / (b - 1)
    /// ```
    ///
    /// # Arguments
    /// * `foot` - Placement of the foot that will support next
    /// * `offset_direction` - Unit direction of the lateral bias
    /// * `velocity` - Desired average CoM velocity [m/s]
    /// * `duration` - Step duration [s]
    /// * `com_height` - CoM height at the end of the step [m]
    pub fn calc_next_capture_point(
        &self,
        foot: &Vector3<f64>,
        offset_direction: &Vector3<f64>,
        velocity: &Vector3<f64>,
        duration: f64,
        com_height: f64,
    ) -> Result<Vector3<f64>, CapturePointError> {
        let (_, b) = self.growth(duration, com_height)?;
        Ok(foot + offset_direction * self.offset + velocity * (duration / (b - 1.0)))
    }

    /// Derive and store the lateral bias for alternating steps `distance` apart
    ///
    /// ```text
    /// offset = |distance| / (b - 1)
    /// ```
    pub fn calc_default_offset(
        &mut self,
        distance: f64,
        duration: f64,
        com_height: f64,
    ) -> Result<f64, CapturePointError> {
        let (_, b) = self.growth(duration, com_height)?;
        self.offset = distance.abs() / (b - 1.0);
        Ok(self.offset)
    }

    pub fn set_default_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn com_height(&self) -> f64 {
        self.com_height
    }

    pub fn zmp(&self) -> &Vector3<f64> {
        &self.zmp
    }

    pub fn start_com(&self) -> &Vector3<f64> {
        &self.start_com
    }

    pub fn start_cp(&self) -> &Vector3<f64> {
        &self.start_cp
    }

    pub fn goal_com(&self) -> &Vector3<f64> {
        &self.goal_com
    }

    pub fn goal_cp(&self) -> &Vector3<f64> {
        &self.goal_cp
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn remaining_time(&self) -> f64 {
        self.samples.len() as f64 * self.dt
    }

    /// Drop pending samples, keeping the start state
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 0.005;

    fn engine() -> CapturePoint {
        let mut cp = CapturePoint::new(DT);
        cp.init(Vector3::new(0.0, 0.0, 0.8), Vector3::zeros()).unwrap();
        cp
    }

    fn drain(cp: &mut CapturePoint) -> Vec<CapturePointSample> {
        let mut out = Vec::new();
        while !cp.is_empty() {
            out.push(cp.get(true));
        }
        out
    }

    #[test]
    fn test_init_sets_height_and_zmp() {
        let mut cp = CapturePoint::new(DT);
        cp.init(Vector3::new(0.1, 0.2, 0.9), Vector3::new(0.1, 0.2, 0.1)).unwrap();

        assert_relative_eq!(cp.com_height(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(*cp.zmp(), Vector3::new(0.1, 0.2, 0.1));
        assert!(cp.is_empty());
    }

    #[test]
    fn test_init_rejects_com_below_ground() {
        let mut cp = CapturePoint::new(DT);
        let result = cp.init(Vector3::new(0.0, 0.0, 0.1), Vector3::new(0.0, 0.0, 0.2));
        assert!(matches!(result, Err(CapturePointError::NonPositiveComHeight(_))));
    }

    #[test]
    fn test_transition_lands_on_goal() {
        let mut cp = engine();
        let goal = Vector3::new(0.2, -0.05, 0.0);
        cp.set(goal, 0.8, 0.75).unwrap();

        let samples = drain(&mut cp);
        let last = samples.last().unwrap();
        assert_eq!(samples.len(), 160);
        assert_relative_eq!(last.cp, goal, epsilon = 1e-9);
        assert_relative_eq!(last.com.z, 0.75, epsilon = 1e-9);
        assert_relative_eq!(cp.com_height(), 0.75);

        // Start state follows the last sample
        assert_relative_eq!(*cp.start_cp(), goal, epsilon = 1e-9);
        assert_relative_eq!(cp.get(true).com, last.com);
    }

    #[test]
    fn test_zmp_stays_on_ground() {
        let mut cp = CapturePoint::new(DT);
        cp.init(Vector3::new(0.0, 0.0, 0.9), Vector3::new(0.0, 0.0, 0.1)).unwrap();
        cp.set(Vector3::new(0.1, 0.0, 0.1), 0.5, 0.8).unwrap();

        for s in drain(&mut cp) {
            assert_relative_eq!(s.zmp.z, 0.1);
            assert_relative_eq!(s.cp.z, 0.1);
        }
    }

    #[test]
    fn test_degenerate_duration() {
        let mut cp = engine();
        assert_eq!(
            cp.set(Vector3::new(0.1, 0.0, 0.0), 0.0, 0.8),
            Err(CapturePointError::DegenerateDuration(0.0))
        );
        assert!(matches!(
            cp.calc_default_offset(0.19, 0.001, 0.8),
            Err(CapturePointError::DegenerateDuration(_))
        ));
        assert!(cp.is_empty());
    }

    #[test]
    fn test_expected_zmp_matches_set() {
        let mut cp = engine();
        let goal = Vector3::new(0.15, 0.05, 0.0);
        let expected = cp.expected_zmp(&Vector3::zeros(), &goal, 0.6, 0.8).unwrap();

        cp.set(goal, 0.6, 0.8).unwrap();
        assert_relative_eq!(cp.zmp().xy(), expected.xy(), epsilon = 1e-12);
    }

    #[test]
    fn test_default_offset() {
        let mut cp = engine();
        let omega = cp.natural_frequency(0.8, 0.8).unwrap();
        let offset = cp.calc_default_offset(-0.19, 0.8, 0.8).unwrap();

        assert_relative_eq!(offset, 0.19 / ((omega * 0.8).exp() - 1.0), epsilon = 1e-12);
        assert_relative_eq!(cp.offset(), offset);
    }

    #[test]
    fn test_next_capture_point() {
        let mut cp = engine();
        cp.set_default_offset(0.02);

        let omega = cp.natural_frequency(0.8, 0.8).unwrap();
        let b = (omega * 0.8).exp();
        let next = cp
            .calc_next_capture_point(
                &Vector3::new(0.3, 0.1, 0.0),
                &Vector3::new(0.0, -1.0, 0.0),
                &Vector3::new(0.2, 0.0, 0.0),
                0.8,
                0.8,
            )
            .unwrap();

        assert_relative_eq!(next, Vector3::new(0.3 + 0.16 / (b - 1.0), 0.08, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_stop_holds_capture_point() {
        let mut cp = engine();
        cp.set(Vector3::new(0.1, 0.0, 0.0), 0.4, 0.8).unwrap();
        drain(&mut cp);
        let held = *cp.start_cp();

        assert!(cp.stop(1.0));
        let samples = drain(&mut cp);
        assert_eq!(samples.len(), 200);
        for s in &samples {
            assert_relative_eq!(s.cp, held);
            assert_relative_eq!(s.zmp, held);
        }

        let last = samples.last().unwrap();
        assert!((last.com.x - held.x).abs() < 5e-3);
        assert_relative_eq!(last.com.z, 0.8, epsilon = 1e-9);
        assert!(!cp.stop(0.0));
    }

    #[test]
    fn test_peek_is_idempotent() {
        let mut cp = engine();
        cp.set(Vector3::new(0.1, 0.0, 0.0), 0.4, 0.8).unwrap();
        cp.get(true);

        let a = cp.get(false);
        assert_eq!(cp.get(false), a);
        assert_eq!(cp.len(), 79);
    }
}
