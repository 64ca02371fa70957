//! N-dimensional polynomial trajectory interpolator
//!
//! Each goal is discretized into `round(duration / dt)` samples at the
//! moment it becomes active (when the previous goal's samples run out).
//! Samples are consumed strictly FIFO, one per control tick.

use std::collections::VecDeque;

use nalgebra::SVector;
use tracing::trace;

use super::{InterpolationError, InterpolationKind};
use crate::ticks;

/// Position, velocity and acceleration at one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample<const D: usize> {
    pub position: SVector<f64, D>,
    pub velocity: SVector<f64, D>,
    pub acceleration: SVector<f64, D>,
}

impl<const D: usize> Default for TrajectorySample<D> {
    fn default() -> Self {
        Self::at_rest(SVector::zeros())
    }
}

impl<const D: usize> TrajectorySample<D> {
    /// Sample with zero velocity and acceleration
    pub fn at_rest(position: SVector<f64, D>) -> Self {
        Self {
            position,
            velocity: SVector::zeros(),
            acceleration: SVector::zeros(),
        }
    }
}

/// Queued target state
///
/// Unset velocity and acceleration mean zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryGoal<const D: usize> {
    pub position: SVector<f64, D>,
    pub velocity: SVector<f64, D>,
    pub acceleration: SVector<f64, D>,
    /// Segment duration [s]
    pub duration: f64,
    pub kind: InterpolationKind,
}

impl<const D: usize> TrajectoryGoal<D> {
    pub fn new(position: SVector<f64, D>, duration: f64, kind: InterpolationKind) -> Self {
        Self {
            position,
            velocity: SVector::zeros(),
            acceleration: SVector::zeros(),
            duration,
            kind,
        }
    }

    pub fn with_velocity(mut self, velocity: SVector<f64, D>) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: SVector<f64, D>) -> Self {
        self.acceleration = acceleration;
        self
    }

    fn end_state(&self) -> TrajectorySample<D> {
        TrajectorySample {
            position: self.position,
            velocity: self.velocity,
            acceleration: self.acceleration,
        }
    }
}

/// Polynomial motion generator over `D` independent dimensions
///
/// # Example
/// ```
/// use nalgebra::Vector1;
/// use stride_core::interpolation::{Interpolator, InterpolationKind, TrajectoryGoal};
///
/// let mut inter = Interpolator::<1>::new(0.01);
/// inter.init(Vector1::new(0.0), None, None);
/// inter.set(TrajectoryGoal::new(Vector1::new(1.0), 0.5, InterpolationKind::Quintic)).unwrap();
///
/// let mut last = inter.get(true);
/// while !inter.is_empty() {
///     last = inter.get(true);
/// }
/// assert!((last.position[0] - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Interpolator<const D: usize> {
    dt: f64,
    /// Last emitted state (start of the next segment)
    start: TrajectorySample<D>,
    goals: VecDeque<TrajectoryGoal<D>>,
    samples: VecDeque<TrajectorySample<D>>,
}

impl<const D: usize> Interpolator<D> {
    /// Create an interpolator with tick period `dt` [s], resting at the origin
    pub fn new(dt: f64) -> Self {
        debug_assert!(dt > 0.0, "tick period must be positive");
        Self {
            dt,
            start: TrajectorySample::default(),
            goals: VecDeque::new(),
            samples: VecDeque::new(),
        }
    }

    /// Reset the start state; unset velocity/acceleration are zero
    pub fn init(
        &mut self,
        position: SVector<f64, D>,
        velocity: Option<SVector<f64, D>>,
        acceleration: Option<SVector<f64, D>>,
    ) {
        self.start = TrajectorySample {
            position,
            velocity: velocity.unwrap_or_else(SVector::zeros),
            acceleration: acceleration.unwrap_or_else(SVector::zeros),
        };
    }

    /// Queue a goal
    ///
    /// If no samples are pending the goal is expanded immediately. A rejected
    /// goal leaves the interpolator untouched.
    pub fn set(&mut self, goal: TrajectoryGoal<D>) -> Result<(), InterpolationError> {
        self.validate(&goal)?;

        self.goals.push_back(goal);
        if self.samples.is_empty() {
            self.calc();
        }
        Ok(())
    }

    /// Queue a position-only goal (zero end velocity and acceleration)
    pub fn set_position(
        &mut self,
        position: SVector<f64, D>,
        duration: f64,
        kind: InterpolationKind,
    ) -> Result<(), InterpolationError> {
        self.set(TrajectoryGoal::new(position, duration, kind))
    }

    /// Current sample, advancing one tick if `pop` is set
    ///
    /// With no pending samples the last known state is returned; check
    /// [`Interpolator::is_empty`] to tell the two apart.
    pub fn get(&mut self, pop: bool) -> TrajectorySample<D> {
        if let Some(front) = self.samples.front() {
            self.start = *front;

            if pop {
                self.samples.pop_front();
                if self.samples.is_empty() {
                    self.calc();
                }
            }
        }
        self.start
    }

    /// Advance one tick without reading the sample
    pub fn pop(&mut self) {
        if let Some(front) = self.samples.pop_front() {
            self.start = front;
            if self.samples.is_empty() {
                self.calc();
            }
        }
    }

    /// Drop all pending samples and queued goals
    pub fn clear(&mut self) {
        self.samples.clear();
        self.goals.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.samples.is_empty()
    }

    /// Number of pending samples of the active goal
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Time [s] until every queued goal is consumed
    pub fn remaining_time(&self) -> f64 {
        self.remaining_time_to_first_goal() + self.goals.iter().map(|g| g.duration).sum::<f64>()
    }

    /// Time [s] until the active goal is reached
    pub fn remaining_time_to_first_goal(&self) -> f64 {
        self.dt * self.samples.len() as f64
    }

    pub fn dimension(&self) -> usize {
        D
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Last emitted (or initial) state
    pub fn start(&self) -> &TrajectorySample<D> {
        &self.start
    }

    /// Check a goal against this interpolator's tick period without queueing it
    pub fn validate(&self, goal: &TrajectoryGoal<D>) -> Result<(), InterpolationError> {
        if !goal.duration.is_finite() || goal.duration < 0.0 {
            return Err(InterpolationError::InvalidDuration(goal.duration));
        }

        if let InterpolationKind::QuarticLinear { blend } = goal.kind {
            let n3 = ticks(goal.duration, self.dt);
            let n1 = ticks(2.0 * blend, self.dt);
            if n3 > 0 && (n1 == 0 || 2 * n1 >= n3) {
                return Err(InterpolationError::InfeasibleBlend {
                    duration: goal.duration,
                    blend,
                });
            }
        }
        Ok(())
    }

    /// Expand the next queued goal into samples
    ///
    /// Goals shorter than half a tick are applied instantly.
    fn calc(&mut self) {
        while let Some(goal) = self.goals.pop_front() {
            let num = ticks(goal.duration, self.dt);
            if num == 0 {
                self.start = goal.end_state();
                continue;
            }

            trace!(kind = ?goal.kind, ticks = num, "expanding trajectory goal");
            match goal.kind {
                InterpolationKind::Linear => self.linear(&goal, num),
                InterpolationKind::Cubic => {
                    let coeffs = cubic_coefficients(&self.start, &goal, num as f64 * self.dt);
                    self.polynomial(&coeffs, num);
                }
                InterpolationKind::Quintic | InterpolationKind::HoffArbib => {
                    let coeffs = quintic_coefficients(&self.start, &goal, num as f64 * self.dt);
                    self.polynomial(&coeffs, num);
                }
                InterpolationKind::QuarticLinear { blend } => self.quartic_linear(&goal, num, blend),
            }
            return;
        }
    }

    fn linear(&mut self, goal: &TrajectoryGoal<D>, num: usize) {
        let time = num as f64 * self.dt;
        let velocity = (goal.position - self.start.position) / time;

        for i in 1..=num {
            let tt = i as f64 * self.dt;
            self.samples.push_back(TrajectorySample {
                position: self.start.position + velocity * tt,
                velocity,
                acceleration: SVector::zeros(),
            });
        }
    }

    fn polynomial(&mut self, a: &[SVector<f64, D>; 6], num: usize) {
        for i in 1..=num {
            let tt = i as f64 * self.dt;
            let position = a[0] + (a[1] + (a[2] + (a[3] + (a[4] + a[5] * tt) * tt) * tt) * tt) * tt;
            let velocity = a[1] + (a[2] * 2.0 + (a[3] * 3.0 + (a[4] * 4.0 + a[5] * (5.0 * tt)) * tt) * tt) * tt;
            let acceleration = a[2] * 2.0 + (a[3] * 6.0 + (a[4] * 12.0 + a[5] * (20.0 * tt)) * tt) * tt;

            self.samples.push_back(TrajectorySample {
                position,
                velocity,
                acceleration,
            });
        }
    }

    /// Quartic ease-in over [0, 2δ], cruise at velocity m, quartic ease-out over [T-2δ, T]
    ///
    /// ```text
    /// m = (x_g - x_s - δ (v_s + v_g)) / (T - 2δ)
    /// x(t) = x_s + v_s t + (m - v_s) / (16 δ³) · t³ (4δ - t)          t ∈ [0, 2δ]
    /// x(t) = x_s + v_s δ + m (t - δ)                                  t ∈ [2δ, T-2δ]
    /// x(t) = x_g - v_g s - (m - v_g) / (16 δ³) · s³ (4δ - s),  s = T-t  t ∈ [T-2δ, T]
    /// ```
    fn quartic_linear(&mut self, goal: &TrajectoryGoal<D>, n3: usize, blend: f64) {
        let n1 = ticks(2.0 * blend, self.dt);
        let n2 = n3 - n1;

        let time = n3 as f64 * self.dt;
        let delta = n1 as f64 * self.dt * 0.5;
        let sx = self.start.position;
        let sv = self.start.velocity;
        let gx = goal.position;
        let gv = goal.velocity;

        let m = (gx - sx - (sv + gv) * delta) / (time - 2.0 * delta);
        let k_in = (m - sv) / (16.0 * delta.powi(3));
        let k_out = (m - gv) / (16.0 * delta.powi(3));

        for count in 1..=n3 {
            let tt = count as f64 * self.dt;

            let sample = if count < n1 {
                TrajectorySample {
                    position: sx + sv * tt + k_in * (tt.powi(3) * (4.0 * delta - tt)),
                    velocity: sv + k_in * (tt.powi(2) * (12.0 * delta - 4.0 * tt)),
                    acceleration: k_in * (tt * (24.0 * delta - 12.0 * tt)),
                }
            } else if count < n2 {
                TrajectorySample {
                    position: sx + sv * delta + m * (tt - delta),
                    velocity: m,
                    acceleration: SVector::zeros(),
                }
            } else {
                let s = time - tt;
                TrajectorySample {
                    position: gx - gv * s - k_out * (s.powi(3) * (4.0 * delta - s)),
                    velocity: gv + k_out * (s.powi(2) * (12.0 * delta - 4.0 * s)),
                    acceleration: k_out * (s * (-24.0 * delta + 12.0 * s)),
                }
            };
            self.samples.push_back(sample);
        }
    }
}

/// Hermite cubic: x(t) = a0 + a1 t + a2 t² + a3 t³
fn cubic_coefficients<const D: usize>(
    start: &TrajectorySample<D>,
    goal: &TrajectoryGoal<D>,
    time: f64,
) -> [SVector<f64, D>; 6] {
    let (sx, sv) = (start.position, start.velocity);
    let (gx, gv) = (goal.position, goal.velocity);

    [
        sx,
        sv,
        ((gx - sx) * 3.0 / time - sv * 2.0 - gv) / time,
        ((sx - gx) * 2.0 / time + sv + gv) / (time * time),
        SVector::zeros(),
        SVector::zeros(),
    ]
}

/// Quintic matching position, velocity and acceleration at both ends
///
/// Written in the Hoff-Arbib form:
/// ```text
/// A = (x_g - (x_s + v_s T + a_s T²/2)) / T³
/// B = (v_g - (v_s + a_s T)) / T²
/// C = (a_g - a_s) / T
/// a3 = 10A - 4B + C/2,  a4 = (-15A + 7B - C) / T,  a5 = (6A - 3B + C/2) / T²
/// ```
fn quintic_coefficients<const D: usize>(
    start: &TrajectorySample<D>,
    goal: &TrajectoryGoal<D>,
    time: f64,
) -> [SVector<f64, D>; 6] {
    let (sx, sv, sa) = (start.position, start.velocity, start.acceleration);
    let (gx, gv, ga) = (goal.position, goal.velocity, goal.acceleration);

    let a = (gx - (sx + sv * time + sa * (0.5 * time * time))) / time.powi(3);
    let b = (gv - (sv + sa * time)) / (time * time);
    let c = (ga - sa) / time;

    [
        sx,
        sv,
        sa * 0.5,
        a * 10.0 - b * 4.0 + c * 0.5,
        (a * -15.0 + b * 7.0 - c) / time,
        (a * 6.0 - b * 3.0 + c * 0.5) / (time * time),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    const DT: f64 = 0.01;

    fn drain<const D: usize>(inter: &mut Interpolator<D>) -> Vec<TrajectorySample<D>> {
        let mut out = Vec::new();
        while !inter.is_empty() {
            out.push(inter.get(true));
        }
        out
    }

    #[test]
    fn test_linear_constant_velocity() {
        let mut inter = Interpolator::<2>::new(DT);
        inter.init(Vector2::new(0.0, 1.0), None, None);
        inter.set_position(Vector2::new(1.0, -1.0), 0.5, InterpolationKind::Linear).unwrap();

        let samples = drain(&mut inter);
        assert_eq!(samples.len(), 50);
        for s in &samples {
            assert_relative_eq!(s.velocity, Vector2::new(2.0, -4.0), epsilon = 1e-9);
            assert_relative_eq!(s.acceleration, Vector2::zeros());
        }
        assert_relative_eq!(samples[49].position, Vector2::new(1.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_cubic_matches_end_velocity() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.init(Vector1::new(0.0), Some(Vector1::new(0.5)), None);
        inter
            .set(TrajectoryGoal::new(Vector1::new(2.0), 1.0, InterpolationKind::Cubic).with_velocity(Vector1::new(-1.0)))
            .unwrap();

        let samples = drain(&mut inter);
        let last = samples.last().unwrap();
        assert_eq!(samples.len(), 100);
        assert_relative_eq!(last.position[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(last.velocity[0], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quintic_matches_end_state() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.init(Vector1::new(1.0), Some(Vector1::new(0.2)), Some(Vector1::new(-0.3)));
        inter
            .set(
                TrajectoryGoal::new(Vector1::new(-1.0), 0.8, InterpolationKind::Quintic)
                    .with_velocity(Vector1::new(0.4))
                    .with_acceleration(Vector1::new(1.5)),
            )
            .unwrap();

        let samples = drain(&mut inter);
        let last = samples.last().unwrap();
        assert_eq!(samples.len(), 80);
        assert_relative_eq!(last.position[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(last.velocity[0], 0.4, epsilon = 1e-9);
        assert_relative_eq!(last.acceleration[0], 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_hoff_arbib_equals_quintic() {
        let goal = |kind| TrajectoryGoal::new(Vector1::new(3.0), 0.6, kind).with_velocity(Vector1::new(1.0));

        let mut a = Interpolator::<1>::new(DT);
        let mut b = Interpolator::<1>::new(DT);
        a.set(goal(InterpolationKind::Quintic)).unwrap();
        b.set(goal(InterpolationKind::HoffArbib)).unwrap();

        for (sa, sb) in drain(&mut a).iter().zip(drain(&mut b).iter()) {
            assert_relative_eq!(sa.position, sb.position, epsilon = 1e-12);
            assert_relative_eq!(sa.velocity, sb.velocity, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_quartic_linear_rejects_overlapping_blend() {
        let mut inter = Interpolator::<1>::new(DT);
        let result = inter.set_position(Vector1::new(1.0), 1.0, InterpolationKind::QuarticLinear { blend: 0.25 });

        assert!(matches!(result, Err(InterpolationError::InfeasibleBlend { .. })));
        assert!(inter.is_empty());
    }

    #[test]
    fn test_quartic_linear_reaches_goal() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.set_position(Vector1::new(10.0), 10.0, InterpolationKind::QuarticLinear { blend: 2.0 }).unwrap();

        let samples = drain(&mut inter);
        let last = samples.last().unwrap();
        assert_eq!(samples.len(), 1000);
        assert_relative_eq!(last.position[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(last.velocity[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_returns_last_state() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.init(Vector1::new(0.7), None, None);

        assert!(inter.is_empty());
        assert_relative_eq!(inter.get(true).position[0], 0.7);
    }

    #[test]
    fn test_peek_is_idempotent() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.set_position(Vector1::new(1.0), 0.3, InterpolationKind::Cubic).unwrap();
        inter.get(true);

        let a = inter.get(false);
        let b = inter.get(false);
        assert_eq!(a, b);
        assert_eq!(inter.len(), 29);
    }

    #[test]
    fn test_queued_goals_chain() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.set_position(Vector1::new(1.0), 0.2, InterpolationKind::Linear).unwrap();
        inter.set_position(Vector1::new(3.0), 0.3, InterpolationKind::Cubic).unwrap();

        assert_relative_eq!(inter.remaining_time(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(inter.remaining_time_to_first_goal(), 0.2, epsilon = 1e-12);

        let samples = drain(&mut inter);
        assert_eq!(samples.len(), 50);
        assert_relative_eq!(samples[19].position[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(samples[49].position[0], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pop_activates_next_goal() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.set_position(Vector1::new(1.0), 0.1, InterpolationKind::Linear).unwrap();
        inter.set_position(Vector1::new(2.0), 0.1, InterpolationKind::Linear).unwrap();

        for _ in 0..10 {
            inter.pop();
        }
        assert_eq!(inter.len(), 10);
        assert_relative_eq!(inter.remaining_time(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(inter.get(false).position[0], 1.1, epsilon = 1e-9);

        for _ in 0..9 {
            inter.pop();
        }
        let last = inter.get(true);
        assert_relative_eq!(last.position[0], 2.0, epsilon = 1e-9);
        assert!(inter.is_empty());
    }

    #[test]
    fn test_zero_duration_jumps() {
        let mut inter = Interpolator::<1>::new(DT);
        inter.set_position(Vector1::new(4.0), 0.0, InterpolationKind::Quintic).unwrap();

        assert!(inter.is_empty());
        assert_relative_eq!(inter.get(true).position[0], 4.0);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut inter = Interpolator::<1>::new(DT);
        let result = inter.set_position(Vector1::new(4.0), -0.1, InterpolationKind::Linear);
        assert_eq!(result, Err(InterpolationError::InvalidDuration(-0.1)));
    }
}
