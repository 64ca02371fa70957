//! Step sequencer
//!
//! Emits synchronized foot poses for one step at a time. A step of
//! `remain` ticks is split by two thresholds `n1 ≥ n2`:
//!
//! ```text
//! remain:  total ........ n1 ........ n2 ........ 0
//! phase:   double (start)  | single (swing) | double (goal)
//! ```
//!
//! The swing foot follows either a cycloid or polynomial position profile
//! with a two-axis orientation blend.

use std::collections::VecDeque;
use std::f64::consts::PI;

use nalgebra::{Vector1, Vector2, Vector3};
use stride_core::interpolation::{
    InterpolationError, InterpolationKind, Interpolator, OrientationInterpolator, RotationKind,
};
use stride_core::math::Pose;
use stride_core::ticks;
use thiserror::Error;
use tracing::{debug, warn};

use crate::step::{FootType, StepData, StepType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("Step timing leaves no single support phase (single {single_support}s, double {double_support}s)")]
    InfeasibleTiming { single_support: f64, double_support: f64 },
    #[error("Swing interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Fraction of the swing spent rising to the apex in polynomial steps
const APEX_RATIO: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct StepSequence {
    dt: f64,
    step_height: f64,

    remain: usize,
    n1: usize,
    n2: usize,
    total: usize,

    support: FootType,
    step_type: StepType,
    single_support_time: f64,
    double_support_time: f64,

    start_rfoot: Pose,
    start_lfoot: Pose,
    goal_rfoot: Pose,
    goal_lfoot: Pose,

    swing_path: VecDeque<Vector3<f64>>,
    swing_rot: OrientationInterpolator,
}

impl StepSequence {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            step_height: 0.05,
            remain: 0,
            n1: 0,
            n2: 0,
            total: 0,
            support: FootType::Double,
            step_type: StepType::Wait,
            single_support_time: 0.0,
            double_support_time: 0.0,
            start_rfoot: Pose::identity(),
            start_lfoot: Pose::identity(),
            goal_rfoot: Pose::identity(),
            goal_lfoot: Pose::identity(),
            swing_path: VecDeque::new(),
            swing_rot: OrientationInterpolator::new(dt),
        }
    }

    /// Place both feet; any step in progress is dropped
    pub fn init(&mut self, rfoot: Pose, lfoot: Pose) {
        self.start_rfoot = rfoot;
        self.start_lfoot = lfoot;
        self.goal_rfoot = rfoot;
        self.goal_lfoot = lfoot;
        self.remain = 0;
        self.support = FootType::Double;
        self.swing_path.clear();
        self.swing_rot.clear();
    }

    pub fn set_step_height(&mut self, height: f64) {
        self.step_height = height;
    }

    pub fn step_height(&self) -> f64 {
        self.step_height
    }

    /// Stand in double support for `duration` without moving the feet
    pub fn set_wait(&mut self, duration: f64, step_type: StepType) {
        self.goal_rfoot = self.start_rfoot;
        self.goal_lfoot = self.start_lfoot;
        self.support = FootType::Double;
        self.step_type = step_type;

        self.remain = ticks(duration, self.dt);
        self.n1 = self.remain + 1;
        self.n2 = self.n1;
        self.total = self.remain;
        self.single_support_time = 0.0;
        self.double_support_time = self.remain as f64 * self.dt;

        self.swing_path.clear();
        self.swing_rot.clear();
    }

    /// Configure a full step toward `step`
    ///
    /// `step.support_foot` stays down and the other foot swings to its pose
    /// in `step`. A step whose support foot is neither `Right` nor `Left`
    /// cannot move a foot and degrades to a wait of the same duration.
    /// Rejected steps leave the sequencer untouched.
    pub fn set_step(&mut self, step: &StepData) -> Result<(), StepError> {
        let half_double = ticks(step.double_support_time / 2.0, self.dt);
        let single = ticks(step.single_support_time, self.dt);
        if single == 0 {
            return Err(StepError::InfeasibleTiming {
                single_support: step.single_support_time,
                double_support: step.double_support_time,
            });
        }

        let (swing_start, swing_goal, goal_rfoot, goal_lfoot) = match step.support_foot {
            FootType::Right => (self.start_lfoot, step.lfoot, self.start_rfoot, step.lfoot),
            FootType::Left => (self.start_rfoot, step.rfoot, step.rfoot, self.start_lfoot),
            other => {
                warn!(support = ?other, "cannot swing a foot without a single support foot, waiting instead");
                self.set_wait(step.duration(), step.step_type);
                return Ok(());
            }
        };

        let swing_time = single as f64 * self.dt;
        let (path, rot_kind) = match step.step_type.interpolation_kind() {
            Some(kind) => (self.polynomial_path(&swing_start.translation, &swing_goal.translation, single, kind)?, kind),
            None => (self.cycloid_path(&swing_start.translation, &swing_goal.translation, single), InterpolationKind::Cubic),
        };

        let mut swing_rot = OrientationInterpolator::new(self.dt);
        swing_rot.init(swing_start.rotation);
        swing_rot.set(swing_goal.rotation, swing_time, RotationKind::TwoAxis, rot_kind)?;

        self.n2 = half_double;
        self.n1 = half_double + single;
        self.remain = self.n1 + self.n2;
        self.total = self.remain;
        self.support = step.support_foot;
        self.step_type = step.step_type;
        self.single_support_time = swing_time;
        self.double_support_time = 2.0 * half_double as f64 * self.dt;
        self.goal_rfoot = goal_rfoot;
        self.goal_lfoot = goal_lfoot;
        self.swing_path = path;
        self.swing_rot = swing_rot;

        debug!(
            support = ?self.support,
            step_type = ?self.step_type,
            ticks = self.remain,
            "step queued"
        );
        Ok(())
    }

    /// Extend the final double support phase by `duration`
    ///
    /// An idle sequencer starts a wait of the same step type instead.
    pub fn wait(&mut self, duration: f64) {
        if self.remain == 0 {
            self.set_wait(duration, self.step_type);
            return;
        }

        let extra = ticks(duration, self.dt);
        self.remain += extra;
        self.n1 += extra;
        self.n2 += extra;
        self.total += extra;
        self.double_support_time += extra as f64 * self.dt;
    }

    /// Feet and support regime at the current tick, advancing if `pop` is set
    ///
    /// Only the foot fields, support foot, step type and timings are filled;
    /// the balance references are left at their defaults.
    pub fn get(&mut self, pop: bool) -> StepData {
        let mut out = self.template();

        if self.remain == 0 {
            out.rfoot = self.start_rfoot;
            out.lfoot = self.start_lfoot;
            return out;
        }

        let count = self.remain - 1;
        if count >= self.n1 {
            out.rfoot = self.start_rfoot;
            out.lfoot = self.start_lfoot;
        } else if count >= self.n2 {
            let position = match self.swing_path.front() {
                Some(p) => *p,
                None => self.swing_goal().translation,
            };
            if pop && self.swing_path.len() > 1 {
                self.swing_path.pop_front();
            }
            let swing = Pose::new(position, self.swing_rot.get(pop));

            match self.support {
                FootType::Right => {
                    out.rfoot = self.goal_rfoot;
                    out.lfoot = swing;
                }
                _ => {
                    out.rfoot = swing;
                    out.lfoot = self.goal_lfoot;
                }
            }
            out.support_foot = self.support;
        } else {
            out.rfoot = self.goal_rfoot;
            out.lfoot = self.goal_lfoot;
        }

        if pop {
            self.remain = count;
            if self.remain == 0 {
                self.start_rfoot = self.goal_rfoot;
                self.start_lfoot = self.goal_lfoot;
                self.swing_path.clear();
                self.swing_rot.clear();
            }
        }
        out
    }

    /// Feet at the end of the current step
    pub fn get_goal(&self) -> StepData {
        let mut out = self.template();
        out.rfoot = self.goal_rfoot;
        out.lfoot = self.goal_lfoot;
        out
    }

    /// Feet at the start of the current step
    pub fn get_start(&self) -> StepData {
        let mut out = self.template();
        out.rfoot = self.start_rfoot;
        out.lfoot = self.start_lfoot;
        out
    }

    /// Ground height under a foot, averaged over both feet for `Double`/`Airborne`
    pub fn ground_height(&self, foot: FootType) -> f64 {
        match foot {
            FootType::Right => self.start_rfoot.translation.z,
            FootType::Left => self.start_lfoot.translation.z,
            FootType::Double | FootType::Airborne => {
                (self.start_rfoot.translation.z + self.start_lfoot.translation.z) / 2.0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remain == 0
    }

    pub fn remaining_time(&self) -> f64 {
        self.remain as f64 * self.dt
    }

    /// Discretized duration of the current step [s]
    pub fn step_duration(&self) -> f64 {
        self.total as f64 * self.dt
    }

    pub fn support_foot(&self) -> FootType {
        self.support
    }

    fn template(&self) -> StepData {
        StepData {
            support_foot: FootType::Double,
            step_type: self.step_type,
            single_support_time: self.single_support_time,
            double_support_time: self.double_support_time,
            ..StepData::default()
        }
    }

    fn swing_goal(&self) -> &Pose {
        match self.support {
            FootType::Right => &self.goal_lfoot,
            _ => &self.goal_rfoot,
        }
    }

    /// Cycloid over `n` ticks
    ///
    /// ```text
    /// θ_i = 2π i / n
    /// p_i = start + (θ_i - sin θ_i) / 2π · (goal - start) + ẑ · h (1 - cos θ_i) / 2
    /// ```
    fn cycloid_path(&self, start: &Vector3<f64>, goal: &Vector3<f64>, n: usize) -> VecDeque<Vector3<f64>> {
        let dtheta = 2.0 * PI / n as f64;
        let dr = goal - start;

        let mut path: VecDeque<Vector3<f64>> = (1..n)
            .map(|i| {
                let theta = i as f64 * dtheta;
                let rate = (theta - theta.sin()) / (2.0 * PI);
                let mut p = start + dr * rate;
                p.z += self.step_height * 0.5 * (1.0 - theta.cos());
                p
            })
            .collect();
        path.push_back(*goal);
        path
    }

    /// Polynomial xy over `n` ticks; z rises to the apex then descends
    fn polynomial_path(
        &self,
        start: &Vector3<f64>,
        goal: &Vector3<f64>,
        n: usize,
        kind: InterpolationKind,
    ) -> Result<VecDeque<Vector3<f64>>, StepError> {
        let rise = (n as f64 * APEX_RATIO) as usize;
        let apex = start.z + self.step_height + (goal.z - start.z) * APEX_RATIO;

        let mut xy = Interpolator::<2>::new(self.dt);
        xy.init(Vector2::new(start.x, start.y), None, None);
        xy.set_position(Vector2::new(goal.x, goal.y), n as f64 * self.dt, kind)?;

        let mut z = Interpolator::<1>::new(self.dt);
        z.init(Vector1::new(start.z), None, None);
        z.set_position(Vector1::new(apex), rise as f64 * self.dt, kind)?;
        z.set_position(Vector1::new(goal.z), (n - rise) as f64 * self.dt, kind)?;

        Ok((0..n)
            .map(|_| {
                let p = xy.get(true).position;
                Vector3::new(p.x, p.y, z.get(true).position[0])
            })
            .collect())
    }
}
