//! Walk planner
//!
//! Holds the queue of step goals and advances the step sequencer and the
//! capture point engine as one unit, one sample per control tick. Before a
//! goal is expanded its reference ZMP is checked against the current support
//! polygon; when the regime it needs is not the one it declares, a
//! corrective double support transition is inserted first.

use std::collections::VecDeque;

use nalgebra::Vector3;
use stride_core::math::{rotation_angle, Axis, Pose};
use stride_core::ticks;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture_point::{CapturePoint, CapturePointError};
use crate::config::{ConfigError, FootSize, LateralOffset, WalkConfig};
use crate::robot::{BipedKinematics, FootSide};
use crate::step::{FootType, StepData, StepType};
use crate::step_sequence::{StepError, StepSequence};
use crate::support::support_foot_type;

/// Steps shorter than this [s] take the configured default timing
const MIN_STEP_DURATION: f64 = 0.1;

/// Translation [m] and rotation [rad] below which a foot is considered in place
const LIFT_POSITION_EPSILON: f64 = 1e-6;
const LIFT_ROTATION_EPSILON: f64 = 1e-6;

/// Walk planner errors
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Capture point error: {0}")]
    CapturePoint(#[from] CapturePointError),
    #[error("Step error: {0}")]
    Step(#[from] StepError),
    #[error("Invalid step: {0}")]
    InvalidStep(String),
}

/// Online walking pattern generator
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use stride_core::math::Pose;
/// use stride_walk::{FootType, StepType, WalkConfig, WalkPlanner};
///
/// let mut planner = WalkPlanner::new(WalkConfig::default()).unwrap();
/// planner
///     .init_from_poses(
///         Pose::from_translation(Vector3::new(0.0, -0.1, 0.0)),
///         Pose::from_translation(Vector3::new(0.0, 0.1, 0.0)),
///         Vector3::new(0.0, 0.0, 0.8),
///     )
///     .unwrap();
///
/// let target = Pose::from_translation(Vector3::new(0.1, 0.1, 0.0));
/// planner.add_step_for(target, FootType::Left, StepType::Cycloid).unwrap();
///
/// while !planner.is_empty() {
///     let sample = planner.get(true);
///     assert!(sample.com_height > 0.0);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WalkPlanner {
    config: WalkConfig,
    sequence: StepSequence,
    capture_point: CapturePoint,
    goals: VecDeque<StepData>,
    stepping: bool,
    margin: f64,
    /// Front goal already had its corrective start
    started: bool,
}

impl WalkPlanner {
    /// Create a planner; call one of the `init` methods before queueing steps
    pub fn new(config: WalkConfig) -> Result<Self, PlannerError> {
        config.validate()?;

        let mut sequence = StepSequence::new(config.dt);
        sequence.set_step_height(config.step_height);

        Ok(Self {
            sequence,
            capture_point: CapturePoint::with_gravity(config.dt, config.gravity),
            goals: VecDeque::new(),
            stepping: false,
            margin: config.margin,
            started: false,
            config,
        })
    }

    /// Start from the robot's current CoM and foot poses
    pub fn init<R: BipedKinematics>(&mut self, robot: &R) -> Result<(), PlannerError> {
        self.init_from_poses(
            robot.foot_pose(FootSide::Right),
            robot.foot_pose(FootSide::Left),
            robot.center_of_mass(),
        )
    }

    /// Start at rest with the capture point under the CoM, on the ground
    pub fn init_from_poses(&mut self, rfoot: Pose, lfoot: Pose, com: Vector3<f64>) -> Result<(), PlannerError> {
        self.sequence.init(rfoot, lfoot);

        let mut cp = com;
        cp.z = self.sequence.ground_height(FootType::Double);
        self.capture_point.init(com, cp)?;

        self.goals.clear();
        self.stepping = false;
        self.started = false;

        let offset = match self.config.lateral_offset {
            LateralOffset::Fixed(offset) => {
                self.capture_point.set_default_offset(offset);
                offset
            }
            LateralOffset::Derived { distance, duration } => {
                self.capture_point
                    .calc_default_offset(distance, duration, self.capture_point.com_height())?
            }
        };

        info!(
            com_height = self.capture_point.com_height(),
            offset,
            "walk planner initialized"
        );
        Ok(())
    }

    /// Default single and double support durations [s]
    pub fn set_times(&mut self, single_support: f64, double_support: f64) {
        self.config.single_support_time = single_support;
        self.config.double_support_time = double_support;
    }

    pub fn set_foot_size(&mut self, foot_size: FootSize) {
        self.config.foot_size = foot_size;
    }

    /// Default margin for the start feasibility check [m]
    pub fn set_margin(&mut self, margin: f64) {
        self.margin = margin;
    }

    pub fn set_step_height(&mut self, height: f64) {
        self.config.step_height = height;
        self.sequence.set_step_height(height);
    }

    /// Fixed lateral capture point bias [m]
    pub fn set_offset(&mut self, offset: f64) {
        self.capture_point.set_default_offset(offset);
    }

    /// Derive the lateral bias from foot distance and step duration
    pub fn calc_offset(&mut self, distance: f64, duration: f64, com_height: f64) -> Result<f64, PlannerError> {
        Ok(self.capture_point.calc_default_offset(distance, duration, com_height)?)
    }

    /// Override the walking status flag
    pub fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
    }

    /// Walking status: set when a stepping goal becomes active, cleared by a stop
    ///
    /// The flag is informational; the generator's output does not depend on it.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn sequence(&self) -> &StepSequence {
        &self.sequence
    }

    pub fn capture_point(&self) -> &CapturePoint {
        &self.capture_point
    }

    /// Contact regime able to realize `zmp` for the feet and CoM in `step`
    pub fn support_foot_type(&self, step: &StepData, zmp: &Vector3<f64>, margin: f64) -> FootType {
        support_foot_type(step, zmp, &self.config.foot_size, margin)
    }

    /// Which foot has to lift to reach the given foot references from the final goal
    ///
    /// Both feet moving yields `Double`; neither yields `Airborne`.
    pub fn swing_foot_type(&self, rfoot_ref: &Pose, lfoot_ref: &Pose) -> FootType {
        let goal = self.get_goal();
        match (need_lift_up(&goal.rfoot, rfoot_ref), need_lift_up(&goal.lfoot, lfoot_ref)) {
            (true, true) => FootType::Double,
            (true, false) => FootType::Right,
            (false, true) => FootType::Left,
            (false, false) => FootType::Airborne,
        }
    }

    pub fn is_empty(&self) -> bool {
        (self.sequence.is_empty() || self.capture_point.is_empty()) && self.goals.is_empty()
    }

    /// Time [s] until every queued goal is consumed
    pub fn remaining_time(&self) -> f64 {
        self.sequence.remaining_time() + self.goals.iter().map(StepData::duration).sum::<f64>()
    }

    /// Current sample, advancing one tick if `pop` is set
    ///
    /// When the active step runs out the next goal is expanded. Reading
    /// with `pop == false` never changes state.
    pub fn get(&mut self, pop: bool) -> StepData {
        let mut step = self.sequence.get(pop);
        let balance = self.capture_point.get(pop);

        step.zmp = balance.zmp;
        step.com = balance.com;
        step.cp = balance.cp;
        step.com_height = self.capture_point.com_height();

        if pop && (self.sequence.is_empty() || self.capture_point.is_empty()) {
            self.calc_step();
        }
        step
    }

    /// The last queued goal, or the end of the active step if none is queued
    pub fn get_goal(&self) -> StepData {
        if let Some(goal) = self.goals.back() {
            return *goal;
        }

        let mut step = self.sequence.get_goal();
        step.zmp = *self.capture_point.zmp();
        step.com = *self.capture_point.goal_com();
        step.cp = *self.capture_point.goal_cp();
        step.com_height = step.com.z - step.zmp.z;
        step
    }

    /// State at the start of the active step
    pub fn get_start(&self) -> StepData {
        let mut step = self.sequence.get_start();
        step.zmp = *self.capture_point.zmp();
        step.com = *self.capture_point.start_com();
        step.cp = *self.capture_point.start_cp();
        step.com_height = self.capture_point.com_height();
        step
    }

    /// Queue a step that moves one foot to `swing_foot`
    ///
    /// The step starts from the final goal and uses the default timing.
    /// A `swing` of `Double` or `Airborne` queues a double support move.
    pub fn add_step_for(&mut self, swing_foot: Pose, swing: FootType, step_type: StepType) -> Result<(), PlannerError> {
        let mut step = self.get_goal();
        match swing {
            FootType::Right => step.rfoot = swing_foot,
            FootType::Left => step.lfoot = swing_foot,
            FootType::Double | FootType::Airborne => {}
        }
        step.support_foot = if swing.is_single() { swing.opposite() } else { FootType::Double };
        step.step_type = step_type;
        step.single_support_time = self.config.single_support_time;
        step.double_support_time = self.config.double_support_time;

        self.add_step(step)
    }

    /// Queue a step goal
    ///
    /// Steps shorter than 0.1 s take the default timing and a non-positive
    /// CoM height keeps the current one. A rejected goal leaves the queue
    /// untouched.
    pub fn add_step(&mut self, step: StepData) -> Result<(), PlannerError> {
        let mut step = step;
        if step.duration() < MIN_STEP_DURATION {
            step.single_support_time = self.config.single_support_time;
            step.double_support_time = self.config.double_support_time;
        }
        if !(step.com_height > 0.0) {
            let current = self.get_goal().com_height;
            step.com_height = if current > 0.0 { current } else { self.capture_point.com_height() };
        }

        if !(step.single_support_time >= 0.0 && step.double_support_time >= 0.0) {
            return Err(PlannerError::InvalidStep(format!(
                "negative timing (single {}s, double {}s)",
                step.single_support_time, step.double_support_time
            )));
        }
        if step.step_type.is_stepping() && ticks(step.single_support_time, self.config.dt) == 0 {
            return Err(StepError::InfeasibleTiming {
                single_support: step.single_support_time,
                double_support: step.double_support_time,
            }
            .into());
        }

        self.goals.push_back(step);
        if self.sequence.is_empty() || self.capture_point.is_empty() {
            self.calc_step();
        }
        Ok(())
    }

    /// Bring the robot to rest between both feet
    ///
    /// With `immediately` the queued goals are dropped first; the step in
    /// progress always finishes. Does nothing if the final goal already
    /// stops or waits.
    pub fn stop(&mut self, immediately: bool) -> Result<(), PlannerError> {
        if immediately {
            self.goals.clear();
            self.started = false;
        }

        let mut step = self.get_goal();
        if matches!(step.step_type, StepType::Stop | StepType::Wait) {
            return Ok(());
        }

        step.cp = step.feet_center();
        step.support_foot = FootType::Double;
        step.step_type = StepType::Wait;
        self.add_step(step)?;

        step.step_type = StepType::Stop;
        self.add_step(step)?;

        info!(immediately, "stop requested");
        Ok(())
    }

    /// Expand the front goal, or its corrective start
    fn calc_step(&mut self) {
        if self.goals.is_empty() {
            return;
        }

        match self.start() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "dropping step goal");
                self.goals.pop_front();
                self.started = false;
                return;
            }
        }

        let Some(goal) = self.goals.pop_front() else {
            return;
        };
        self.started = false;

        let result = if goal.step_type.is_stepping() {
            self.add_step_plane(&goal)
        } else {
            self.add_com_move(&goal)
        };
        match result {
            Ok(()) => debug!(
                step_type = ?goal.step_type,
                support = ?goal.support_foot,
                remaining = self.goals.len(),
                "step goal activated"
            ),
            Err(e) => warn!(error = %e, step_type = ?goal.step_type, "step goal rejected"),
        }
    }

    /// Plan the front goal's capture point and insert a corrective start if needed
    ///
    /// Returns `true` when a start transition was queued instead of the goal.
    fn start(&mut self) -> Result<bool, PlannerError> {
        let Some(mut goal) = self.goals.front().copied() else {
            return Ok(false);
        };
        let start = self.get_start();
        let time = goal.duration();

        let target = match goal.support_foot {
            FootType::Right => Some((goal.lfoot.translation, -goal.lfoot.axis(Axis::Y), start.lfoot.translation)),
            FootType::Left => Some((goal.rfoot.translation, goal.rfoot.axis(Axis::Y), start.rfoot.translation)),
            FootType::Double | FootType::Airborne => None,
        };
        if let Some((foot, direction, from)) = target {
            // The CoM travels half as far as the swing foot
            let velocity = (foot - from) / time / 2.0;
            goal.cp = self
                .capture_point
                .calc_next_capture_point(&foot, &direction, &velocity, time, goal.com_height)?;
        }
        goal.zmp = self.capture_point.expected_zmp(&start.cp, &goal.cp, time, goal.com_height)?;
        if let Some(front) = self.goals.front_mut() {
            front.cp = goal.cp;
        }

        let mut expected = self.support_foot_type(&start, &goal.zmp, self.margin);
        if goal.support_foot == FootType::Double && expected != FootType::Airborne {
            expected = FootType::Double;
        }
        if goal.support_foot == expected {
            return Ok(false);
        }
        if self.started {
            warn!(
                expected = ?expected,
                declared = ?goal.support_foot,
                "reference ZMP still outside the declared support after start"
            );
            return Ok(false);
        }

        let (foot, direction) = match goal.support_foot {
            FootType::Right => (start.rfoot.translation, start.rfoot.axis(Axis::Y)),
            FootType::Left => (start.lfoot.translation, -start.lfoot.axis(Axis::Y)),
            FootType::Double | FootType::Airborne => (start.feet_center(), Vector3::zeros()),
        };
        let cp = self.capture_point.calc_next_capture_point(
            &foot,
            &direction,
            &Vector3::zeros(),
            time,
            start.com_height,
        )?;

        self.sequence.set_wait(time, StepType::Start);
        if let Err(e) = self.capture_point.set(cp, self.sequence.step_duration(), start.com_height) {
            self.sequence.set_wait(0.0, StepType::Start);
            return Err(e.into());
        }
        self.started = true;

        info!(
            expected = ?expected,
            declared = ?goal.support_foot,
            cp_x = cp.x,
            cp_y = cp.y,
            "start transition inserted"
        );
        Ok(true)
    }

    /// Expand a stepping goal into a swing and its capture point transition
    ///
    /// If the capture point rejects the goal the sequencer is reset to an
    /// empty wait so both stay idle together.
    fn add_step_plane(&mut self, goal: &StepData) -> Result<(), PlannerError> {
        self.sequence.set_step(goal)?;
        if let Err(e) = self
            .capture_point
            .set(goal.cp, self.sequence.step_duration(), goal.com_height)
        {
            self.sequence.set_wait(0.0, goal.step_type);
            return Err(e.into());
        }
        self.stepping = true;
        Ok(())
    }

    fn add_com_move(&mut self, goal: &StepData) -> Result<(), PlannerError> {
        let time = goal.duration();

        if goal.step_type == StepType::Stop {
            self.stepping = false;
            if self.capture_point.stop(time) {
                if self.sequence.is_empty() {
                    self.sequence.set_wait(time, StepType::Stop);
                } else {
                    self.sequence.wait(time);
                }
            }
            return Ok(());
        }

        self.sequence.set_wait(time, goal.step_type);
        if let Err(e) = self
            .capture_point
            .set(goal.cp, self.sequence.step_duration(), goal.com_height)
        {
            self.sequence.set_wait(0.0, goal.step_type);
            return Err(e.into());
        }
        Ok(())
    }
}

fn need_lift_up(from: &Pose, to: &Pose) -> bool {
    let dp = (to.translation - from.translation).norm();
    let dr = rotation_angle(&(to.rotation.transpose() * from.rotation));
    dp > LIFT_POSITION_EPSILON || dr > LIFT_ROTATION_EPSILON
}
