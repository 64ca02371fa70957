//! # Stride Walk
//!
//! Capture-point based walking pattern generator for biped robots.
//!
//! Given foot placement goals, the generator emits one sample per control
//! tick containing foot poses, the support regime and consistent ZMP, CoM
//! and capture point references for the linear inverted pendulum model.
//!
//! ## Modules
//!
//! - [`step`]: Step goals and per-tick samples
//! - [`step_sequence`]: Foot trajectories for one step at a time
//! - [`capture_point`]: LIPM capture point and CoM references
//! - [`support`]: Support polygon feasibility test
//! - [`planner`]: Goal queue driving the sequencer and capture point engine
//! - [`robot`]: Kinematics interface the generator reads from and feeds
//! - [`config`]: TOML configuration

pub mod capture_point;
pub mod config;
pub mod planner;
pub mod robot;
pub mod step;
pub mod step_sequence;
pub mod support;

pub use capture_point::{CapturePoint, CapturePointError, CapturePointSample};
pub use config::{ConfigError, FootSize, LateralOffset, WalkConfig};
pub use planner::{PlannerError, WalkPlanner};
pub use robot::{BipedKinematics, FootSide, IkTargets};
pub use step::{FootType, StepData, StepType};
pub use step_sequence::{StepError, StepSequence};
pub use support::support_foot_type;
