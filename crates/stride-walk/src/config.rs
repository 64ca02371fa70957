//! Walking generator configuration
//!
//! All fields have defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! dt = 0.005
//! single_support_time = 0.7
//! step_height = 0.04
//!
//! [foot_size]
//! toe = 0.16
//! heel = 0.10
//! outer = 0.055
//! inner = 0.055
//!
//! [lateral_offset.derived]
//! distance = 0.19
//! duration = 0.8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use stride_core::{ticks, GRAVITY};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Main walking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Control tick period [s]
    pub dt: f64,
    /// Default single support duration [s]
    pub single_support_time: f64,
    /// Default double support duration [s]
    pub double_support_time: f64,
    /// Sole half-extents around the ankle frame
    pub foot_size: FootSize,
    /// Default shrink of the support regions [m]
    pub margin: f64,
    /// Lateral capture point bias
    pub lateral_offset: LateralOffset,
    /// Swing foot lift height [m]
    pub step_height: f64,
    /// Gravity used by the LIPM [m/s²]
    pub gravity: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            dt: 0.005,
            single_support_time: 0.7,
            double_support_time: 0.1,
            foot_size: FootSize::default(),
            margin: 0.0,
            lateral_offset: LateralOffset::default(),
            step_height: 0.05,
            gravity: GRAVITY,
        }
    }
}

/// Sole extents measured from the ankle frame [m]
///
/// `outer` and `inner` are mirrored between the feet: for the right foot
/// outer is -y, for the left foot outer is +y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootSize {
    /// Forward extent (+x)
    pub toe: f64,
    /// Backward extent (-x)
    pub heel: f64,
    /// Extent away from the other foot
    pub outer: f64,
    /// Extent toward the other foot
    pub inner: f64,
}

impl Default for FootSize {
    fn default() -> Self {
        Self {
            toe: 0.16,
            heel: 0.10,
            outer: 0.055,
            inner: 0.055,
        }
    }
}

/// Lateral capture point bias used when planning steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateralOffset {
    /// Fixed offset [m]
    Fixed(f64),
    /// Offset that keeps a capture point oscillating over `distance` with
    /// period `duration` at the initial CoM height
    Derived { distance: f64, duration: f64 },
}

impl Default for LateralOffset {
    fn default() -> Self {
        LateralOffset::Derived {
            distance: 0.19,
            duration: 0.8,
        }
    }
}

impl WalkConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: WalkConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            ConfigError::Io(e)
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the generator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.into(),
            })
        }

        if !(self.dt.is_finite() && self.dt > 0.0) {
            return invalid("dt", format!("must be positive, got {}", self.dt));
        }
        if ticks(self.single_support_time, self.dt) == 0 {
            return invalid(
                "single_support_time",
                format!("must cover at least one tick, got {}", self.single_support_time),
            );
        }
        if !(self.double_support_time >= 0.0) {
            return invalid("double_support_time", "must not be negative");
        }

        let f = &self.foot_size;
        if [f.toe, f.heel, f.outer, f.inner].iter().any(|v| !(*v >= 0.0)) {
            return invalid("foot_size", "extents must not be negative");
        }
        if !(self.margin >= 0.0) {
            return invalid("margin", "must not be negative");
        }
        if !(self.step_height > 0.0) {
            return invalid("step_height", "must be positive");
        }
        if !(self.gravity > 0.0) {
            return invalid("gravity", "must be positive");
        }

        match self.lateral_offset {
            LateralOffset::Fixed(v) if !v.is_finite() => invalid("lateral_offset", "must be finite"),
            LateralOffset::Derived { duration, .. } if !(duration > 0.0) => {
                invalid("lateral_offset", "derivation duration must be positive")
            }
            _ => Ok(()),
        }
    }
}
