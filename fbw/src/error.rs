//! Error types for the control cascade.
//!
//! None of these are fatal. Rejected inputs leave the previous value in place,
//! and bad telemetry makes a tick emit zero demand without touching loop state.

use crate::axis::Axis;
use thiserror::Error;

/// An operator or host input refused at a setter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputRejected {
    #[error("target orientation is not a finite unit rotation")]
    InvalidOrientation,

    #[error("roll reference must be finite, got {0}")]
    InvalidRollReference(f64),

    #[error("surface heading must be finite, got heading {heading} pitch {pitch}")]
    InvalidHeading { heading: f64, pitch: f64 },

    #[error("custom strategy id must not be empty")]
    EmptyStrategyId,

    #[error("manual {axis} value {value} is outside [-1, 1]")]
    ManualOutOfRange { axis: Axis, value: f64 },

    #[error("throttle {0} is outside [0, 1]")]
    ThrottleOutOfRange(f64),

    #[error("{axis} rate target must be finite, got {value}")]
    InvalidRateTarget { axis: Axis, value: f64 },
}

/// Telemetry or timestep that cannot be fed to the loops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f64),

    #[error("orientation is not finite")]
    NonFiniteOrientation,

    #[error("orientation is not a unit quaternion, norm {0}")]
    NonUnitOrientation(f64),

    #[error("angular velocity is not finite")]
    NonFiniteAngularVelocity,
}

/// Why the active goal could not produce a target this tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetUnavailable {
    #[error("goal needs navigation data but telemetry has none")]
    NoNavigation,

    #[error("{0} vector is degenerate")]
    Degenerate(&'static str),

    #[error("no strategy registered as {0:?}")]
    UnknownStrategy(String),

    #[error("strategy {id:?} failed: {reason}")]
    StrategyFailed { id: String, reason: String },
}

/// Errors loading or validating a [`crate::config::ControlConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors storing or restoring a [`crate::persistence::ControlSnapshot`].
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid vessel id {0:?}")]
    InvalidVesselId(String),

    #[error("snapshot holds a rejected input: {0}")]
    Rejected(#[from] InputRejected),

    #[error("control config error: {0}")]
    Config(#[from] ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type SnapshotResult<T> = Result<T, SnapshotError>;
