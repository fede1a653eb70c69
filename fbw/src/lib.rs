#![doc = include_str!("../README.md")]

pub mod actuation;
pub mod autopilot;
pub mod axis;
pub mod config;
pub mod direction;
pub mod error;
pub mod persistence;
pub mod pid;
pub mod rate;
pub mod telemetry;
pub mod vessel;

pub use actuation::{ActuationLayer, PartActuation};
pub use autopilot::{AutopilotGoal, CustomStrategies, TargetStrategy};
pub use axis::{Axis, AxisCommands, PerAxis};
pub use config::{ControlConfig, ManualMode};
pub use direction::{DirectionController, DirectionTarget};
pub use error::{ConfigError, InputRejected, SnapshotError, TargetUnavailable, TelemetryError};
pub use persistence::{ControlSnapshot, SnapshotStore};
pub use pid::PidGains;
pub use rate::{RateController, RateLimits};
pub use telemetry::{MomentOfInertia, Navigation, PartCapability, PartId, Telemetry, VelocityFrame};
pub use vessel::{ControlStatus, VesselControlState};
