//! Inner loop: closes on body angular velocity.
//!
//! The controller also owns the authority model. Max rate and max angular
//! acceleration are recomputed every tick from the parts currently attached,
//! and reported upward so the direction loop never asks for more than the
//! vessel can deliver.

use crate::actuation::ActuationLayer;
use crate::axis::{clamp_command, Axis, AxisCommands, PerAxis};
use crate::config::ControlConfig;
use crate::pid::{DerivativeSource, Pid, PidGains, PidState};
use crate::telemetry::{MomentOfInertia, PartCapability};
use nalgebra::Vector3;

/// Default time, in seconds, over which full authority builds the max rate.
pub const DEFAULT_RATE_HORIZON_S: f64 = 1.0;

/// Per-axis authority figures for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateLimits {
    /// Largest rate the loops may target (rad/s)
    pub max_rate: PerAxis<f64>,
    /// Angular acceleration at full command (rad/s²)
    pub max_accel: PerAxis<f64>,
}

impl RateLimits {
    pub fn has_authority(&self, axis: Axis) -> bool {
        self.max_rate[axis] > 0.0
    }

    pub fn axis_authority(&self) -> PerAxis<bool> {
        PerAxis::from_fn(|axis| self.has_authority(axis))
    }
}

/// Rate loop history owned by the vessel's control state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateLoopState {
    targets: PerAxis<Option<f64>>,
    pids: PerAxis<PidState>,
    last_error: PerAxis<f64>,
}

impl RateLoopState {
    pub fn target(&self, axis: Axis) -> Option<f64> {
        self.targets[axis]
    }

    pub fn targets(&self) -> PerAxis<Option<f64>> {
        self.targets
    }

    /// Rate error (rad/s) seen on the last tick.
    pub fn last_error(&self, axis: Axis) -> f64 {
        self.last_error[axis]
    }

    pub fn pid(&self, axis: Axis) -> &PidState {
        &self.pids[axis]
    }

    /// Rebuild from persisted targets with fresh integrator history.
    pub fn from_targets(targets: PerAxis<Option<f64>>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }
}

/// PID rate controller with gain scheduling on axis authority.
///
/// The error fed to the PID is normalized by the rate full authority builds
/// over the rate horizon. With that scaling the closed loop behaves the same
/// whether the vessel is a nimble tender or a fully loaded station.
#[derive(Debug, Clone, PartialEq)]
pub struct RateController {
    pid: Pid,
    rate_horizon_s: f64,
    max_rate_ceiling: PerAxis<Option<f64>>,
}

impl RateController {
    pub fn new(gains: PidGains, rate_horizon_s: f64) -> Self {
        Self {
            pid: Pid::new(gains, DerivativeSource::Measurement),
            rate_horizon_s,
            max_rate_ceiling: PerAxis::default(),
        }
    }

    /// Cap the max rate on selected axes regardless of authority.
    pub fn with_ceiling(mut self, ceiling: PerAxis<Option<f64>>) -> Self {
        self.max_rate_ceiling = ceiling;
        self
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.rate_gains, config.rate_horizon_s).with_ceiling(config.max_rate_ceiling)
    }

    pub fn gains(&self) -> &PidGains {
        &self.pid.gains
    }

    pub fn rate_horizon_s(&self) -> f64 {
        self.rate_horizon_s
    }

    /// Angular acceleration full authority gives about one axis.
    ///
    /// Zero when authority is zero or inertia is not a positive finite number.
    pub fn max_accel(authority: f64, inertia: f64) -> f64 {
        if !(inertia.is_finite() && inertia > 0.0) || !authority.is_finite() || authority <= 0.0 {
            return 0.0;
        }
        authority / inertia
    }

    /// Largest rate the loops may target on `axis`.
    ///
    /// Full authority held over the rate horizon, capped by the axis ceiling
    /// if one is configured. Non-decreasing in `authority`, and exactly zero
    /// when `authority` is zero.
    pub fn max_rate(&self, axis: Axis, authority: f64, inertia: f64) -> f64 {
        let rate = Self::max_accel(authority, inertia) * self.rate_horizon_s;
        match self.max_rate_ceiling[axis] {
            Some(ceiling) => rate.min(ceiling),
            None => rate,
        }
    }

    /// Authority figures for the current part set.
    pub fn rate_limits(&self, parts: &[PartCapability], inertia: &MomentOfInertia) -> RateLimits {
        let authority = ActuationLayer::torque_authority(parts);
        RateLimits {
            max_rate: PerAxis::from_fn(|axis| {
                self.max_rate(axis, authority[axis], inertia.about(axis))
            }),
            max_accel: PerAxis::from_fn(|axis| Self::max_accel(authority[axis], inertia.about(axis))),
        }
    }

    pub fn set_target(state: &mut RateLoopState, axis: Axis, rate: f64) {
        state.targets[axis] = Some(rate);
    }

    pub fn clear_target(state: &mut RateLoopState, axis: Axis) {
        state.targets[axis] = None;
        state.pids[axis].reset();
    }

    /// Run the loop for one tick.
    ///
    /// Targets are clamped to the current max rate. Axes without a target or
    /// without authority get a zero command and their history is dropped.
    ///
    /// # Arguments
    ///
    /// * `state` - Loop history, updated in place
    /// * `dt` - Timestep in seconds, must be positive
    /// * `angular_velocity` - Measured body-frame rates (rad/s)
    /// * `limits` - Authority figures for this tick
    ///
    /// # Returns
    ///
    /// Commands clamped to [-1, 1]
    pub fn tick(
        &self,
        state: &mut RateLoopState,
        dt: f64,
        angular_velocity: &Vector3<f64>,
        limits: &RateLimits,
    ) -> AxisCommands {
        let mut commands = AxisCommands::default();

        for axis in Axis::ALL {
            let max_rate = limits.max_rate[axis];
            let scale = limits.max_accel[axis] * self.rate_horizon_s;
            let measured = angular_velocity[axis.index()];

            let target = match state.targets[axis] {
                Some(target) if max_rate > 0.0 && scale > 0.0 => target.clamp(-max_rate, max_rate),
                _ => {
                    state.pids[axis].reset();
                    state.last_error[axis] = 0.0;
                    continue;
                }
            };

            let error = target - measured;
            state.last_error[axis] = error;
            let output = self.pid.update(
                &mut state.pids[axis],
                error / scale,
                measured / scale,
                dt,
                1.0,
            );
            commands[axis] = clamp_command(output.value);
        }

        commands
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::new(PidGains::default(), DEFAULT_RATE_HORIZON_S)
    }
}
