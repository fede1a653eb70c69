//! Per-vessel owner of every piece of cascade state.
//!
//! A [`VesselControlState`] is created when the vessel becomes physics
//! active and dropped or suspended when it leaves. It is the only place the
//! loops keep history; the controllers it holds are plain configuration.

use crate::autopilot::{AutopilotGoal, CustomStrategies, TargetStrategy};
use crate::axis::{clamp_command, Axis, AxisCommands, PerAxis};
use crate::config::{ControlConfig, ManualMode};
use crate::direction::{attitude_error, DirectionController, DirectionLoopState, DirectionTarget};
use crate::error::{ConfigResult, InputRejected, SnapshotResult, TargetUnavailable};
use crate::persistence::ControlSnapshot;
use crate::rate::{RateController, RateLimits, RateLoopState};
use crate::telemetry::Telemetry;
use log::{debug, info, warn};
use nalgebra::Vector3;

/// What the host can observe about the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStatus {
    /// A goal other than [`AutopilotGoal::Inactive`] is set
    pub engaged: bool,
    /// Every axis has a nonzero max rate
    pub has_authority: bool,
    pub axis_authority: PerAxis<bool>,
    pub manual_axes: PerAxis<bool>,
    /// Last tick's telemetry and timestep were usable
    pub telemetry_valid: bool,
    /// Why the active goal produced no target on the last tick, if it failed
    pub target_unavailable: Option<TargetUnavailable>,
    /// Most recent rejected input, cleared by the next accepted one
    pub last_rejection: Option<InputRejected>,
}

impl ControlStatus {
    pub fn target_available(&self) -> bool {
        self.target_unavailable.is_none()
    }
}

impl Default for ControlStatus {
    fn default() -> Self {
        Self {
            engaged: false,
            has_authority: false,
            axis_authority: PerAxis::default(),
            manual_axes: PerAxis::default(),
            telemetry_valid: true,
            target_unavailable: None,
            last_rejection: None,
        }
    }
}

/// Complete cascade state for one vessel.
#[derive(Debug)]
pub struct VesselControlState {
    config: ControlConfig,
    rate_controller: RateController,
    direction_controller: DirectionController,
    goal: AutopilotGoal,
    direction: DirectionLoopState,
    rate: RateLoopState,
    limits: RateLimits,
    commands: AxisCommands,
    manual: PerAxis<Option<f64>>,
    throttle: f64,
    strategies: CustomStrategies,
    status: ControlStatus,
}

impl VesselControlState {
    /// Create fresh state for a vessel entering physics range.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is unusable.
    pub fn new(config: ControlConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: ControlConfig) -> Self {
        Self {
            rate_controller: RateController::from_config(&config),
            direction_controller: DirectionController::from_config(&config),
            config,
            goal: AutopilotGoal::Inactive,
            direction: DirectionLoopState::default(),
            rate: RateLoopState::default(),
            limits: RateLimits::default(),
            commands: AxisCommands::default(),
            manual: PerAxis::default(),
            throttle: 0.0,
            strategies: CustomStrategies::default(),
            status: ControlStatus::default(),
        }
    }

    /// Rebuild state for a vessel coming back into physics range.
    ///
    /// Goal and targets come from the snapshot. Integrator and error history
    /// starts from zero. Custom strategies are not persisted and must be
    /// registered again.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is unusable or the snapshot holds a value
    /// the setters would reject.
    pub fn restore(snapshot: &ControlSnapshot, config: ControlConfig) -> SnapshotResult<Self> {
        snapshot.validate()?;
        let mut state = Self::new(config)?;
        state.goal = snapshot.goal.clone();
        state.direction = DirectionLoopState::from_target(snapshot.direction_target);
        state.rate = RateLoopState::from_targets(snapshot.rate_targets);
        state.throttle = snapshot.throttle;
        state.status.engaged = state.goal.is_active();
        debug!("restored control state with goal {}", state.goal);
        Ok(state)
    }

    /// Capture the persistent part of the state for unloading.
    pub fn suspend(&self) -> ControlSnapshot {
        ControlSnapshot {
            goal: self.goal.clone(),
            direction_target: self.direction.target().copied(),
            rate_targets: self.rate.targets(),
            throttle: self.throttle,
        }
    }

    /// Run the cascade for one physics tick.
    ///
    /// In order: validate inputs, recompute authority, let the goal produce a
    /// target, run the direction loop on axes not under manual control, apply
    /// manual rate demands, run the rate loop, then write direct-mode values.
    /// Invalid telemetry or `dt` yields zero commands and leaves loop history
    /// untouched.
    ///
    /// # Arguments
    ///
    /// * `dt` - Timestep in seconds
    /// * `telemetry` - Vessel state for this tick
    ///
    /// # Returns
    ///
    /// Commands in [-1, 1] for the host to apply through
    /// [`crate::actuation::ActuationLayer`]
    pub fn tick(&mut self, dt: f64, telemetry: &Telemetry) -> AxisCommands {
        if let Err(err) = telemetry.validate(dt) {
            if self.status.telemetry_valid {
                warn!("ignoring tick: {err}");
            }
            self.status.telemetry_valid = false;
            self.commands = AxisCommands::default();
            return self.commands;
        }
        if !self.status.telemetry_valid {
            info!("telemetry valid again");
        }
        self.status.telemetry_valid = true;

        let limits = self
            .rate_controller
            .rate_limits(&telemetry.parts, &telemetry.inertia);
        self.update_authority(&limits);

        let manual_axes = self.manual.map(|value| value.is_some());
        if !manual_axes.all() {
            self.update_target(telemetry);
            if self.goal.is_active() {
                self.direction_controller.tick(
                    &mut self.direction,
                    &mut self.rate,
                    dt,
                    telemetry,
                    &limits,
                    &manual_axes,
                );
            }
        }

        for axis in Axis::ALL {
            let Some(value) = self.manual[axis] else {
                continue;
            };
            match self.config.manual_mode {
                ManualMode::RateDemand => {
                    RateController::set_target(&mut self.rate, axis, value * limits.max_rate[axis]);
                }
                ManualMode::Direct => RateController::clear_target(&mut self.rate, axis),
            }
        }

        let mut commands =
            self.rate_controller
                .tick(&mut self.rate, dt, &telemetry.angular_velocity, &limits);

        if self.config.manual_mode == ManualMode::Direct {
            for axis in Axis::ALL {
                if let Some(value) = self.manual[axis] {
                    commands[axis] = clamp_command(value);
                }
            }
        }

        self.limits = limits;
        self.commands = commands.map(clamp_command);
        self.commands
    }

    fn update_target(&mut self, telemetry: &Telemetry) {
        let Some(result) = self.goal.compute_target(telemetry, &mut self.strategies) else {
            self.status.target_unavailable = None;
            return;
        };
        match result {
            Ok(target) => {
                if self.status.target_unavailable.take().is_some() {
                    info!("target for {} available again", self.goal);
                }
                if let Err(err) = DirectionController::set_target(&mut self.direction, target) {
                    warn!("{} produced an unusable target: {err}", self.goal);
                    self.status.target_unavailable = Some(TargetUnavailable::StrategyFailed {
                        id: self.goal.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
            Err(err) => {
                if self.status.target_unavailable.as_ref() != Some(&err) {
                    warn!("{} has no target, holding previous: {err}", self.goal);
                }
                self.status.target_unavailable = Some(err);
            }
        }
    }

    fn update_authority(&mut self, limits: &RateLimits) {
        let axis_authority = limits.axis_authority();
        for axis in Axis::ALL {
            let had = self.status.axis_authority[axis];
            let has = axis_authority[axis];
            if had && !has {
                warn!("{axis} authority lost");
            } else if !had && has && self.limits != RateLimits::default() {
                info!("{axis} authority restored");
            }
        }
        self.status.axis_authority = axis_authority;
        self.status.has_authority = axis_authority.all();
    }

    /// Select the active goal. Takes effect on the next tick.
    ///
    /// Loop history is kept across the switch so the commanded torque stays
    /// continuous. Rejected goals leave the previous goal active.
    pub fn set_goal(&mut self, goal: AutopilotGoal) -> Result<(), InputRejected> {
        if let Err(err) = goal.validate() {
            warn!("rejected goal {goal}: {err}");
            self.status.last_rejection = Some(err.clone());
            return Err(err);
        }
        debug!("goal {} -> {}", self.goal, goal);
        self.status.engaged = goal.is_active();
        self.status.target_unavailable = None;
        self.status.last_rejection = None;
        self.goal = goal;
        Ok(())
    }

    pub fn goal(&self) -> &AutopilotGoal {
        &self.goal
    }

    pub fn status(&self) -> &ControlStatus {
        &self.status
    }

    /// Take one axis out of the closed loop.
    ///
    /// `value` in [-1, 1] is a fraction of max rate, or the command itself in
    /// [`ManualMode::Direct`]. Out-of-range or NaN values are rejected and the
    /// previous override, if any, stays.
    pub fn set_manual_axis(&mut self, axis: Axis, value: f64) -> Result<(), InputRejected> {
        if !(-1.0..=1.0).contains(&value) {
            let err = InputRejected::ManualOutOfRange { axis, value };
            warn!("{err}");
            self.status.last_rejection = Some(err.clone());
            return Err(err);
        }
        if self.manual[axis].is_none() {
            debug!("manual override on {axis}");
        }
        self.manual[axis] = Some(value);
        self.status.manual_axes[axis] = true;
        self.status.last_rejection = None;
        Ok(())
    }

    /// Hand an axis back to the autopilot.
    ///
    /// With no active goal the axis rate target is dropped, so the axis goes
    /// to zero demand rather than holding the pilot's last input.
    pub fn clear_manual_axis(&mut self, axis: Axis) {
        if self.manual[axis].take().is_none() {
            return;
        }
        debug!("manual override off {axis}");
        self.status.manual_axes[axis] = false;
        self.direction.release_axis(axis);
        if !self.goal.is_active() {
            RateController::clear_target(&mut self.rate, axis);
        }
    }

    pub fn manual_axis(&self, axis: Axis) -> Option<f64> {
        self.manual[axis]
    }

    /// Main throttle, passed through untouched by the attitude loops.
    pub fn set_throttle(&mut self, throttle: f64) -> Result<(), InputRejected> {
        if !(0.0..=1.0).contains(&throttle) {
            let err = InputRejected::ThrottleOutOfRange(throttle);
            self.status.last_rejection = Some(err.clone());
            return Err(err);
        }
        self.throttle = throttle;
        self.status.last_rejection = None;
        Ok(())
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    /// Register a strategy for [`AutopilotGoal::Custom`] goals on this vessel.
    pub fn register_strategy(
        &mut self,
        id: impl Into<String>,
        strategy: impl TargetStrategy + 'static,
    ) -> Result<(), InputRejected> {
        let id = id.into();
        if id.is_empty() {
            self.status.last_rejection = Some(InputRejected::EmptyStrategyId);
            return Err(InputRejected::EmptyStrategyId);
        }
        if self.strategies.register(id.clone(), Box::new(strategy)) {
            debug!("replaced strategy {id:?}");
        }
        Ok(())
    }

    pub fn unregister_strategy(&mut self, id: &str) -> bool {
        self.strategies.remove(id)
    }

    /// Commands emitted by the last tick.
    pub fn commands(&self) -> AxisCommands {
        self.commands
    }

    /// Authority figures from the last valid tick.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.limits
    }

    pub fn direction_target(&self) -> Option<&DirectionTarget> {
        self.direction.target()
    }

    pub fn rate_target(&self, axis: Axis) -> Option<f64> {
        self.rate.target(axis)
    }

    /// Body-frame attitude error against the current direction target.
    pub fn attitude_error(&self, telemetry: &Telemetry) -> Option<Vector3<f64>> {
        self.direction
            .target()
            .map(|target| attitude_error(&telemetry.orientation, target))
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn direction_state(&self) -> &DirectionLoopState {
        &self.direction
    }

    pub fn rate_state(&self) -> &RateLoopState {
        &self.rate
    }
}

impl Default for VesselControlState {
    fn default() -> Self {
        Self::with_config(ControlConfig::default())
    }
}
