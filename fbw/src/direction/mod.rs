//! Outer loop: closes on orientation and feeds rate targets to the inner loop.
//!
//! Each tick the attitude error is decomposed per body axis and pushed
//! through a PID. The resulting rate request is clamped to the inner loop's
//! max rate, slewed no faster than the axis can accelerate, and clamped once
//! more before being handed to [`RateController::set_target`]. The inner
//! loop is therefore never asked for a rate it cannot reach.

pub mod geometry;


pub use geometry::{attitude_error, look_along, orientation_error, pointing_error};

use crate::axis::{Axis, PerAxis};
use crate::config::ControlConfig;
use crate::error::InputRejected;
use crate::pid::{DerivativeSource, Pid, PidGains, PidState};
use crate::rate::{RateController, RateLimits, RateLoopState};
use crate::telemetry::{Telemetry, UNIT_NORM_TOLERANCE};
use geometry::roll_about_forward;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Orientation to hold, with optional roll lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionTarget {
    /// Body to world rotation to point at
    pub orientation: UnitQuaternion<f64>,
    /// Roll about the target forward axis (rad) when roll is locked.
    /// `None` leaves roll free.
    pub roll_reference: Option<f64>,
}

impl DirectionTarget {
    pub fn free_roll(orientation: UnitQuaternion<f64>) -> Self {
        Self {
            orientation,
            roll_reference: None,
        }
    }

    pub fn roll_locked(orientation: UnitQuaternion<f64>, roll: f64) -> Self {
        Self {
            orientation,
            roll_reference: Some(roll),
        }
    }

    /// The orientation to match when roll is locked.
    pub fn reference_orientation(&self) -> UnitQuaternion<f64> {
        match self.roll_reference {
            Some(roll) => self.orientation * roll_about_forward(roll),
            None => self.orientation,
        }
    }

    /// World-frame forward direction of the target.
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * crate::axis::body_forward()
    }

    /// Reject non-finite or non-normalizable orientations and roll references.
    pub fn validate(&self) -> Result<(), InputRejected> {
        let coords = &self.orientation.coords;
        let finite = coords.iter().all(|c| c.is_finite());
        if !finite || (coords.norm() - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(InputRejected::InvalidOrientation);
        }
        if let Some(roll) = self.roll_reference {
            if !roll.is_finite() {
                return Err(InputRejected::InvalidRollReference(roll));
            }
        }
        Ok(())
    }
}

/// Direction loop history owned by the vessel's control state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionLoopState {
    target: Option<DirectionTarget>,
    pids: PerAxis<PidState>,
    last_error: PerAxis<f64>,
    last_request: PerAxis<Option<f64>>,
}

impl DirectionLoopState {
    pub fn target(&self) -> Option<&DirectionTarget> {
        self.target.as_ref()
    }

    /// Attitude error (rad) seen on the last tick.
    pub fn last_error(&self) -> PerAxis<f64> {
        self.last_error
    }

    /// Rate requested from the inner loop on the last tick.
    pub fn last_request(&self, axis: Axis) -> Option<f64> {
        self.last_request[axis]
    }

    /// Rebuild from a persisted target with fresh history.
    pub fn from_target(target: Option<DirectionTarget>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Forget per-axis history so the axis re-engages from the measured rate.
    pub fn release_axis(&mut self, axis: Axis) {
        self.pids[axis].reset();
        self.last_request[axis] = None;
    }
}

/// PID attitude controller clamped by the inner loop's authority.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionController {
    pid: Pid,
}

impl DirectionController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            pid: Pid::new(gains, DerivativeSource::Error),
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.direction_gains)
    }

    pub fn gains(&self) -> &PidGains {
        &self.pid.gains
    }

    /// Replace the target. Invalid targets leave the previous one in place.
    pub fn set_target(
        state: &mut DirectionLoopState,
        target: DirectionTarget,
    ) -> Result<(), InputRejected> {
        target.validate()?;
        state.target = Some(target);
        Ok(())
    }

    pub fn clear_target(state: &mut DirectionLoopState) {
        state.target = None;
    }

    /// Run the loop for one tick, driving rate targets on every axis not in
    /// `skip`.
    ///
    /// Does nothing without a target. Axes without authority get a zero rate
    /// request.
    ///
    /// # Arguments
    ///
    /// * `state` - Direction loop history, updated in place
    /// * `rate_state` - Inner loop state receiving the rate targets
    /// * `dt` - Timestep in seconds, must be positive
    /// * `telemetry` - Current orientation and rates
    /// * `limits` - Inner loop authority for this tick
    /// * `skip` - Axes under manual control
    pub fn tick(
        &self,
        state: &mut DirectionLoopState,
        rate_state: &mut RateLoopState,
        dt: f64,
        telemetry: &Telemetry,
        limits: &RateLimits,
        skip: &PerAxis<bool>,
    ) {
        let Some(target) = state.target else {
            return;
        };
        let error = attitude_error(&telemetry.orientation, &target);

        for axis in Axis::ALL {
            if skip[axis] {
                state.release_axis(axis);
                continue;
            }

            let axis_error = error[axis.index()];
            state.last_error[axis] = axis_error;

            let max_rate = limits.max_rate[axis];
            if max_rate <= 0.0 {
                state.release_axis(axis);
                RateController::set_target(rate_state, axis, 0.0);
                continue;
            }

            let desired = self
                .pid
                .update(&mut state.pids[axis], axis_error, axis_error, dt, max_rate)
                .value;

            let step = limits.max_accel[axis] * dt;
            let previous = state.last_request[axis]
                .unwrap_or(telemetry.angular_velocity[axis.index()])
                .clamp(-max_rate, max_rate);
            let request = (previous + (desired - previous).clamp(-step, step))
                .clamp(-max_rate, max_rate);

            state.last_request[axis] = Some(request);
            RateController::set_target(rate_state, axis, request);
        }
    }
}

impl Default for DirectionController {
    fn default() -> Self {
        Self::new(PidGains::default())
    }
}
