//! Single-axis PID law shared by the rate and direction loops.
//!
//! The law itself is stateless; integrator and derivative history live in a
//! [`PidState`] owned by the caller's loop state.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains plus the integrator bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Largest magnitude the accumulated integral may reach
    pub integral_limit: f64,
}

impl PidGains {
    pub const DEFAULT_INTEGRAL_LIMIT: f64 = 0.5;

    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit: Self::DEFAULT_INTEGRAL_LIMIT,
        }
    }

    pub fn with_integral_limit(mut self, integral_limit: f64) -> Self {
        self.integral_limit = integral_limit;
        self
    }

    /// All gains must be finite and non-negative.
    pub fn validate(&self, field: &'static str) -> ConfigResult<()> {
        let values = [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("integral_limit", self.integral_limit),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{name} must be finite and non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(2.0, 0.0, 0.5)
    }
}

/// Where the derivative term takes its slope from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeSource {
    /// Slope of the error. Reacts to setpoint moves.
    Error,
    /// Negated slope of the measurement. No kick when the setpoint jumps.
    Measurement,
}

/// Integrator and derivative history for one axis of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidState {
    integral: f64,
    last_error: Option<f64>,
    last_measurement: Option<f64>,
}

impl PidState {
    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of one PID step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidOutput {
    /// Output clamped to the caller's limit
    pub value: f64,
    /// Whether the unclamped output exceeded the limit
    pub saturated: bool,
}

/// PID law with conditional-integration anti-windup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pid {
    pub gains: PidGains,
    pub derivative: DerivativeSource,
}

impl Pid {
    pub fn new(gains: PidGains, derivative: DerivativeSource) -> Self {
        Self { gains, derivative }
    }

    /// Advance one tick.
    ///
    /// The derivative is zero on the first step after a reset. Integration
    /// is frozen while the output sits on `limit` and the error pushes it
    /// further out.
    ///
    /// # Arguments
    ///
    /// * `state` - History for this axis, updated in place
    /// * `error` - Setpoint minus measurement
    /// * `measurement` - Measured value, used by [`DerivativeSource::Measurement`]
    /// * `dt` - Timestep in seconds, must be positive
    /// * `limit` - Symmetric output bound, must be positive
    pub fn update(
        &self,
        state: &mut PidState,
        error: f64,
        measurement: f64,
        dt: f64,
        limit: f64,
    ) -> PidOutput {
        let derivative = match self.derivative {
            DerivativeSource::Error => state.last_error.map_or(0.0, |prev| (error - prev) / dt),
            DerivativeSource::Measurement => state
                .last_measurement
                .map_or(0.0, |prev| -(measurement - prev) / dt),
        };
        state.last_error = Some(error);
        state.last_measurement = Some(measurement);

        let proportional_derivative = self.gains.kp * error + self.gains.kd * derivative;
        let bound = self.gains.integral_limit;
        let candidate = (state.integral + error * dt).clamp(-bound, bound);
        let raw = proportional_derivative + self.gains.ki * candidate;
        let saturated = raw.abs() > limit;

        if !(saturated && error.signum() == raw.signum()) {
            state.integral = candidate;
        }

        let value = proportional_derivative + self.gains.ki * state.integral;
        if !value.is_finite() {
            state.reset();
            return PidOutput {
                value: 0.0,
                saturated: false,
            };
        }

        PidOutput {
            value: value.clamp(-limit, limit),
            saturated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 0.02;

    #[test]
    fn test_proportional_only() {
        let pid = Pid::new(PidGains::new(2.0, 0.0, 0.0), DerivativeSource::Error);
        let mut state = PidState::default();
        let out = pid.update(&mut state, 0.25, 0.0, DT, 1.0);
        assert_relative_eq!(out.value, 0.5);
        assert!(!out.saturated);
    }

    #[test]
    fn test_first_step_has_no_derivative() {
        let pid = Pid::new(PidGains::new(0.0, 0.0, 1.0), DerivativeSource::Error);
        let mut state = PidState::default();
        assert_eq!(pid.update(&mut state, 0.3, 0.0, DT, 10.0).value, 0.0);

        let second = pid.update(&mut state, 0.4, 0.0, DT, 10.0);
        assert_relative_eq!(second.value, 0.1 / DT, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_on_measurement_ignores_setpoint_jump() {
        let pid = Pid::new(PidGains::new(0.0, 0.0, 1.0), DerivativeSource::Measurement);
        let mut state = PidState::default();
        pid.update(&mut state, 0.0, 0.5, DT, 10.0);
        // Error jumps while the measurement holds still
        let out = pid.update(&mut state, 3.0, 0.5, DT, 10.0);
        assert_eq!(out.value, 0.0);

        let moving = pid.update(&mut state, 3.0, 0.6, DT, 10.0);
        assert_relative_eq!(moving.value, -0.1 / DT, epsilon = 1e-9);
    }

    #[test]
    fn test_integrator_respects_limit() {
        let gains = PidGains::new(0.0, 1.0, 0.0).with_integral_limit(0.1);
        let pid = Pid::new(gains, DerivativeSource::Error);
        let mut state = PidState::default();
        for _ in 0..1000 {
            pid.update(&mut state, 1.0, 0.0, DT, 100.0);
        }
        assert_relative_eq!(state.integral(), 0.1);
    }

    #[test]
    fn test_integrator_freezes_while_saturated() {
        let gains = PidGains::new(0.0, 10.0, 0.0).with_integral_limit(5.0);
        let pid = Pid::new(gains, DerivativeSource::Error);
        let mut state = PidState::default();
        for _ in 0..50 {
            pid.update(&mut state, 1.0, 0.0, DT, 1.0);
        }
        // Output limit 1.0 is reached at an integral of 0.1
        assert!(state.integral() <= 0.1 + 1e-12);
        assert!(state.integral() >= 0.08 - 1e-12);

        // Error reversing unwinds immediately
        let before = state.integral();
        let out = pid.update(&mut state, -1.0, 0.0, DT, 1.0);
        assert!(!out.saturated);
        assert_relative_eq!(state.integral(), before - DT, epsilon = 1e-12);
    }

    #[test]
    fn test_output_clamped_to_limit() {
        let pid = Pid::new(PidGains::default(), DerivativeSource::Error);
        let mut state = PidState::default();
        let out = pid.update(&mut state, -100.0, 0.0, DT, 0.3);
        assert_eq!(out.value, -0.3);
        assert!(out.saturated);
    }

    #[test]
    fn test_non_finite_output_resets() {
        let pid = Pid::new(PidGains::default(), DerivativeSource::Error);
        let mut state = PidState::default();
        pid.update(&mut state, 0.1, 0.0, DT, 1.0);
        let out = pid.update(&mut state, f64::INFINITY, 0.0, DT, 1.0);
        assert_eq!(out.value, 0.0);
        assert_eq!(state, PidState::default());
    }

    #[test]
    fn test_validate_gains() {
        assert!(PidGains::default().validate("rate_gains").is_ok());
        assert!(PidGains::new(-1.0, 0.0, 0.0).validate("rate_gains").is_err());
        assert!(PidGains::new(1.0, f64::NAN, 0.0)
            .validate("rate_gains")
            .is_err());
    }
}
