//! Rotational state of one rigid body.

use crate::{SimError, SimResult};
use fbw::MomentOfInertia;
use nalgebra::{UnitQuaternion, Vector3};

/// Orientation and body-frame angular velocity of a vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Body to world rotation
    pub orientation: UnitQuaternion<f64>,
    /// Body-frame angular velocity (rad/s)
    pub angular_velocity: Vector3<f64>,
    pub inertia: MomentOfInertia,
}

impl RigidBody {
    pub fn at_rest(inertia: MomentOfInertia) -> Self {
        Self {
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            inertia,
        }
    }

    /// Angular acceleration produced by a body-frame torque.
    pub fn angular_acceleration(&self, torque: &Vector3<f64>) -> SimResult<Vector3<f64>> {
        match self.inertia {
            MomentOfInertia::Scalar(value) => {
                if !(value.is_finite() && value > 0.0) {
                    return Err(SimError::InvalidInertia(value));
                }
                Ok(torque / value)
            }
            MomentOfInertia::Tensor(tensor) => {
                let inverse = tensor.try_inverse().ok_or(SimError::SingularInertia)?;
                Ok(inverse * torque)
            }
        }
    }

    /// Advance by `dt` seconds under a constant torque.
    ///
    /// Semi-implicit Euler: the rate is updated first and the orientation is
    /// then rotated by the new rate.
    pub fn step(&mut self, torque: &Vector3<f64>, dt: f64) -> SimResult<()> {
        self.angular_velocity += self.angular_acceleration(torque)? * dt;
        self.orientation *= UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);
        self.orientation.renormalize();
        Ok(())
    }
}
