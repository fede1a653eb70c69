//! Per-tick inputs supplied by the host simulation.

use crate::axis::{body_forward, Axis};
use crate::error::TelemetryError;
use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Identifier of a controllable part, assigned by the host.
pub type PartId = u64;

/// Largest accepted distance of a quaternion norm from one.
pub(crate) const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// Signed torque a part contributes at full drive, per body axis (N·m).
///
/// Zero on axes the part cannot affect. The sign is the part's own
/// convention: a positive drive produces torque of this sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartCapability {
    pub id: PartId,
    pub torque: Vector3<f64>,
}

impl PartCapability {
    pub fn new(id: PartId, torque: Vector3<f64>) -> Self {
        Self { id, torque }
    }

    /// Capability on one axis. Non-finite values count as no capability.
    pub fn on_axis(&self, axis: Axis) -> f64 {
        let value = self.torque[axis.index()];
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

/// Moment of inertia about the body axes (kg·m²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MomentOfInertia {
    Scalar(f64),
    Tensor(Matrix3<f64>),
}

impl MomentOfInertia {
    /// Inertia about one body axis: the scalar, or the tensor's diagonal.
    pub fn about(&self, axis: Axis) -> f64 {
        match self {
            MomentOfInertia::Scalar(value) => *value,
            MomentOfInertia::Tensor(tensor) => tensor[(axis.index(), axis.index())],
        }
    }
}

/// Which velocity prograde and retrograde follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityFrame {
    #[default]
    Orbit,
    Surface,
}

/// Vessel context for goals that depend on where the vessel is going.
///
/// All vectors are world frame, relative to the reference body's centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub position: Vector3<f64>,
    pub orbital_velocity: Vector3<f64>,
    pub surface_velocity: Vector3<f64>,
    /// Reference body rotation axis, pointing to its north pole
    pub spin_axis: Vector3<f64>,
    pub frame: VelocityFrame,
}

impl Navigation {
    /// Orbit-frame navigation around a body spinning about world +Z.
    pub fn orbital(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            position,
            orbital_velocity: velocity,
            surface_velocity: velocity,
            spin_axis: Vector3::z(),
            frame: VelocityFrame::Orbit,
        }
    }

    pub fn with_surface(mut self, surface_velocity: Vector3<f64>, spin_axis: Vector3<f64>) -> Self {
        self.surface_velocity = surface_velocity;
        self.spin_axis = spin_axis;
        self
    }

    pub fn in_frame(mut self, frame: VelocityFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Velocity followed by prograde in the selected frame.
    pub fn velocity(&self) -> Vector3<f64> {
        match self.frame {
            VelocityFrame::Orbit => self.orbital_velocity,
            VelocityFrame::Surface => self.surface_velocity,
        }
    }
}

/// Snapshot of vessel state for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    /// Body to world rotation
    pub orientation: UnitQuaternion<f64>,
    /// Body-frame angular velocity (rad/s)
    pub angular_velocity: Vector3<f64>,
    /// Controllable parts currently attached
    pub parts: Vec<PartCapability>,
    pub inertia: MomentOfInertia,
    pub navigation: Option<Navigation>,
}

impl Telemetry {
    pub fn new(
        orientation: UnitQuaternion<f64>,
        angular_velocity: Vector3<f64>,
        parts: Vec<PartCapability>,
        inertia: MomentOfInertia,
    ) -> Self {
        Self {
            orientation,
            angular_velocity,
            parts,
            inertia,
            navigation: None,
        }
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// World-frame forward direction of the vessel.
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * body_forward()
    }

    /// Check the fields the loops divide and integrate with.
    ///
    /// Part capabilities and inertia are not checked here; invalid values
    /// there simply report zero authority.
    pub fn validate(&self, dt: f64) -> Result<(), TelemetryError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(TelemetryError::InvalidTimestep(dt));
        }
        if !self.orientation.coords.iter().all(|c| c.is_finite()) {
            return Err(TelemetryError::NonFiniteOrientation);
        }
        let norm = self.orientation.coords.norm();
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(TelemetryError::NonUnitOrientation(norm));
        }
        if !self.angular_velocity.iter().all(|c| c.is_finite()) {
            return Err(TelemetryError::NonFiniteAngularVelocity);
        }
        Ok(())
    }
}
