//! Attitude error between the current orientation and a direction target.
//!
//! Errors are body-frame rotation vectors: the component on each axis is the
//! angle (rad) to turn about that body axis.

use super::DirectionTarget;
use crate::axis::body_forward;
use nalgebra::{UnitQuaternion, Vector3};
use std::f64::consts::PI;

/// Below this sine the forward vectors are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Per-axis error for a direction target.
///
/// Free-roll targets only align the forward axis, so the roll component is
/// always zero. Roll-locked targets align the full orientation.
pub fn attitude_error(current: &UnitQuaternion<f64>, target: &DirectionTarget) -> Vector3<f64> {
    match target.roll_reference {
        None => pointing_error(current, &target.orientation),
        Some(_) => orientation_error(current, &target.reference_orientation()),
    }
}

/// Smallest rotation carrying the current forward axis onto the target's.
///
/// When the two point exactly opposite ways the turn is a half revolution
/// about body pitch.
pub fn pointing_error(current: &UnitQuaternion<f64>, target: &UnitQuaternion<f64>) -> Vector3<f64> {
    if current == target {
        return Vector3::zeros();
    }
    let relative = current.inverse() * target;
    let wanted = relative * body_forward();
    let forward = body_forward();

    let axis = forward.cross(&wanted);
    let sin = axis.norm();
    let cos = forward.dot(&wanted);

    if sin <= PARALLEL_EPSILON {
        if cos >= 0.0 {
            return Vector3::zeros();
        }
        return Vector3::x() * PI;
    }
    axis * (sin.atan2(cos) / sin)
}

/// Shortest-arc rotation vector from `current` to `target`, in body frame.
///
/// At exactly half a turn both hemispheres are equally short. The one whose
/// first nonzero axis component (pitch, yaw, roll order) is positive wins.
pub fn orientation_error(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    if current == target {
        return Vector3::zeros();
    }
    let relative = (current.inverse() * target).into_inner();
    let mut w = relative.scalar();
    let mut v = relative.imag();

    let first_nonzero = v.iter().copied().find(|c| *c != 0.0).unwrap_or(0.0);
    if w < 0.0 || (w == 0.0 && first_nonzero < 0.0) {
        w = -w;
        v = -v;
    }

    let sin_half = v.norm();
    if sin_half == 0.0 {
        return Vector3::zeros();
    }
    v * (2.0 * sin_half.atan2(w) / sin_half)
}

/// Rotation turning the body by `roll` rad about its own forward axis.
pub fn roll_about_forward(roll: f64) -> UnitQuaternion<f64> {
    // Forward is -Z, so a positive roll about forward is negative about +Z
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -roll)
}

/// Orientation pointing the body forward axis along `forward`.
///
/// `up_hint` sets the roll: the body top leans toward it. Returns `None`
/// when `forward` is degenerate or parallel to the hint.
pub fn look_along(forward: &Vector3<f64>, up_hint: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    let forward = forward.try_normalize(PARALLEL_EPSILON)?;
    if up_hint.cross(&forward).norm() <= PARALLEL_EPSILON * up_hint.norm().max(1.0) {
        return None;
    }
    // face_towards maps body +Z onto its direction, and body forward is -Z
    Some(UnitQuaternion::face_towards(&-forward, up_hint))
}

/// Some world axis not parallel to `direction`.
pub fn perpendicular_hint(direction: &Vector3<f64>) -> Vector3<f64> {
    if direction.x.abs() < 0.9 * direction.norm() {
        Vector3::x()
    } else {
        Vector3::y()
    }
}
