//! Body axes and per-axis containers.
//!
//! Commands, rates and errors are always decomposed in the vessel's local
//! frame. Pitch rotates about body +X, yaw about body +Y and roll about body
//! +Z. The vessel points along -Z with its top along +Y.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Rotation axis in the vessel body frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Pitch,
    Yaw,
    Roll,
}

impl Axis {
    /// All axes in pitch, yaw, roll order.
    pub const ALL: [Axis; 3] = [Axis::Pitch, Axis::Yaw, Axis::Roll];

    /// Component index of this axis in a body-frame vector.
    pub fn index(self) -> usize {
        match self {
            Axis::Pitch => 0,
            Axis::Yaw => 1,
            Axis::Roll => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Pitch => "pitch",
            Axis::Yaw => "yaw",
            Axis::Roll => "roll",
        };
        f.pad(name)
    }
}

/// One value per body axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerAxis<T> {
    pub pitch: T,
    pub yaw: T,
    pub roll: T,
}

impl<T> PerAxis<T> {
    pub fn new(pitch: T, yaw: T, roll: T) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Build a container by evaluating `f` once per axis.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            pitch: f(Axis::Pitch),
            yaw: f(Axis::Yaw),
            roll: f(Axis::Roll),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerAxis<U> {
        PerAxis {
            pitch: f(self.pitch),
            yaw: f(self.yaw),
            roll: f(self.roll),
        }
    }

    /// Iterate `(axis, value)` pairs in pitch, yaw, roll order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        Axis::ALL.into_iter().map(move |axis| (axis, &self[axis]))
    }
}

impl<T: Clone> PerAxis<T> {
    /// Same value on every axis.
    pub fn splat(value: T) -> Self {
        Self {
            pitch: value.clone(),
            yaw: value.clone(),
            roll: value,
        }
    }
}

impl PerAxis<bool> {
    pub fn all(&self) -> bool {
        self.pitch && self.yaw && self.roll
    }

    pub fn any(&self) -> bool {
        self.pitch || self.yaw || self.roll
    }
}

impl PerAxis<f64> {
    /// Read the body-frame components of a vector.
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.pitch, self.yaw, self.roll)
    }
}

impl<T> Index<Axis> for PerAxis<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Yaw => &self.yaw,
            Axis::Roll => &self.roll,
        }
    }
}

impl<T> IndexMut<Axis> for PerAxis<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Pitch => &mut self.pitch,
            Axis::Yaw => &mut self.yaw,
            Axis::Roll => &mut self.roll,
        }
    }
}

/// Normalized per-axis demand. Every value lies in [-1, 1].
pub type AxisCommands = PerAxis<f64>;

/// Clamp a raw demand into [-1, 1]. NaN maps to zero.
pub fn clamp_command(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Body-frame forward direction.
pub fn body_forward() -> Vector3<f64> {
    -Vector3::z()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_index_matches_vector_components() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let per_axis = PerAxis::from_vector(&v);
        for axis in Axis::ALL {
            assert_eq!(per_axis[axis], v[axis.index()]);
        }
        assert_eq!(per_axis.to_vector(), v);
    }

    #[test]
    fn test_clamp_command() {
        assert_eq!(clamp_command(2.5), 1.0);
        assert_eq!(clamp_command(-7.0), -1.0);
        assert_eq!(clamp_command(0.25), 0.25);
        assert_eq!(clamp_command(f64::NAN), 0.0);
        assert_eq!(clamp_command(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_iter_order() {
        let values = PerAxis::new('p', 'y', 'r');
        let collected: Vec<_> = values.iter().map(|(axis, v)| (axis, *v)).collect();
        assert_eq!(
            collected,
            vec![(Axis::Pitch, 'p'), (Axis::Yaw, 'y'), (Axis::Roll, 'r')]
        );
    }

    #[test]
    fn test_bool_reductions() {
        assert!(PerAxis::splat(true).all());
        assert!(!PerAxis::new(true, false, true).all());
        assert!(PerAxis::new(false, false, true).any());
        assert!(!PerAxis::<bool>::default().any());
    }
}
