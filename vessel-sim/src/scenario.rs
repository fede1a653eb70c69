//! Closed-loop runs of the cascade against a simulated vessel.

use crate::parts::PartSet;
use crate::rigid_body::RigidBody;
use crate::{SimError, SimResult};
use fbw::{
    ActuationLayer, AxisCommands, MomentOfInertia, Navigation, Telemetry, VesselControlState,
};
use log::{debug, info};
use nalgebra::Vector3;
use serde::Serialize;
use std::path::Path;

/// A simulated vessel: rigid body plus attached parts.
#[derive(Debug, Clone)]
pub struct Vessel {
    pub body: RigidBody,
    pub parts: PartSet,
    /// Held fixed over a run; orbital motion is not propagated
    pub navigation: Option<Navigation>,
}

impl Vessel {
    pub fn new(body: RigidBody, parts: PartSet) -> Self {
        Self {
            body,
            parts,
            navigation: None,
        }
    }

    /// Vessel at rest with one reaction wheel per axis.
    ///
    /// Wheel torques are sized so full authority over one second reaches
    /// `max_rate` (rad/s) on every axis. The yaw wheel is split in two halves
    /// so tests can damage it partially.
    pub fn with_reaction_wheels(inertia: f64, max_rate: f64) -> Self {
        let torque = max_rate * inertia;
        let mut parts = PartSet::new();
        parts.add(Vector3::new(torque, 0.0, 0.0));
        parts.add(Vector3::new(0.0, torque / 2.0, 0.0));
        parts.add(Vector3::new(0.0, torque / 2.0, 0.0));
        parts.add(Vector3::new(0.0, 0.0, torque));
        Self::new(RigidBody::at_rest(MomentOfInertia::Scalar(inertia)), parts)
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = Some(navigation);
        self
    }

    pub fn telemetry(&self) -> Telemetry {
        let telemetry = Telemetry::new(
            self.body.orientation,
            self.body.angular_velocity,
            self.parts.capabilities().to_vec(),
            self.body.inertia,
        );
        match self.navigation {
            Some(navigation) => telemetry.with_navigation(navigation),
            None => telemetry,
        }
    }

    /// Rigidly attach another vessel.
    ///
    /// Inertias add as if both shared a centre of mass, and the combined
    /// body keeps this vessel's attitude and rates.
    pub fn dock(&mut self, other: Vessel) -> SimResult<()> {
        self.body.inertia = combine_inertia(self.body.inertia, other.body.inertia)?;
        let ids = self.parts.dock(other.parts);
        info!("docked {} parts", ids.len());
        Ok(())
    }
}

fn combine_inertia(a: MomentOfInertia, b: MomentOfInertia) -> SimResult<MomentOfInertia> {
    use MomentOfInertia::{Scalar, Tensor};
    for value in [a, b] {
        if let Scalar(value) = value {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidInertia(value));
            }
        }
    }
    Ok(match (a, b) {
        (Scalar(a), Scalar(b)) => Scalar(a + b),
        (Scalar(s), Tensor(t)) | (Tensor(t), Scalar(s)) => {
            Tensor(t + nalgebra::Matrix3::from_diagonal_element(s))
        }
        (Tensor(a), Tensor(b)) => Tensor(a + b),
    })
}

/// One recorded tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time_s: f64,
    /// Body to world quaternion as [w, i, j, k]
    pub orientation: [f64; 4],
    pub angular_velocity: [f64; 3],
    pub commands: [f64; 3],
    pub has_authority: bool,
}

/// Vessel plus its control state, stepped together.
#[derive(Debug)]
pub struct Simulation {
    pub vessel: Vessel,
    pub control: VesselControlState,
    dt: f64,
    time_s: f64,
    record: bool,
    samples: Vec<Sample>,
}

impl Simulation {
    pub fn new(vessel: Vessel, control: VesselControlState, dt: f64) -> Self {
        Self {
            vessel,
            control,
            dt,
            time_s: 0.0,
            record: false,
            samples: Vec::new(),
        }
    }

    /// Keep a [`Sample`] for every tick.
    pub fn recording(mut self) -> Self {
        self.record = true;
        self
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// One physics tick: control, actuate, integrate.
    pub fn step(&mut self) -> SimResult<AxisCommands> {
        let telemetry = self.vessel.telemetry();
        let commands = self.control.tick(self.dt, &telemetry);
        let actuations = ActuationLayer::actuate(&commands, &telemetry.parts);
        let torque = ActuationLayer::net_torque(&actuations);
        self.vessel.body.step(&torque, self.dt)?;
        self.time_s += self.dt;

        if self.record {
            let q = self.vessel.body.orientation.quaternion();
            let w = &self.vessel.body.angular_velocity;
            self.samples.push(Sample {
                time_s: self.time_s,
                orientation: [q.w, q.i, q.j, q.k],
                angular_velocity: [w.x, w.y, w.z],
                commands: [commands.pitch, commands.yaw, commands.roll],
                has_authority: self.control.status().has_authority,
            });
        }
        Ok(commands)
    }

    /// Step `ticks` times, returning the last commands.
    pub fn run(&mut self, ticks: usize) -> SimResult<AxisCommands> {
        let mut commands = AxisCommands::default();
        for _ in 0..ticks {
            commands = self.step()?;
        }
        debug!("ran {ticks} ticks to t = {:.2}s", self.time_s);
        Ok(commands)
    }

    /// Write the recorded samples as JSON.
    pub fn save_trajectory(&self, path: &Path) -> SimResult<()> {
        let json = serde_json::to_string_pretty(&self.samples)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fbw::Axis;

    #[test]
    fn test_reaction_wheels_give_requested_max_rate() {
        let vessel = Vessel::with_reaction_wheels(100.0, 0.2);
        let limits = fbw::RateController::default()
            .rate_limits(&vessel.telemetry().parts, &vessel.body.inertia);
        for axis in Axis::ALL {
            assert_relative_eq!(limits.max_rate[axis], 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_idle_vessel_stays_put() {
        let vessel = Vessel::with_reaction_wheels(50.0, 0.1);
        let mut sim = Simulation::new(vessel, VesselControlState::default(), 0.02).recording();
        sim.run(50).unwrap();
        assert_eq!(sim.vessel.body.angular_velocity, Vector3::zeros());
        assert_eq!(sim.samples().len(), 50);
        assert_relative_eq!(sim.time_s(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dock_combines_inertia_and_parts() {
        let mut station = Vessel::with_reaction_wheels(100.0, 0.1);
        let tender = Vessel::with_reaction_wheels(20.0, 0.5);
        station.dock(tender).unwrap();

        assert_eq!(station.parts.len(), 8);
        assert_eq!(station.body.inertia, MomentOfInertia::Scalar(120.0));
    }

    #[test]
    fn test_trajectory_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trajectory.json");
        let mut sim = Simulation::new(
            Vessel::with_reaction_wheels(10.0, 0.1),
            VesselControlState::default(),
            0.1,
        )
        .recording();
        sim.run(3).unwrap();
        sim.save_trajectory(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 3);
    }
}
