//! Leaf of the cascade: normalized axis commands to per-part drive levels.
//!
//! A naive linear amplifier. A command of ±1 drives every contributing part
//! to full output on that axis, however nonlinear the real part is. Closing
//! the loop on the actual response is left to the rate controller.

use crate::axis::{clamp_command, Axis, AxisCommands, PerAxis};
use crate::telemetry::{PartCapability, PartId};
use nalgebra::Vector3;

/// Drive instruction for one part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartActuation {
    pub id: PartId,
    /// Drive level in [-1, 1] per axis, in the part's own sign convention
    pub drive: PerAxis<f64>,
    /// Body-frame torque the part produces at this drive (N·m)
    pub torque: Vector3<f64>,
}

/// Stateless mapping from axis commands to part drives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuationLayer;

impl ActuationLayer {
    /// Distribute commands over every part with capability on a commanded axis.
    ///
    /// Each part's drive on an axis is the command with the sign flipped when
    /// the part's capability is negative, so the produced torque always points
    /// the way the command asks. Parts with no capability at all are skipped.
    pub fn actuate(commands: &AxisCommands, parts: &[PartCapability]) -> Vec<PartActuation> {
        let commands = commands.map(clamp_command);

        parts
            .iter()
            .filter(|part| Axis::ALL.iter().any(|&axis| part.on_axis(axis) != 0.0))
            .map(|part| {
                let drive = PerAxis::from_fn(|axis| {
                    let capability = part.on_axis(axis);
                    if capability == 0.0 {
                        0.0
                    } else {
                        commands[axis] * capability.signum()
                    }
                });
                let torque = PerAxis::from_fn(|axis| commands[axis] * part.on_axis(axis).abs());
                PartActuation {
                    id: part.id,
                    drive,
                    torque: torque.to_vector(),
                }
            })
            .collect()
    }

    /// Total torque magnitude available per axis.
    pub fn torque_authority(parts: &[PartCapability]) -> PerAxis<f64> {
        PerAxis::from_fn(|axis| parts.iter().map(|part| part.on_axis(axis).abs()).sum())
    }

    /// Sum of the torques produced by a set of actuations.
    pub fn net_torque(actuations: &[PartActuation]) -> Vector3<f64> {
        actuations
            .iter()
            .fold(Vector3::zeros(), |total, actuation| total + actuation.torque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parts() -> Vec<PartCapability> {
        vec![
            PartCapability::new(1, Vector3::new(4.0, 0.0, 1.0)),
            PartCapability::new(2, Vector3::new(-2.0, 3.0, 0.0)),
            PartCapability::new(3, Vector3::zeros()),
        ]
    }

    #[test]
    fn test_full_command_drives_every_contributor_fully() {
        let commands = AxisCommands::new(1.0, -1.0, 1.0);
        let out = ActuationLayer::actuate(&commands, &parts());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].drive, PerAxis::new(1.0, 0.0, 1.0));
        assert_eq!(out[1].drive, PerAxis::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(
            ActuationLayer::net_torque(&out),
            Vector3::new(6.0, -3.0, 1.0)
        );
    }

    #[test]
    fn test_output_scales_linearly() {
        let commands = AxisCommands::new(0.25, 0.5, 0.0);
        let out = ActuationLayer::actuate(&commands, &parts());
        assert_relative_eq!(out[0].torque, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(out[1].torque, Vector3::new(0.5, 1.5, 0.0));
    }

    #[test]
    fn test_out_of_range_commands_are_clamped() {
        let commands = AxisCommands::new(5.0, f64::NAN, -3.0);
        let out = ActuationLayer::actuate(&commands, &parts());
        for actuation in &out {
            for (_, drive) in actuation.drive.iter() {
                assert!((-1.0..=1.0).contains(drive));
            }
        }
        assert_relative_eq!(
            ActuationLayer::net_torque(&out),
            Vector3::new(6.0, 0.0, -1.0)
        );
    }

    #[test]
    fn test_torque_authority_sums_magnitudes() {
        let authority = ActuationLayer::torque_authority(&parts());
        assert_eq!(authority, PerAxis::new(6.0, 3.0, 1.0));
        assert_eq!(
            ActuationLayer::torque_authority(&[]),
            PerAxis::splat(0.0)
        );
    }
}
