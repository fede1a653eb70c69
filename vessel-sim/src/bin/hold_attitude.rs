//! Slew a simulated vessel to a fixed attitude and hold it
//!
//! Runs the fly-by-wire cascade in closed loop against a rigid body with one
//! reaction wheel per axis. Optionally loses the yaw wheels part way through
//! the run or puts roll under manual control, then reports the final
//! attitude error and the peak body rate seen.

use anyhow::Context;
use clap::Parser;
use fbw::{Axis, AutopilotGoal, DirectionTarget, VesselControlState};
use log::info;
use nalgebra::{UnitQuaternion, Vector3};
use vessel_sim::scenario::{Simulation, Vessel};
use vessel_sim::shared_args::{HeadingArg, SharedSimulationArgs};

#[derive(Parser, Debug)]
#[command(
    name = "Hold Attitude",
    about = "Slews a simulated vessel to a heading and holds it",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    shared: SharedSimulationArgs,

    /// Target heading in degrees as "yaw,pitch"
    #[arg(long, default_value = "90,0")]
    heading: HeadingArg,

    /// Lock roll to this angle in degrees; roll is left free when omitted
    #[arg(long)]
    roll: Option<f64>,

    /// Scalar moment of inertia (kg·m²)
    #[arg(long, default_value_t = 100.0)]
    inertia: f64,

    /// Rate reachable with full authority over one second, in deg/s
    #[arg(long, default_value_t = 10.0)]
    max_rate: f64,

    /// Detach the yaw reaction wheels after this many seconds
    #[arg(long)]
    drop_yaw_at: Option<f64>,

    /// Hold roll under manual control at this fraction of max rate
    #[arg(long)]
    manual_roll: Option<f64>,
}

fn target_orientation(heading: &HeadingArg) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), heading.yaw_deg.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), heading.pitch_deg.to_radians())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Hold Attitude");
    println!("=============");
    println!("Heading: {} (yaw,pitch deg)", args.heading);
    println!("Timestep: {}", args.shared.timestep);
    println!("Duration: {}", args.shared.duration);

    let config = args.shared.control_config()?;
    let mut control =
        VesselControlState::new(config).context("control configuration rejected")?;

    let orientation = target_orientation(&args.heading);
    let target = match args.roll {
        Some(roll) => DirectionTarget::roll_locked(orientation, roll.to_radians()),
        None => DirectionTarget::free_roll(orientation),
    };
    control.set_goal(AutopilotGoal::HoldDirection(target))?;
    if let Some(value) = args.manual_roll {
        control.set_manual_axis(Axis::Roll, value)?;
    }

    let vessel = Vessel::with_reaction_wheels(args.inertia, args.max_rate.to_radians());
    let yaw_wheels: Vec<_> = vessel
        .parts
        .capabilities()
        .iter()
        .filter(|part| part.on_axis(Axis::Yaw) != 0.0)
        .map(|part| part.id)
        .collect();

    let dt = args.shared.timestep.0.as_secs_f64();
    let mut sim = Simulation::new(vessel, control, dt).recording();
    let drop_tick = args.drop_yaw_at.map(|t| (t / dt).round() as usize);
    let mut peak_rate = Vector3::<f64>::zeros();

    for tick in 0..args.shared.ticks() {
        if drop_tick == Some(tick) {
            for id in &yaw_wheels {
                sim.vessel.parts.detach(*id)?;
            }
            info!("yaw wheels detached at t = {:.2}s", sim.time_s());
        }
        sim.step()?;
        peak_rate = peak_rate.zip_map(&sim.vessel.body.angular_velocity, |peak, w| {
            peak.max(w.abs())
        });
    }

    let error = sim
        .control
        .attitude_error(&sim.vessel.telemetry())
        .unwrap_or_else(Vector3::zeros);
    let rate = sim.vessel.body.angular_velocity;

    println!();
    println!("Result after {:.2}s", sim.time_s());
    println!("-------------------");
    for axis in Axis::ALL {
        let i = axis.index();
        println!(
            "{axis:>5}: error {:>8.3}°  rate {:>8.3}°/s  peak rate {:>7.3}°/s",
            error[i].to_degrees(),
            rate[i].to_degrees(),
            peak_rate[i].to_degrees()
        );
    }
    let status = sim.control.status();
    println!("Authority on all axes: {}", status.has_authority);

    if let Some(path) = &args.shared.output {
        sim.save_trajectory(path)
            .with_context(|| format!("writing trajectory to {}", path.display()))?;
        println!("Trajectory written to {}", path.display());
    }

    Ok(())
}
