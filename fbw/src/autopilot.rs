//! Goal generators feeding the direction loop.
//!
//! Goals are a closed enum dispatched with an exhaustive `match`. Anything
//! outside the built-in set goes through [`TargetStrategy`] implementations
//! registered on the vessel's own [`CustomStrategies`] table.

use crate::direction::geometry::{look_along, perpendicular_hint};
use crate::direction::DirectionTarget;
use crate::error::{InputRejected, TargetUnavailable};
use crate::telemetry::{Navigation, Telemetry};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Vectors shorter than this are treated as missing.
const MIN_VECTOR_NORM: f64 = 1e-9;

/// What the autopilot is trying to do. Exactly one per vessel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AutopilotGoal {
    /// No target. Rate targets hold wherever they were left.
    #[default]
    Inactive,
    HoldDirection(DirectionTarget),
    HoldPrograde,
    HoldRetrograde,
    /// Along the orbital angular momentum
    HoldNormal,
    /// Compass heading and pitch above the local horizon, both in radians
    HoldSurfaceHeading { heading: f64, pitch: f64 },
    /// A strategy registered under this id
    Custom(String),
}

impl AutopilotGoal {
    pub fn is_active(&self) -> bool {
        !matches!(self, AutopilotGoal::Inactive)
    }

    pub fn validate(&self) -> Result<(), InputRejected> {
        match self {
            AutopilotGoal::HoldDirection(target) => target.validate(),
            AutopilotGoal::HoldSurfaceHeading { heading, pitch } => {
                if heading.is_finite() && pitch.is_finite() {
                    Ok(())
                } else {
                    Err(InputRejected::InvalidHeading {
                        heading: *heading,
                        pitch: *pitch,
                    })
                }
            }
            AutopilotGoal::Custom(id) if id.is_empty() => Err(InputRejected::EmptyStrategyId),
            _ => Ok(()),
        }
    }

    /// Target for this tick.
    ///
    /// Returns `None` for [`AutopilotGoal::Inactive`], which sets no target.
    /// Returns `Some(Err)` when the goal cannot be evaluated from this
    /// telemetry; the caller keeps its previous target.
    pub fn compute_target(
        &self,
        telemetry: &Telemetry,
        custom: &mut CustomStrategies,
    ) -> Option<Result<DirectionTarget, TargetUnavailable>> {
        let result = match self {
            AutopilotGoal::Inactive => return None,
            AutopilotGoal::HoldDirection(target) => Ok(*target),
            AutopilotGoal::HoldPrograde => navigation(telemetry)
                .and_then(|nav| velocity_target(nav, 1.0)),
            AutopilotGoal::HoldRetrograde => navigation(telemetry)
                .and_then(|nav| velocity_target(nav, -1.0)),
            AutopilotGoal::HoldNormal => navigation(telemetry).and_then(normal_target),
            AutopilotGoal::HoldSurfaceHeading { heading, pitch } => navigation(telemetry)
                .and_then(|nav| surface_heading_target(nav, *heading, *pitch)),
            AutopilotGoal::Custom(id) => custom.compute(id, telemetry),
        };
        Some(result)
    }
}

impl fmt::Display for AutopilotGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutopilotGoal::Inactive => write!(f, "inactive"),
            AutopilotGoal::HoldDirection(_) => write!(f, "hold direction"),
            AutopilotGoal::HoldPrograde => write!(f, "hold prograde"),
            AutopilotGoal::HoldRetrograde => write!(f, "hold retrograde"),
            AutopilotGoal::HoldNormal => write!(f, "hold normal"),
            AutopilotGoal::HoldSurfaceHeading { heading, pitch } => write!(
                f,
                "hold heading {:.1}° pitch {:.1}°",
                heading.to_degrees(),
                pitch.to_degrees()
            ),
            AutopilotGoal::Custom(id) => write!(f, "custom {id:?}"),
        }
    }
}

/// A goal generator outside the built-in set.
///
/// Implementations are owned by one vessel's control state and may keep
/// their own state between ticks.
pub trait TargetStrategy: Send {
    fn compute_target(&mut self, telemetry: &Telemetry)
        -> Result<DirectionTarget, TargetUnavailable>;
}

impl<F> TargetStrategy for F
where
    F: FnMut(&Telemetry) -> Result<DirectionTarget, TargetUnavailable> + Send,
{
    fn compute_target(
        &mut self,
        telemetry: &Telemetry,
    ) -> Result<DirectionTarget, TargetUnavailable> {
        self(telemetry)
    }
}

/// Per-vessel table of custom strategies, keyed by id.
#[derive(Default)]
pub struct CustomStrategies {
    strategies: HashMap<String, Box<dyn TargetStrategy>>,
}

impl CustomStrategies {
    /// Register a strategy, returning true if it replaced an existing one.
    pub fn register(&mut self, id: impl Into<String>, strategy: Box<dyn TargetStrategy>) -> bool {
        self.strategies.insert(id.into(), strategy).is_some()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.strategies.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn compute(
        &mut self,
        id: &str,
        telemetry: &Telemetry,
    ) -> Result<DirectionTarget, TargetUnavailable> {
        let strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| TargetUnavailable::UnknownStrategy(id.to_string()))?;
        strategy.compute_target(telemetry)
    }
}

impl fmt::Debug for CustomStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStrategies")
            .field("ids", &self.ids())
            .finish()
    }
}

fn navigation(telemetry: &Telemetry) -> Result<&Navigation, TargetUnavailable> {
    telemetry
        .navigation
        .as_ref()
        .ok_or(TargetUnavailable::NoNavigation)
}

/// Free-roll target along `direction`, top leaning toward `up_hint`.
fn pointing_target(
    direction: &Vector3<f64>,
    up_hint: &Vector3<f64>,
    what: &'static str,
) -> Result<DirectionTarget, TargetUnavailable> {
    if direction.norm() < MIN_VECTOR_NORM {
        return Err(TargetUnavailable::Degenerate(what));
    }
    let orientation = look_along(direction, up_hint)
        .or_else(|| look_along(direction, &perpendicular_hint(direction)))
        .ok_or(TargetUnavailable::Degenerate(what))?;
    Ok(DirectionTarget::free_roll(orientation))
}

fn velocity_target(nav: &Navigation, sign: f64) -> Result<DirectionTarget, TargetUnavailable> {
    pointing_target(&(nav.velocity() * sign), &nav.position, "velocity")
}

fn normal_target(nav: &Navigation) -> Result<DirectionTarget, TargetUnavailable> {
    let normal = nav.position.cross(&nav.orbital_velocity);
    pointing_target(&normal, &nav.position, "orbit normal")
}

/// Point along a compass heading, pitched above the local horizon.
///
/// North is the spin axis projected onto the horizon. At the poles, where
/// that projection vanishes, world +X stands in for the spin axis.
fn surface_heading_target(
    nav: &Navigation,
    heading: f64,
    pitch: f64,
) -> Result<DirectionTarget, TargetUnavailable> {
    let up = nav
        .position
        .try_normalize(MIN_VECTOR_NORM)
        .ok_or(TargetUnavailable::Degenerate("position"))?;

    let project = |v: Vector3<f64>| (v - up * v.dot(&up)).try_normalize(MIN_VECTOR_NORM);
    let north = project(nav.spin_axis)
        .or_else(|| project(Vector3::x()))
        .or_else(|| project(Vector3::y()))
        .ok_or(TargetUnavailable::Degenerate("horizon"))?;
    let east = north.cross(&up);

    let horizontal = north * heading.cos() + east * heading.sin();
    let direction = horizontal * pitch.cos() + up * pitch.sin();
    let hint = if pitch.cos().abs() < 1e-6 { horizontal } else { up };
    pointing_target(&direction, &hint, "heading")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MomentOfInertia, VelocityFrame};
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_2;

    fn telemetry_with(nav: Option<Navigation>) -> Telemetry {
        let telemetry = Telemetry::new(
            UnitQuaternion::identity(),
            Vector3::zeros(),
            Vec::new(),
            MomentOfInertia::Scalar(1.0),
        );
        match nav {
            Some(nav) => telemetry.with_navigation(nav),
            None => telemetry,
        }
    }

    fn circular_orbit() -> Navigation {
        Navigation::orbital(Vector3::new(7.0e6, 0.0, 0.0), Vector3::new(0.0, 7.5e3, 0.0))
    }

    fn target_forward(goal: &AutopilotGoal, nav: Navigation) -> Vector3<f64> {
        let mut custom = CustomStrategies::default();
        goal.compute_target(&telemetry_with(Some(nav)), &mut custom)
            .expect("goal is active")
            .expect("target available")
            .forward()
    }

    #[test]
    fn test_inactive_sets_no_target() {
        let mut custom = CustomStrategies::default();
        let telemetry = telemetry_with(Some(circular_orbit()));
        assert!(AutopilotGoal::Inactive
            .compute_target(&telemetry, &mut custom)
            .is_none());
        assert!(!AutopilotGoal::Inactive.is_active());
    }

    #[test]
    fn test_hold_direction_passes_target_through() {
        let target = DirectionTarget::roll_locked(
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            0.4,
        );
        let mut custom = CustomStrategies::default();
        let result = AutopilotGoal::HoldDirection(target)
            .compute_target(&telemetry_with(None), &mut custom);
        assert_eq!(result, Some(Ok(target)));
    }

    #[test]
    fn test_prograde_and_retrograde_follow_velocity() {
        let nav = circular_orbit();
        let prograde = target_forward(&AutopilotGoal::HoldPrograde, nav);
        let retrograde = target_forward(&AutopilotGoal::HoldRetrograde, nav);
        assert_relative_eq!(prograde, Vector3::y(), epsilon = 1e-9);
        assert_relative_eq!(retrograde, -Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_surface_frame_prograde() {
        let nav = circular_orbit()
            .with_surface(Vector3::new(0.0, 0.0, 300.0), Vector3::z())
            .in_frame(VelocityFrame::Surface);
        let forward = target_forward(&AutopilotGoal::HoldPrograde, nav);
        assert_relative_eq!(forward, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn test_normal_follows_angular_momentum() {
        let forward = target_forward(&AutopilotGoal::HoldNormal, circular_orbit());
        assert_relative_eq!(forward, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn test_prograde_targets_are_free_roll() {
        let mut custom = CustomStrategies::default();
        let target = AutopilotGoal::HoldPrograde
            .compute_target(&telemetry_with(Some(circular_orbit())), &mut custom)
            .unwrap()
            .unwrap();
        assert_eq!(target.roll_reference, None);
    }

    #[test]
    fn test_radial_velocity_still_gives_target() {
        let nav = Navigation::orbital(Vector3::new(7.0e6, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0));
        let forward = target_forward(&AutopilotGoal::HoldPrograde, nav);
        assert_relative_eq!(forward, Vector3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_surface_heading_on_equator() {
        // Standing on +X with the body spinning about +Z: north is +Z, east is +Y
        let nav = Navigation::orbital(Vector3::new(6.4e6, 0.0, 0.0), Vector3::zeros());

        let north = target_forward(
            &AutopilotGoal::HoldSurfaceHeading {
                heading: 0.0,
                pitch: 0.0,
            },
            nav,
        );
        assert_relative_eq!(north, Vector3::z(), epsilon = 1e-9);

        let east = target_forward(
            &AutopilotGoal::HoldSurfaceHeading {
                heading: FRAC_PI_2,
                pitch: 0.0,
            },
            nav,
        );
        assert_relative_eq!(east, Vector3::y(), epsilon = 1e-9);

        let up = target_forward(
            &AutopilotGoal::HoldSurfaceHeading {
                heading: 0.3,
                pitch: FRAC_PI_2,
            },
            nav,
        );
        assert_relative_eq!(up, Vector3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_surface_heading_at_pole_uses_fallback_north() {
        let nav = Navigation::orbital(Vector3::new(0.0, 0.0, 6.4e6), Vector3::zeros());
        let forward = target_forward(
            &AutopilotGoal::HoldSurfaceHeading {
                heading: 0.0,
                pitch: 0.0,
            },
            nav,
        );
        assert_relative_eq!(forward, Vector3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_missing_navigation_is_unavailable() {
        let mut custom = CustomStrategies::default();
        let telemetry = telemetry_with(None);
        for goal in [
            AutopilotGoal::HoldPrograde,
            AutopilotGoal::HoldRetrograde,
            AutopilotGoal::HoldNormal,
            AutopilotGoal::HoldSurfaceHeading {
                heading: 0.0,
                pitch: 0.0,
            },
        ] {
            assert_eq!(
                goal.compute_target(&telemetry, &mut custom),
                Some(Err(TargetUnavailable::NoNavigation))
            );
        }
    }

    #[test]
    fn test_zero_velocity_is_degenerate() {
        let mut custom = CustomStrategies::default();
        let nav = Navigation::orbital(Vector3::new(7.0e6, 0.0, 0.0), Vector3::zeros());
        let result = AutopilotGoal::HoldPrograde
            .compute_target(&telemetry_with(Some(nav)), &mut custom);
        assert_eq!(result, Some(Err(TargetUnavailable::Degenerate("velocity"))));
    }

    #[test]
    fn test_custom_strategy_dispatch() {
        let mut custom = CustomStrategies::default();
        let fixed = DirectionTarget::free_roll(UnitQuaternion::from_euler_angles(0.0, 0.5, 0.0));
        assert!(!custom.register(
            "sun",
            Box::new(
                move |_: &Telemetry| -> Result<DirectionTarget, TargetUnavailable> { Ok(fixed) }
            )
        ));
        assert!(custom.contains("sun"));
        assert_eq!(custom.ids(), vec!["sun"]);

        let telemetry = telemetry_with(None);
        let goal = AutopilotGoal::Custom("sun".to_string());
        assert_eq!(goal.compute_target(&telemetry, &mut custom), Some(Ok(fixed)));

        let missing = AutopilotGoal::Custom("moon".to_string());
        assert_eq!(
            missing.compute_target(&telemetry, &mut custom),
            Some(Err(TargetUnavailable::UnknownStrategy("moon".to_string())))
        );
    }

    #[test]
    fn test_validate_goals() {
        assert!(AutopilotGoal::HoldNormal.validate().is_ok());
        assert_eq!(
            AutopilotGoal::Custom(String::new()).validate(),
            Err(InputRejected::EmptyStrategyId)
        );
        assert!(AutopilotGoal::HoldSurfaceHeading {
            heading: f64::NAN,
            pitch: 0.0
        }
        .validate()
        .is_err());
    }
}
