//! Tunable parameters for one vessel's cascade.
//!
//! Stored as pretty-printed JSON. Missing fields fall back to defaults so
//! older files keep loading as fields are added.

use crate::axis::PerAxis;
use crate::error::{ConfigError, ConfigResult};
use crate::pid::PidGains;
use crate::rate::DEFAULT_RATE_HORIZON_S;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a manual axis value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ManualMode {
    /// Value scales the axis max rate and becomes the rate loop target
    #[default]
    RateDemand,
    /// Value is written straight into the axis command
    Direct,
}

/// Gains and limits shared by every loop of one vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Inner loop gains, acting on rate error normalized by authority
    pub rate_gains: PidGains,
    /// Outer loop gains, attitude error (rad) to rate (rad/s)
    pub direction_gains: PidGains,
    /// Seconds of full authority that define the max rate
    pub rate_horizon_s: f64,
    /// Optional fixed cap on max rate per axis (rad/s)
    pub max_rate_ceiling: PerAxis<Option<f64>>,
    pub manual_mode: ManualMode,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            rate_gains: PidGains::default(),
            direction_gains: PidGains::default(),
            rate_horizon_s: DEFAULT_RATE_HORIZON_S,
            max_rate_ceiling: PerAxis::default(),
            manual_mode: ManualMode::RateDemand,
        }
    }
}

impl ControlConfig {
    /// Check every field is usable by the loops.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.rate_gains.validate("rate_gains")?;
        self.direction_gains.validate("direction_gains")?;

        if !(self.rate_horizon_s.is_finite() && self.rate_horizon_s > 0.0) {
            return Err(ConfigError::Invalid {
                field: "rate_horizon_s",
                reason: format!("must be finite and positive, got {}", self.rate_horizon_s),
            });
        }

        for (axis, ceiling) in self.max_rate_ceiling.iter() {
            if let Some(ceiling) = ceiling {
                if !(ceiling.is_finite() && *ceiling > 0.0) {
                    return Err(ConfigError::Invalid {
                        field: "max_rate_ceiling",
                        reason: format!("{axis} ceiling must be finite and positive, got {ceiling}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Save to a JSON file
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file and validate
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        assert!(ControlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control.json");

        let config = ControlConfig {
            rate_gains: PidGains::new(1.5, 0.2, 0.1).with_integral_limit(0.3),
            max_rate_ceiling: PerAxis::new(Some(0.5), None, Some(0.1)),
            manual_mode: ManualMode::Direct,
            ..ControlConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = ControlConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "rate_horizon_s": 2.0 }"#).unwrap();

        let loaded = ControlConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.rate_horizon_s, 2.0);
        assert_eq!(loaded.rate_gains, PidGains::default());
        assert_eq!(loaded.manual_mode, ManualMode::RateDemand);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_horizon = ControlConfig {
            rate_horizon_s: 0.0,
            ..ControlConfig::default()
        };
        assert!(matches!(
            bad_horizon.validate(),
            Err(ConfigError::Invalid {
                field: "rate_horizon_s",
                ..
            })
        ));

        let bad_ceiling = ControlConfig {
            max_rate_ceiling: PerAxis::new(None, Some(-1.0), None),
            ..ControlConfig::default()
        };
        assert!(bad_ceiling.validate().is_err());

        let bad_gains = ControlConfig {
            direction_gains: PidGains::new(f64::INFINITY, 0.0, 0.0),
            ..ControlConfig::default()
        };
        assert!(bad_gains.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "rate_horizon_s": -1.0 }"#).unwrap();
        assert!(ControlConfig::load_from_file(&path).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ControlConfig::load_from_file(&path),
            Err(ConfigError::Json(_))
        ));

        assert!(matches!(
            ControlConfig::load_from_file(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
