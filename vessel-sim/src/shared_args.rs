//! Command line arguments shared by the simulation binaries.

use crate::SimResult;
use clap::Parser;
use fbw::ControlConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Heading in degrees as "yaw,pitch"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingArg {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
}

/// Parse a heading string in format "yaw,pitch" (degrees)
fn parse_heading(s: &str) -> Result<HeadingArg, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Heading must be in format 'yaw,pitch'".to_string());
    }

    let yaw_deg = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid yaw value".to_string())?;
    let pitch_deg = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid pitch value".to_string())?;

    if !(yaw_deg.is_finite() && pitch_deg.is_finite()) {
        return Err("Heading must be finite".to_string());
    }
    if pitch_deg.abs() > 90.0 {
        return Err(format!("Pitch {pitch_deg} is outside [-90, 90]"));
    }

    Ok(HeadingArg { yaw_deg, pitch_deg })
}

impl std::str::FromStr for HeadingArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_heading(s)
    }
}

impl std::fmt::Display for HeadingArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.yaw_deg, self.pitch_deg)
    }
}

/// Parse duration string with units (e.g., "1.5s", "150ms", "2m")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = s.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = s.strip_suffix('m') {
        (num, "m")
    } else {
        // Default to seconds if no unit specified
        (s, "s")
    };

    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid numeric value: {num_str}"))?;

    if !value.is_finite() || value < 0.0 {
        return Err("Duration must be finite and non-negative".to_string());
    }

    let seconds = match unit {
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        _ => value,
    };
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("Invalid duration {s}: {e}"))
}

/// Wrapper for Duration that implements FromStr and has a nice Display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationArg(pub Duration);

impl std::str::FromStr for DurationArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(DurationArg)
    }
}

impl std::fmt::Display for DurationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        let total_ms = duration.as_millis();

        if total_ms >= 1000 && total_ms % 1000 == 0 {
            write!(f, "{}s", total_ms / 1000)
        } else if total_ms >= 1000 {
            write!(f, "{:.3}s", duration.as_secs_f64())
        } else {
            write!(f, "{total_ms}ms")
        }
    }
}

impl Default for DurationArg {
    fn default() -> Self {
        DurationArg(Duration::from_secs(10))
    }
}

/// Common arguments shared across simulation binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedSimulationArgs {
    /// Physics timestep (e.g., "20ms", "0.02s")
    #[arg(long, default_value = "20ms")]
    pub timestep: DurationArg,

    /// Simulated time to run (e.g., "10s", "2m")
    #[arg(long, default_value = "10s")]
    pub duration: DurationArg,

    /// Control tuning file; defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the recorded trajectory as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl SharedSimulationArgs {
    /// Number of whole ticks covering the requested duration.
    pub fn ticks(&self) -> usize {
        let dt = self.timestep.0.as_secs_f64();
        if dt <= 0.0 {
            return 0;
        }
        (self.duration.0.as_secs_f64() / dt).round() as usize
    }

    /// Load the control tuning, or defaults when no file was given.
    pub fn control_config(&self) -> SimResult<ControlConfig> {
        match &self.config {
            Some(path) => Ok(ControlConfig::load_from_file(path)?),
            None => Ok(ControlConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("1e300s").is_err());
        assert!(parse_duration("1e300m").is_err());
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(DurationArg(Duration::from_secs(10)).to_string(), "10s");
        assert_eq!(DurationArg(Duration::from_millis(1500)).to_string(), "1.500s");
        assert_eq!(DurationArg(Duration::from_millis(20)).to_string(), "20ms");
    }

    #[test]
    fn test_parse_heading() {
        let heading: HeadingArg = "90, -10".parse().unwrap();
        assert_eq!(heading.yaw_deg, 90.0);
        assert_eq!(heading.pitch_deg, -10.0);
        assert!("90".parse::<HeadingArg>().is_err());
        assert!("0,95".parse::<HeadingArg>().is_err());
    }

    #[test]
    fn test_ticks_from_duration() {
        let args = SharedSimulationArgs::parse_from(["sim", "--timestep", "20ms", "--duration", "15s"]);
        assert_eq!(args.ticks(), 750);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = SharedSimulationArgs {
            config: Some(dir.path().join("missing.json")),
            ..SharedSimulationArgs::parse_from(["sim"])
        };
        assert!(args.control_config().is_err());
    }
}
