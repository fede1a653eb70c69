//! Persistent control state for vessels leaving physics range.
//!
//! Only the goal and its target parameters survive an unload. Integrator and
//! error history is rebuilt from zero on restore and reconverges within a few
//! ticks. Snapshots are stored in ~/.fbw_state/ by default, one JSON file per
//! vessel.

use crate::autopilot::AutopilotGoal;
use crate::axis::PerAxis;
use crate::direction::DirectionTarget;
use crate::error::{InputRejected, SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serialized form of a [`crate::vessel::VesselControlState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub goal: AutopilotGoal,
    pub direction_target: Option<DirectionTarget>,
    /// Rate targets (rad/s) the inner loop was holding
    pub rate_targets: PerAxis<Option<f64>>,
    pub throttle: f64,
}

impl ControlSnapshot {
    /// Check the snapshot only holds values the setters would accept.
    pub fn validate(&self) -> SnapshotResult<()> {
        self.goal.validate()?;
        if let Some(target) = &self.direction_target {
            target.validate()?;
        }
        if !(0.0..=1.0).contains(&self.throttle) {
            return Err(InputRejected::ThrottleOutOfRange(self.throttle).into());
        }
        for (axis, target) in self.rate_targets.iter() {
            if let Some(value) = *target {
                if !value.is_finite() {
                    return Err(InputRejected::InvalidRateTarget { axis, value }.into());
                }
            }
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> SnapshotResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> SnapshotResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Directory of snapshots keyed by vessel id.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Root directory holding one file per vessel (e.g., ~/.fbw_state)
    root_path: PathBuf,
}

impl SnapshotStore {
    /// Create a store at the default path (~/.fbw_state)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        let root_path = PathBuf::from(home).join(".fbw_state");
        Ok(Self { root_path })
    }

    /// Create a store with a custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// File holding one vessel's snapshot.
    ///
    /// Ids are restricted to ASCII letters, digits, `_` and `-` so they map
    /// one to one onto file names.
    fn snapshot_path(&self, vessel_id: &str) -> SnapshotResult<PathBuf> {
        let valid = !vessel_id.is_empty()
            && vessel_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SnapshotError::InvalidVesselId(vessel_id.to_string()));
        }
        Ok(self.root_path.join(format!("{vessel_id}.json")))
    }

    /// Get the snapshot stored for a vessel.
    ///
    /// Returns None if no snapshot exists.
    /// Returns Some(Err) if the id is invalid or the file cannot be loaded.
    pub fn get(&self, vessel_id: &str) -> Option<SnapshotResult<ControlSnapshot>> {
        let path = match self.snapshot_path(vessel_id) {
            Ok(path) => path,
            Err(err) => return Some(Err(err)),
        };

        if !path.exists() {
            return None;
        }

        Some(ControlSnapshot::load_from_file(&path))
    }

    /// Save a vessel's snapshot, creating the root directory if needed.
    ///
    /// Returns the path the snapshot was written to.
    pub fn save(&self, vessel_id: &str, snapshot: &ControlSnapshot) -> SnapshotResult<PathBuf> {
        let path = self.snapshot_path(vessel_id)?;
        std::fs::create_dir_all(&self.root_path)?;
        snapshot.save_to_file(&path)?;
        Ok(path)
    }

    /// List the ids of every stored vessel, sorted.
    pub fn list(&self) -> std::io::Result<Vec<String>> {
        if !self.root_path.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root_path)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Delete a vessel's snapshot.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete(&self, vessel_id: &str) -> SnapshotResult<bool> {
        let path = self.snapshot_path(vessel_id)?;

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(path)?;
        Ok(true)
    }
}
