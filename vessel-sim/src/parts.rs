//! Controllable parts attached to a simulated vessel.

use crate::{SimError, SimResult};
use fbw::{PartCapability, PartId};
use log::debug;
use nalgebra::Vector3;

/// Parts currently attached, in attachment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartSet {
    parts: Vec<PartCapability>,
    next_id: PartId,
}

impl PartSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a part with the given full-drive torque, returning its id.
    pub fn add(&mut self, torque: Vector3<f64>) -> PartId {
        let id = self.next_id;
        self.next_id += 1;
        self.parts.push(PartCapability::new(id, torque));
        id
    }

    /// Remove a part, as on breakage or staging.
    pub fn detach(&mut self, id: PartId) -> SimResult<PartCapability> {
        let index = self
            .parts
            .iter()
            .position(|part| part.id == id)
            .ok_or(SimError::UnknownPart(id))?;
        debug!("detached part {id}");
        Ok(self.parts.remove(index))
    }

    /// Merge another vessel's parts into this one.
    ///
    /// Incoming parts get fresh ids, returned in their attachment order.
    pub fn dock(&mut self, other: PartSet) -> Vec<PartId> {
        other
            .parts
            .into_iter()
            .map(|part| self.add(part.torque))
            .collect()
    }

    pub fn capabilities(&self) -> &[PartCapability] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
