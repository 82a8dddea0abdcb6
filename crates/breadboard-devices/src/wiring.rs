//! Node-to-node wiring helpers for circuits built from [`Device`]s.

use breadboard_core::{Circuit, ComponentId, Error as CircuitError, NodeId};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::wire::Wire;

/// Wire placement on a `Circuit<Device>`.
pub trait Wiring {
    /// Find a wire joining `a` and `b`, in either orientation.
    fn wire_between(&self, a: NodeId, b: NodeId) -> Option<ComponentId>;

    /// Join two nodes with an ideal wire.
    ///
    /// Returns the existing wire if the nodes are already wired together.
    fn add_wire_between(&mut self, from: NodeId, to: NodeId) -> Result<ComponentId>;
}

impl Wiring for Circuit<Device> {
    fn wire_between(&self, a: NodeId, b: NodeId) -> Option<ComponentId> {
        self.components()
            .filter(|(_, device)| matches!(device, Device::Wire(_)))
            .find_map(|(id, _)| match self.terminals(id)? {
                [Some(x), Some(y)] if (*x == a && *y == b) || (*x == b && *y == a) => Some(id),
                _ => None,
            })
    }

    fn add_wire_between(&mut self, from: NodeId, to: NodeId) -> Result<ComponentId> {
        if from == to {
            return Err(Error::InvalidParameter(format!(
                "cannot wire node {} to itself",
                from
            )));
        }
        for node in [from, to] {
            if !self.has_node(node) {
                return Err(CircuitError::NodeNotFound(node).into());
            }
        }
        if let Some(existing) = self.wire_between(from, to) {
            log::debug!("nodes {} and {} already wired by {}", from, to, existing);
            return Ok(existing);
        }

        let id = self.add_component(Wire::new().into());
        self.connect_to_node(id, 0, from)?;
        self.connect_to_node(id, 1, to)?;
        Ok(id)
    }
}
