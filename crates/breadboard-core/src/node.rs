//! Node representation for circuit graphs.

use std::fmt;

use crate::element::ComponentId;

/// Unique identifier for a node in the circuit.
///
/// Ids are assigned by the owning [`Circuit`](crate::Circuit) in creation
/// order and are never reused, so a stale id simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (component, terminal) pair attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub component: ComponentId,
    pub terminal: usize,
}

/// A node in the circuit graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,
    /// Optional name for the node (e.g. "VCC").
    name: Option<String>,
    /// Last solved voltage.
    voltage: f64,
    /// Whether this node is the 0 V reference.
    ground: bool,
    connections: Vec<Connection>,
}

impl Node {
    /// Create a new node with the given ID.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            name: None,
            voltage: 0.0,
            ground: false,
            connections: Vec::new(),
        }
    }

    /// Create a new node with the given ID and name.
    pub fn with_name(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(id)
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Last solved voltage. Always 0 for the ground node.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.ground
    }

    /// The (component, terminal) pairs attached to this node.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// A node with no connections left is orphaned and should be removed
    /// by its circuit unless it is ground.
    pub fn is_orphaned(&self) -> bool {
        self.connections.is_empty()
    }

    /// Check whether a given component terminal is attached here.
    pub fn is_connected(&self, component: ComponentId, terminal: usize) -> bool {
        self.connections
            .iter()
            .any(|c| c.component == component && c.terminal == terminal)
    }

    pub(crate) fn set_voltage(&mut self, voltage: f64) {
        self.voltage = if self.ground { 0.0 } else { voltage };
    }

    pub(crate) fn set_ground(&mut self, ground: bool) {
        self.ground = ground;
        if ground {
            self.voltage = 0.0;
        }
    }

    pub(crate) fn attach(&mut self, component: ComponentId, terminal: usize) {
        if !self.is_connected(component, terminal) {
            self.connections.push(Connection {
                component,
                terminal,
            });
        }
    }

    /// Remove one terminal binding. Returns true if it was present.
    pub(crate) fn detach(&mut self, component: ComponentId, terminal: usize) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.component == component && c.terminal == terminal));
        self.connections.len() != before
    }

    /// Move every connection out of this node, leaving it empty.
    pub(crate) fn take_connections(&mut self) -> Vec<Connection> {
        std::mem::take(&mut self.connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.as_u32(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_node_with_name() {
        let node = Node::with_name(NodeId::new(1), "VCC");
        assert_eq!(node.id().as_u32(), 1);
        assert_eq!(node.name(), Some("VCC"));
        assert!(node.is_orphaned());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut node = Node::new(NodeId::new(1));
        let c = ComponentId::new(7);
        node.attach(c, 0);
        node.attach(c, 0);
        node.attach(c, 1);
        assert_eq!(node.connection_count(), 2);

        assert!(node.detach(c, 0));
        assert!(!node.detach(c, 0));
        assert!(node.is_connected(c, 1));
    }

    #[test]
    fn test_ground_voltage_pinned() {
        let mut node = Node::new(NodeId::new(0));
        node.set_ground(true);
        node.set_voltage(3.3);
        assert_eq!(node.voltage(), 0.0);

        node.set_ground(false);
        node.set_voltage(3.3);
        assert_eq!(node.voltage(), 3.3);
    }
}
