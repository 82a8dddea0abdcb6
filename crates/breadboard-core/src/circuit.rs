//! Circuit graph representation.
//!
//! The circuit owns two arenas, one of nodes and one of components, that
//! refer to each other only by id. A component slot records which node each
//! of its terminals is bound to; a node records the (component, terminal)
//! pairs attached to it. Every mutation keeps both sides in step.

use std::fmt;

use indexmap::IndexMap;

use crate::element::{ComponentId, Electrical};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::node::{Node, NodeId};

/// Names that always resolve to the current ground node.
pub const GROUND_ALIASES: [&str; 2] = ["GND", "GROUND"];

/// Who is responsible for destroying a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created for and owned by the circuit.
    Owned,
    /// Supplied by an external collaborator (e.g. a board's pins). The
    /// circuit hands the element back instead of dropping it on removal.
    External,
}

#[derive(Debug)]
struct Slot<E> {
    element: E,
    terminals: Vec<Option<NodeId>>,
    ownership: Ownership,
}

/// Advisory problems found by [`Circuit::connection_issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionIssue {
    /// A non-ground node with fewer than two connections.
    FloatingNode(NodeId),
    /// A component with no bound terminal.
    DisconnectedComponent { component: ComponentId, name: String },
    MissingGround,
}

impl fmt::Display for ConnectionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionIssue::FloatingNode(node) => {
                write!(f, "node {} has fewer than two connections", node)
            }
            ConnectionIssue::DisconnectedComponent { component, name } => {
                write!(f, "component {} ({}) is not connected", name, component)
            }
            ConnectionIssue::MissingGround => write!(f, "no ground node found"),
        }
    }
}

/// A circuit graph of electrical components joined at nodes.
#[derive(Debug)]
pub struct Circuit<E> {
    nodes: IndexMap<NodeId, Node>,
    components: IndexMap<ComponentId, Slot<E>>,
    ground: NodeId,
    aliases: IndexMap<String, NodeId>,
    next_node_id: u32,
    next_component_id: u32,
    /// Bumped on every topology mutation.
    revision: u64,
    events: EventBus,
}

impl<E: Electrical> Default for Circuit<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Electrical> Circuit<E> {
    /// Create an empty circuit containing only the ground node.
    pub fn new() -> Self {
        Self::with_events(EventBus::new())
    }

    /// Create an empty circuit that publishes on an existing bus.
    pub fn with_events(events: EventBus) -> Self {
        let mut circuit = Self {
            nodes: IndexMap::new(),
            components: IndexMap::new(),
            ground: NodeId(0),
            aliases: IndexMap::new(),
            next_node_id: 0,
            next_component_id: 0,
            revision: 0,
            events,
        };
        let ground = circuit.alloc_node(None);
        if let Some(node) = circuit.nodes.get_mut(&ground) {
            node.set_ground(true);
        }
        circuit.ground = ground;
        for alias in GROUND_ALIASES {
            circuit.aliases.insert(alias.to_string(), ground);
        }
        circuit
    }

    /// The bus this circuit publishes [`Event::TopologyChanged`] on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Topology revision. Changes whenever nodes or bindings change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.events.publish(Event::TopologyChanged);
    }

    fn alloc_node(&mut self, name: Option<&str>) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        let node = match name {
            Some(name) => Node::with_name(id, name),
            None => Node::new(id),
        };
        self.nodes.insert(id, node);
        id
    }

    fn remove_node_entry(&mut self, id: NodeId) {
        self.nodes.shift_remove(&id);
        self.aliases.retain(|_, node| *node != id);
    }

    /// Remove a node if it lost its last connection and is not ground.
    fn prune(&mut self, id: NodeId) {
        let orphaned = self.nodes.get(&id).is_some_and(Node::is_orphaned);
        if orphaned && id != self.ground {
            log::debug!("removing orphaned node {}", id);
            self.remove_node_entry(id);
        }
    }

    // ─────────────────────────── nodes ───────────────────────────

    /// Create a new, connection-less node.
    pub fn create_node(&mut self) -> NodeId {
        let id = self.alloc_node(None);
        self.touch();
        id
    }

    /// Look up a named node, creating and registering it if missing.
    pub fn find_or_create_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.aliases.get(name) {
            return id;
        }
        let id = self.alloc_node(Some(name));
        self.aliases.insert(name.to_string(), id);
        log::debug!("created named node {} ({})", name, id);
        self.touch();
        id
    }

    /// Resolve a node alias such as "GND" or "VCC".
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.aliases.get(name).copied()
    }

    /// The current ground node id.
    pub fn ground(&self) -> NodeId {
        self.ground
    }

    /// The current ground node.
    pub fn ground_node(&self) -> &Node {
        &self.nodes[&self.ground]
    }

    /// Make `node` the ground reference.
    ///
    /// The ground aliases move with it, and the previous ground node is
    /// removed if nothing is attached to it.
    pub fn set_ground_node(&mut self, node: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&node) {
            log::warn!("cannot make unknown node {} ground", node);
            return Err(Error::NodeNotFound(node));
        }
        if node == self.ground {
            return Ok(());
        }

        let old = self.ground;
        if let Some(n) = self.nodes.get_mut(&old) {
            n.set_ground(false);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.set_ground(true);
        }
        self.ground = node;
        for alias in GROUND_ALIASES {
            self.aliases.insert(alias.to_string(), node);
        }
        self.prune(old);

        log::info!("ground node changed from {} to {}", old, node);
        self.touch();
        Ok(())
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Iterate over all nodes including ground, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes including ground.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Store a solved voltage on a node. Ground stays at exactly 0 V.
    ///
    /// Returns false if the node does not exist.
    pub fn set_node_voltage(&mut self, id: NodeId, voltage: f64) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.set_voltage(voltage);
                true
            }
            None => false,
        }
    }

    /// Zero every node voltage.
    pub fn clear_node_voltages(&mut self) {
        for node in self.nodes.values_mut() {
            node.set_voltage(0.0);
        }
    }

    // ───────────────────────── components ─────────────────────────

    fn insert(&mut self, element: E, ownership: Ownership) -> ComponentId {
        let id = ComponentId(self.next_component_id);
        self.next_component_id += 1;
        let terminals = vec![None; element.terminal_count()];
        log::debug!("added component {} ({})", element.name(), id);
        self.components.insert(
            id,
            Slot {
                element,
                terminals,
                ownership,
            },
        );
        self.touch();
        id
    }

    /// Add a component owned by the circuit.
    pub fn add_component(&mut self, element: E) -> ComponentId {
        self.insert(element, Ownership::Owned)
    }

    /// Add a component owned by an external collaborator.
    pub fn attach_external(&mut self, element: E) -> ComponentId {
        self.insert(element, Ownership::External)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&E> {
        self.components.get(&id).map(|slot| &slot.element)
    }

    /// Mutable access for state changes (pin writes, resistance edits).
    /// Bindings can only be changed through the connection methods.
    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut E> {
        self.components.get_mut(&id).map(|slot| &mut slot.element)
    }

    /// Iterate over components in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &E)> {
        self.components.iter().map(|(id, slot)| (*id, &slot.element))
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = (ComponentId, &mut E)> {
        self.components
            .iter_mut()
            .map(|(id, slot)| (*id, &mut slot.element))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn ownership(&self, id: ComponentId) -> Option<Ownership> {
        self.components.get(&id).map(|slot| slot.ownership)
    }

    /// Terminal bindings of a component, one entry per terminal.
    pub fn terminals(&self, id: ComponentId) -> Option<&[Option<NodeId>]> {
        self.components.get(&id).map(|slot| slot.terminals.as_slice())
    }

    /// The node a terminal is bound to.
    ///
    /// Out-of-range terminals are reported as [`Error::InvalidTerminal`].
    pub fn terminal_node(&self, id: ComponentId, terminal: usize) -> Result<Option<NodeId>> {
        self.check_terminal(id, terminal)?;
        Ok(self.components[&id].terminals[terminal])
    }

    fn check_terminal(&self, id: ComponentId, terminal: usize) -> Result<()> {
        let slot = self.components.get(&id).ok_or_else(|| {
            log::warn!("component {} not found", id);
            Error::ComponentNotFound(id)
        })?;
        let count = slot.terminals.len();
        if terminal >= count {
            log::warn!(
                "invalid terminal {} for {} ({} terminals)",
                terminal,
                slot.element.name(),
                count
            );
            return Err(Error::InvalidTerminal {
                component: id,
                terminal,
                count,
            });
        }
        Ok(())
    }

    fn bind(&mut self, id: ComponentId, terminal: usize, node: NodeId) {
        if let Some(slot) = self.components.get_mut(&id) {
            slot.terminals[terminal] = Some(node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.attach(id, terminal);
        }
    }

    fn unbind(&mut self, id: ComponentId, terminal: usize) -> Option<NodeId> {
        let node = self
            .components
            .get_mut(&id)
            .and_then(|slot| slot.terminals[terminal].take())?;
        if let Some(n) = self.nodes.get_mut(&node) {
            n.detach(id, terminal);
        }
        Some(node)
    }

    // ───────────────────────── connectivity ─────────────────────────

    /// Bind a component terminal to an existing node.
    ///
    /// A terminal already bound elsewhere is moved; its old node is removed
    /// if that leaves it orphaned.
    pub fn connect_to_node(&mut self, id: ComponentId, terminal: usize, node: NodeId) -> Result<()> {
        self.check_terminal(id, terminal)?;
        if !self.nodes.contains_key(&node) {
            log::warn!("cannot connect {} to unknown node {}", id, node);
            return Err(Error::NodeNotFound(node));
        }
        if self.components[&id].terminals[terminal] == Some(node) {
            return Ok(());
        }

        if let Some(old) = self.unbind(id, terminal) {
            self.prune(old);
        }
        self.bind(id, terminal, node);
        log::debug!("connected {} terminal {} to node {}", id, terminal, node);
        self.touch();
        Ok(())
    }

    /// Join two component terminals electrically.
    ///
    /// - Neither bound: a new node is created for both.
    /// - One bound: the other joins that node.
    /// - Both on the same node: nothing changes.
    /// - Both on different nodes: the nodes are merged (see [`merge_nodes`]).
    ///
    /// Returns the node both terminals end up on.
    ///
    /// [`merge_nodes`]: Circuit::merge_nodes
    pub fn connect_components(
        &mut self,
        a: ComponentId,
        terminal_a: usize,
        b: ComponentId,
        terminal_b: usize,
    ) -> Result<NodeId> {
        self.check_terminal(a, terminal_a)?;
        self.check_terminal(b, terminal_b)?;
        if a == b && terminal_a == terminal_b {
            log::warn!("refusing to connect {} terminal {} to itself", a, terminal_a);
            return Err(Error::SelfConnection {
                component: a,
                terminal: terminal_a,
            });
        }

        let node_a = self.components[&a].terminals[terminal_a];
        let node_b = self.components[&b].terminals[terminal_b];

        match (node_a, node_b) {
            (Some(x), Some(y)) if x == y => {
                log::debug!("{} and {} already share node {}", a, b, x);
                Ok(x)
            }
            (None, None) => {
                let node = self.alloc_node(None);
                self.bind(a, terminal_a, node);
                self.bind(b, terminal_b, node);
                log::debug!("connected {} and {} via new node {}", a, b, node);
                self.touch();
                Ok(node)
            }
            (Some(x), None) => {
                self.bind(b, terminal_b, x);
                self.touch();
                Ok(x)
            }
            (None, Some(y)) => {
                self.bind(a, terminal_a, y);
                self.touch();
                Ok(y)
            }
            (Some(x), Some(y)) => self.merge_nodes(x, y),
        }
    }

    /// Merge two nodes that turned out to be electrically identical.
    ///
    /// Every connection of `second` moves onto `first`, aliases follow, and
    /// `second` is discarded; `first` keeps its id. The one exception is
    /// ground: if `second` is the ground node it survives instead, so the
    /// reference never disappears.
    ///
    /// Returns the surviving node.
    pub fn merge_nodes(&mut self, first: NodeId, second: NodeId) -> Result<NodeId> {
        for id in [first, second] {
            if !self.nodes.contains_key(&id) {
                log::warn!("cannot merge unknown node {}", id);
                return Err(Error::NodeNotFound(id));
            }
        }
        if first == second {
            return Ok(first);
        }

        let (keep, discard) = if second == self.ground {
            (second, first)
        } else {
            (first, second)
        };

        let moved = self
            .nodes
            .get_mut(&discard)
            .map(Node::take_connections)
            .unwrap_or_default();
        for connection in &moved {
            self.bind(connection.component, connection.terminal, keep);
        }
        for node in self.aliases.values_mut() {
            if *node == discard {
                *node = keep;
            }
        }
        self.nodes.shift_remove(&discard);

        log::debug!(
            "merged node {} into {} ({} connections moved)",
            discard,
            keep,
            moved.len()
        );
        self.touch();
        Ok(keep)
    }

    /// Unbind one terminal. The node is removed if this was its last
    /// connection and it is not ground.
    pub fn disconnect(&mut self, id: ComponentId, terminal: usize) -> Result<()> {
        self.check_terminal(id, terminal)?;
        if let Some(node) = self.unbind(id, terminal) {
            log::debug!("disconnected {} terminal {} from node {}", id, terminal, node);
            self.prune(node);
            self.touch();
        }
        Ok(())
    }

    /// Unbind every terminal of a component.
    pub fn disconnect_all(&mut self, id: ComponentId) -> Result<()> {
        let count = self
            .components
            .get(&id)
            .map(|slot| slot.terminals.len())
            .ok_or_else(|| {
                log::warn!("cannot disconnect unknown component {}", id);
                Error::ComponentNotFound(id)
            })?;
        for terminal in 0..count {
            self.disconnect(id, terminal)?;
        }
        Ok(())
    }

    /// Disconnect and remove a component.
    ///
    /// Owned components are dropped and `None` is returned. Externally
    /// owned components are handed back to the caller.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<Option<E>> {
        if !self.components.contains_key(&id) {
            log::warn!("cannot remove unknown component {}", id);
            return Err(Error::ComponentNotFound(id));
        }
        let count = self.components[&id].terminals.len();
        for terminal in 0..count {
            if let Some(node) = self.unbind(id, terminal) {
                self.prune(node);
            }
        }

        let Some(slot) = self.components.shift_remove(&id) else {
            return Err(Error::ComponentNotFound(id));
        };
        log::debug!("removed component {} ({})", slot.element.name(), id);
        self.touch();

        Ok(match slot.ownership {
            Ownership::Owned => None,
            Ownership::External => Some(slot.element),
        })
    }

    /// Remove every component. Externally owned ones are returned.
    pub fn remove_all_components(&mut self) -> Vec<E> {
        let ids: Vec<ComponentId> = self.components.keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| self.remove_component(id).ok().flatten())
            .collect()
    }

    // ───────────────────────── diagnostics ─────────────────────────

    /// Advisory connectivity check. Does not block simulation.
    pub fn connection_issues(&self) -> Vec<ConnectionIssue> {
        let mut issues = Vec::new();

        for node in self.nodes.values() {
            if node.connection_count() < 2 && !node.is_ground() {
                issues.push(ConnectionIssue::FloatingNode(node.id()));
            }
        }

        for (id, slot) in &self.components {
            if slot.terminals.iter().all(Option::is_none) {
                issues.push(ConnectionIssue::DisconnectedComponent {
                    component: *id,
                    name: slot.element.name().to_string(),
                });
            }
        }

        if !self.nodes.get(&self.ground).is_some_and(Node::is_ground) {
            issues.push(ConnectionIssue::MissingGround);
        }

        issues
    }

    /// True when [`connection_issues`](Circuit::connection_issues) finds nothing.
    pub fn is_valid(&self) -> bool {
        self.connection_issues().is_empty()
    }
}
