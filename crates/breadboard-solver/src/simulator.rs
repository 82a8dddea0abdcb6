//! Nonlinear iterative simulator.
//!
//! Each resolve repeats the sequence
//!
//! 1. rebuild the conductance system from every component's present
//!    resistance and source behavior,
//! 2. solve it,
//! 3. push terminal voltages and currents back through
//!    [`Electrical::update_state`],
//!
//! until no component's voltage or current moved by more than the configured
//! tolerance, or the iteration budget runs out. The LED is the only element
//! whose resistance depends on the solution; everything else settles in one
//! or two passes.
//!
//! # State machine
//!
//! ```text
//! Uninitialized --initialize--> Initialized --start--> Idle <--> Running
//!                                                       |
//!                                   Stopped <---stop----+
//! ```
//!
//! `Running` is only observed while a resolve started by `start` (or by a
//! [`SimulationHandle`](crate::SimulationHandle) trigger) is in flight. A
//! topology change is picked up by re-indexing at the start of the next
//! resolve without leaving the current state.

use std::collections::{HashMap, HashSet};

use breadboard_core::{
    Circuit, ComponentId, Connection, Electrical, Event, EventBus, NodeId, SourceBehavior,
};

use crate::config::{SimulatorConfig, VOLTAGE_SOURCE_THRESHOLD};
use crate::error::{Error, Result};
use crate::matrix::MatrixSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Uninitialized,
    Initialized,
    /// Started, with a resolve in flight.
    Running,
    /// Started and waiting for the next trigger.
    Idle,
    Stopped,
}

/// Outcome of one full nonlinear resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Iterations used, including the one that converged.
    pub iterations: usize,
    pub converged: bool,
    /// Simulated time after this resolve (s).
    pub time: f64,
}

impl SolveReport {
    /// Turn a non-converged report into [`Error::ConvergenceFailed`].
    pub fn ensure_converged(self) -> Result<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(Error::ConvergenceFailed {
                iterations: self.iterations,
            })
        }
    }
}

/// A forced single-terminal source: only sources above the threshold
/// become voltage constraints; weaker ones fall back to their resistance.
fn forced_voltage(behavior: SourceBehavior) -> Option<f64> {
    match behavior {
        SourceBehavior::FixedVoltage(v) if v.abs() > VOLTAGE_SOURCE_THRESHOLD => Some(v),
        _ => None,
    }
}

/// Current flowing from a node at `voltage` into a non-forced
/// single-terminal element.
fn shunt_current<E: Electrical>(element: &E, voltage: f64) -> f64 {
    match element.source_behavior() {
        SourceBehavior::PullUp { resistance, supply } => (voltage - supply) / resistance,
        _ => voltage / element.resistance(),
    }
}

/// Drives a [`Circuit`] to a steady state.
#[derive(Debug)]
pub struct Simulator<E> {
    circuit: Circuit<E>,
    config: SimulatorConfig,
    solver: MatrixSolver,
    /// Dense unknown index for every non-ground node.
    node_index: HashMap<NodeId, usize>,
    indexed_revision: u64,
    state: SimulationState,
    /// Convergence baseline: last (voltage, current) per component.
    previous: HashMap<ComponentId, (f64, f64)>,
    iteration_count: usize,
    step_count: u64,
    simulation_time: f64,
    events: EventBus,
}

impl<E: Electrical> Simulator<E> {
    pub fn new(circuit: Circuit<E>) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    pub fn with_config(circuit: Circuit<E>, config: SimulatorConfig) -> Self {
        let events = circuit.events().clone();
        let solver = MatrixSolver::default().with_strategy(config.strategy);
        Self {
            circuit,
            config,
            solver,
            node_index: HashMap::new(),
            indexed_revision: 0,
            state: SimulationState::Uninitialized,
            previous: HashMap::new(),
            iteration_count: 0,
            step_count: 0,
            simulation_time: 0.0,
            events,
        }
    }

    pub fn circuit(&self) -> &Circuit<E> {
        &self.circuit
    }

    /// Mutable access to the graph. Topology changes are detected through
    /// the circuit's revision on the next resolve.
    pub fn circuit_mut(&mut self) -> &mut Circuit<E> {
        &mut self.circuit
    }

    pub fn into_circuit(self) -> Circuit<E> {
        self.circuit
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimulatorConfig) {
        self.solver.set_strategy(config.strategy);
        self.config = config;
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        matches!(self.state, SimulationState::Running | SimulationState::Idle)
    }

    /// Iterations used by the most recent resolve.
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Completed resolves since the last reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time (s), advanced by `time_step` per resolve.
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// The conductance system as assembled by the last iteration.
    pub fn matrix(&self) -> &MatrixSolver {
        &self.solver
    }

    /// Solver index of a node; `None` for ground and unknown nodes.
    pub fn node_index(&self, node: NodeId) -> Option<usize> {
        self.node_index.get(&node).copied()
    }

    /// Map a node onto the solver: `Some(None)` is ground, `Some(Some(i))`
    /// an unknown, `None` a node that is not indexed.
    fn slot(&self, node: NodeId) -> Option<Option<usize>> {
        if node == self.circuit.ground() {
            return Some(None);
        }
        self.node_index.get(&node).map(|&i| Some(i))
    }

    fn slot_voltage(&self, slot: Option<usize>) -> f64 {
        slot.map_or(0.0, |i| self.solver.node_voltage(i))
    }

    /// Nodes that receive at least one stamp during assembly. A node with
    /// nothing stamped on it would leave an all-zero row.
    fn stamped_nodes(&self) -> HashSet<NodeId> {
        let mut stamped = HashSet::new();
        for (id, _) in self.circuit.components() {
            match self.circuit.terminals(id) {
                Some(&[Some(node)]) => {
                    stamped.insert(node);
                }
                Some(&[Some(a), Some(b)]) if a != b => {
                    stamped.insert(a);
                    stamped.insert(b);
                }
                _ => {}
            }
        }
        stamped
    }

    /// Build the node index, size the matrix and snapshot the convergence
    /// baseline.
    ///
    /// Nodes no component stamps into (an unused named node, the free end
    /// of a half-wired part) are left out of the index and keep 0 V.
    pub fn initialize(&mut self) -> Result<()> {
        let ground = self.circuit.ground();
        let stamped = self.stamped_nodes();
        self.node_index = self
            .circuit
            .nodes()
            .map(|node| node.id())
            .filter(|&id| id != ground && stamped.contains(&id))
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let skipped: Vec<NodeId> = self
            .circuit
            .nodes()
            .map(|node| node.id())
            .filter(|id| *id != ground && !self.node_index.contains_key(id))
            .collect();
        if !skipped.is_empty() {
            log::debug!("{} unstamped nodes left out of the index", skipped.len());
        }
        for id in skipped {
            self.circuit.set_node_voltage(id, 0.0);
        }

        if self.node_index.is_empty() {
            log::warn!("cannot initialize: circuit has no non-ground nodes");
            return Err(Error::NoNodes);
        }

        self.solver.set_dimension(self.node_index.len());
        self.solver.set_strategy(self.config.strategy);
        self.previous = self
            .circuit
            .components()
            .map(|(id, element)| (id, (element.voltage(), element.current())))
            .collect();
        self.indexed_revision = self.circuit.revision();

        if self.state == SimulationState::Uninitialized {
            self.state = SimulationState::Initialized;
        }
        log::info!(
            "simulator initialized: {} unknowns, {} components",
            self.node_index.len(),
            self.circuit.component_count()
        );
        Ok(())
    }

    /// Initialize if needed, resolve, and enter the running state.
    pub fn start(&mut self) -> Result<SolveReport> {
        if self.state == SimulationState::Uninitialized {
            self.initialize()?;
        }
        if !self.is_running() {
            log::info!("simulation started");
            self.events.publish(Event::SimulationStarted);
        }
        self.state = SimulationState::Idle;
        self.solve()
    }

    /// Stop automatic resolves. An in-flight resolve is not interrupted.
    pub fn stop(&mut self) {
        if self.is_running() {
            self.state = SimulationState::Stopped;
            log::info!("simulation stopped after {} steps", self.step_count);
            self.events.publish(Event::SimulationStopped);
        }
    }

    /// Exactly one resolve, regardless of running state.
    pub fn step(&mut self) -> Result<SolveReport> {
        if self.state == SimulationState::Uninitialized {
            self.initialize()?;
        }
        self.solve()
    }

    /// Restore every component's power-on state and clear bookkeeping.
    /// The running state is left as it is.
    pub fn reset(&mut self) {
        for (_, element) in self.circuit.components_mut() {
            element.reset();
        }
        self.circuit.clear_node_voltages();
        self.previous.clear();
        self.solver.set_dimension(self.solver.dimension());
        self.iteration_count = 0;
        self.step_count = 0;
        self.simulation_time = 0.0;
        log::info!("simulation reset");
        self.events.publish(Event::SimulationReset);
    }

    /// One full nonlinear resolve.
    ///
    /// Running out of iterations is not an error: the last values stand and
    /// the report has `converged == false`. A singular system is an error;
    /// component state from before the failed iteration is kept.
    pub fn solve(&mut self) -> Result<SolveReport> {
        if self.state == SimulationState::Uninitialized {
            log::warn!("solve called before initialize");
            return Err(Error::NotInitialized);
        }
        if self.indexed_revision != self.circuit.revision() {
            log::info!("topology changed, re-initializing");
            if let Err(err) = self.initialize() {
                self.events.publish(Event::SolverError(err.to_string()));
                return Err(err);
            }
        }

        let resume = self.state;
        if resume == SimulationState::Idle {
            self.state = SimulationState::Running;
        }
        let result = self.iterate();
        self.state = resume;
        result
    }

    fn iterate(&mut self) -> Result<SolveReport> {
        let max_iterations = self.config.max_iterations.max(1);
        let mut iterations = 0;
        let mut converged = false;
        let mut warned = false;

        while iterations < max_iterations {
            iterations += 1;
            match self.iteration(&mut warned) {
                Ok(settled) => converged = settled,
                Err(err) => {
                    log::warn!("solver error in iteration {}: {}", iterations, err);
                    self.iteration_count = iterations;
                    self.events.publish(Event::SolverError(err.to_string()));
                    return Err(err);
                }
            }
            log::debug!("iteration {}: converged = {}", iterations, converged);
            if converged {
                break;
            }
        }

        self.iteration_count = iterations;
        self.step_count += 1;
        self.simulation_time += self.config.time_step;
        self.events.publish(Event::StepCompleted {
            iterations,
            time: self.simulation_time,
        });

        if converged {
            log::info!("converged in {} iterations", iterations);
            self.events.publish(Event::ConvergenceAchieved { iterations });
        } else {
            log::warn!("no convergence after {} iterations", iterations);
            self.events.publish(Event::ConvergenceFailed { iterations });
        }

        Ok(SolveReport {
            iterations,
            converged,
            time: self.simulation_time,
        })
    }

    /// Assemble, solve and update once. Returns true when every component
    /// settled.
    fn iteration(&mut self, warned: &mut bool) -> Result<bool> {
        self.assemble()?;
        if !*warned && !self.solver.is_valid() {
            log::warn!("conductance matrix is ill-conditioned; attempting solve anyway");
            *warned = true;
        }
        self.solver.solve()?;

        let readings = self.measure();
        let converged = self.apply(readings);
        self.store_node_voltages();
        Ok(converged)
    }

    /// Stamp every component. Voltage constraints go last so their rows are
    /// not disturbed by later conductance stamps.
    fn assemble(&mut self) -> Result<()> {
        self.solver.clear();
        let mut forced = Vec::new();

        for (id, element) in self.circuit.components() {
            let Some(terminals) = self.circuit.terminals(id) else {
                continue;
            };
            match *terminals {
                [Some(node)] => {
                    // Unindexed, or tied straight to ground: nothing to stamp.
                    let Some(Some(i)) = self.slot(node) else {
                        continue;
                    };
                    let behavior = element.source_behavior();
                    if let Some(v) = forced_voltage(behavior) {
                        forced.push((i, v));
                    } else if let SourceBehavior::PullUp { resistance, supply } = behavior {
                        // Norton equivalent of a resistor to the supply rail.
                        let g = 1.0 / resistance;
                        self.solver.add_conductance(Some(i), None, g)?;
                        self.solver.add_current_source(None, Some(i), g * supply)?;
                    } else {
                        self.solver
                            .add_conductance(Some(i), None, 1.0 / element.resistance())?;
                    }
                }
                [Some(a), Some(b)] => {
                    let (Some(sa), Some(sb)) = (self.slot(a), self.slot(b)) else {
                        continue;
                    };
                    if sa != sb {
                        self.solver.add_conductance(sa, sb, 1.0 / element.resistance())?;
                    }
                }
                _ => {}
            }
        }

        for (i, v) in forced {
            self.solver.set_node_voltage(i, v)?;
        }
        Ok(())
    }

    /// Terminal voltage and current of every bound component, taken from
    /// the current solution and the resistances that were just stamped.
    ///
    /// Two-terminal elements report `V(t0) - V(t1)` and the current from t0
    /// to t1. Single-terminal elements report their node voltage and the
    /// current flowing into them, except forced sources, which report the
    /// current they deliver into their node.
    fn measure(&self) -> Vec<(ComponentId, f64, f64)> {
        let mut readings = Vec::with_capacity(self.circuit.component_count());

        for (id, element) in self.circuit.components() {
            let Some(terminals) = self.circuit.terminals(id) else {
                continue;
            };
            match *terminals {
                [Some(node)] => {
                    let Some(slot) = self.slot(node) else {
                        continue;
                    };
                    let v = self.slot_voltage(slot);
                    let i = match forced_voltage(element.source_behavior()) {
                        Some(_) if slot.is_some() => self.delivered_current(id, node, v),
                        Some(_) => 0.0,
                        None => shunt_current(element, v),
                    };
                    readings.push((id, v, i));
                }
                [Some(a), Some(b)] => {
                    let (Some(sa), Some(sb)) = (self.slot(a), self.slot(b)) else {
                        continue;
                    };
                    let v = self.slot_voltage(sa) - self.slot_voltage(sb);
                    let i = if sa == sb { 0.0 } else { v / element.resistance() };
                    readings.push((id, v, i));
                }
                _ => {}
            }
        }
        readings
    }

    /// KCL at a forced node: the source delivers whatever the other
    /// elements on the node draw.
    fn delivered_current(&self, source: ComponentId, node: NodeId, voltage: f64) -> f64 {
        let Some(n) = self.circuit.node(node) else {
            return 0.0;
        };
        n.connections()
            .iter()
            .filter(|c| c.component != source)
            .map(|c| self.current_leaving(c, node, voltage))
            .sum()
    }

    /// Current leaving `node` through one attached terminal.
    fn current_leaving(&self, connection: &Connection, node: NodeId, voltage: f64) -> f64 {
        let Some(element) = self.circuit.component(connection.component) else {
            return 0.0;
        };
        let Some(terminals) = self.circuit.terminals(connection.component) else {
            return 0.0;
        };
        match *terminals {
            [_] => {
                if forced_voltage(element.source_behavior()).is_some() {
                    0.0
                } else {
                    shunt_current(element, voltage)
                }
            }
            [t0, t1] => {
                let other = if connection.terminal == 0 { t1 } else { t0 };
                let Some(other) = other.filter(|&m| m != node) else {
                    return 0.0;
                };
                match self.slot(other) {
                    Some(slot) => (voltage - self.slot_voltage(slot)) / element.resistance(),
                    None => 0.0,
                }
            }
            _ => 0.0,
        }
    }

    /// Push readings into the components and report whether all settled.
    fn apply(&mut self, readings: Vec<(ComponentId, f64, f64)>) -> bool {
        let tolerance = self.config.tolerance;
        let mut converged = true;

        for (id, voltage, current) in readings {
            let Some(element) = self.circuit.component_mut(id) else {
                continue;
            };
            let update = element.update_state(voltage, current);

            // A component with no baseline has not settled yet.
            let settled = self.previous.get(&id).is_some_and(|&(v, i)| {
                (voltage - v).abs() <= tolerance && (current - i).abs() <= tolerance
            });
            converged &= settled;
            self.previous.insert(id, (voltage, current));

            if update.changed {
                self.events
                    .publish(Event::ComponentStateChanged { component: id });
            }
            if update.overload_started {
                self.events.publish(Event::OverloadDetected { component: id });
            }
        }
        converged
    }

    fn store_node_voltages(&mut self) {
        for (&node, &i) in &self.node_index {
            self.circuit
                .set_node_voltage(node, self.solver.node_voltage(i));
        }
    }

    /// Last solved voltage of a node. Ground is always 0; unknown nodes
    /// read as 0 with a warning.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        match self.circuit.node(node) {
            Some(n) => n.voltage(),
            None => {
                log::warn!("voltage requested for unknown node {}", node);
                0.0
            }
        }
    }

    /// Current from node `a` to node `b` through the branch joining them.
    pub fn branch_current(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.slot(a), self.slot(b)) {
            (Some(sa), Some(sb)) => self.solver.branch_current(sa, sb),
            _ => {
                log::warn!("branch current requested for unindexed nodes {}-{}", a, b);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breadboard_core::Subscription;
    use breadboard_devices::{Device, DriverPin, PinMode, Resistor};

    fn collect(rx: &Subscription) -> Vec<Event> {
        rx.try_iter().collect()
    }

    fn driven_pin(high: bool) -> Device {
        let mut pin = DriverPin::digital(13);
        pin.set_mode(PinMode::Output).unwrap();
        pin.digital_write(high).unwrap();
        pin.into()
    }

    /// Pin -> resistor -> GND.
    fn resistor_circuit(resistance: f64) -> (Simulator<Device>, ComponentId, ComponentId) {
        let mut circuit = Circuit::new();
        let pin = circuit.attach_external(driven_pin(true));
        let r = circuit.add_component(Resistor::new(resistance).unwrap().into());
        circuit.connect_components(pin, 0, r, 0).unwrap();
        circuit.connect_to_node(r, 1, circuit.ground()).unwrap();
        (Simulator::new(circuit), pin, r)
    }

    #[test]
    fn test_initialize_requires_nodes() {
        let mut sim: Simulator<Device> = Simulator::new(Circuit::new());
        assert!(matches!(sim.initialize(), Err(Error::NoNodes)));
        assert_eq!(sim.state(), SimulationState::Uninitialized);
        assert!(matches!(sim.solve(), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_single_resistor() {
        let (mut sim, pin, r) = resistor_circuit(220.0);
        let report = sim.step().unwrap();
        assert!(report.converged);

        let resistor = sim.circuit().component(r).unwrap();
        let expected = 5.0 / 220.0;
        assert!(
            (resistor.current() - expected).abs() < 1e-9,
            "expected {} A, got {}",
            expected,
            resistor.current()
        );
        assert!((resistor.voltage() - 5.0).abs() < 1e-9);

        // The pin's current comes from KCL on its node.
        let source = sim.circuit().component(pin).unwrap();
        assert!((source.current() - expected).abs() < 1e-9);
        assert_eq!(sim.node_voltage(sim.circuit().ground()), 0.0);
    }

    #[test]
    fn test_state_machine() {
        let (mut sim, _, _) = resistor_circuit(1000.0);
        let rx = sim.events().subscribe();

        sim.initialize().unwrap();
        assert_eq!(sim.state(), SimulationState::Initialized);
        assert!(!sim.is_running());

        sim.start().unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert!(sim.is_running());

        sim.step().unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);

        sim.stop();
        assert_eq!(sim.state(), SimulationState::Stopped);
        assert_eq!(sim.step_count(), 2);
        assert!((sim.simulation_time() - 0.002).abs() < 1e-12);

        let events = collect(&rx);
        assert_eq!(events.first(), Some(&Event::SimulationStarted));
        assert_eq!(events.last(), Some(&Event::SimulationStopped));
        let steps = events
            .iter()
            .filter(|e| matches!(e, Event::StepCompleted { .. }))
            .count();
        assert_eq!(steps, 2);
    }

    #[test]
    fn test_reset_keeps_running() {
        let (mut sim, _, r) = resistor_circuit(1000.0);
        sim.start().unwrap();
        let rx = sim.events().subscribe();

        sim.reset();

        assert!(sim.is_running());
        assert_eq!(sim.simulation_time(), 0.0);
        assert_eq!(sim.circuit().component(r).unwrap().current(), 0.0);
        assert_eq!(collect(&rx), vec![Event::SimulationReset]);
    }

    #[test]
    fn test_topology_change_reindexes() {
        let (mut sim, pin, r) = resistor_circuit(1000.0);
        sim.start().unwrap();

        // Add a second 1k in parallel.
        let circuit = sim.circuit_mut();
        let r2 = circuit.add_component(Resistor::new(1000.0).unwrap().into());
        circuit.connect_components(pin, 0, r2, 0).unwrap();
        let gnd = circuit.ground();
        circuit.connect_to_node(r2, 1, gnd).unwrap();

        sim.solve().unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);
        let delivered = sim.circuit().component(pin).unwrap().current();
        assert!((delivered - 0.01).abs() < 1e-9, "pin delivered {}", delivered);
        assert!((sim.circuit().component(r).unwrap().current() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_unbound_components_skipped() {
        let (mut sim, _, _) = resistor_circuit(1000.0);
        let loose = sim
            .circuit_mut()
            .add_component(Resistor::new(10.0).unwrap().into());

        let report = sim.step().unwrap();
        assert!(report.converged);
        assert_eq!(sim.circuit().component(loose).unwrap().current(), 0.0);
    }

    #[test]
    fn test_unused_named_node_not_indexed() {
        let (mut sim, _, r) = resistor_circuit(1000.0);
        let vcc = sim.circuit_mut().find_or_create_node("VCC");

        let report = sim.step().unwrap();
        assert!(report.converged);
        assert!(sim.node_index(vcc).is_none());
        assert_eq!(sim.matrix().dimension(), 1);
        assert_eq!(sim.node_voltage(vcc), 0.0);
        assert!((sim.circuit().component(r).unwrap().current() - 5e-3).abs() < 1e-9);
    }

    #[test]
    fn test_half_wired_part_not_indexed() {
        let (mut sim, _, _) = resistor_circuit(1000.0);
        let circuit = sim.circuit_mut();
        let loose = circuit.add_component(Resistor::new(10.0).unwrap().into());
        let free_end = circuit.create_node();
        circuit.connect_to_node(loose, 0, free_end).unwrap();

        let report = sim.step().unwrap();
        assert!(report.converged);
        assert!(sim.node_index(free_end).is_none());
        assert_eq!(sim.circuit().component(loose).unwrap().current(), 0.0);
    }

    #[test]
    fn test_singular_system_reports_error() {
        let mut circuit: Circuit<Device> = Circuit::new();
        let r = circuit.add_component(Resistor::new(100.0).unwrap().into());
        let a = circuit.create_node();
        let b = circuit.create_node();
        circuit.connect_to_node(r, 0, a).unwrap();
        circuit.connect_to_node(r, 1, b).unwrap();

        let mut sim = Simulator::new(circuit);
        let rx = sim.events().subscribe();
        assert!(matches!(sim.step(), Err(Error::SingularMatrix)));
        assert!(
            collect(&rx)
                .iter()
                .any(|e| matches!(e, Event::SolverError(_)))
        );
    }

    #[test]
    fn test_pullup_divider() {
        // 50k pull-up against 10k to ground: 5 V * 10 / 60.
        let mut circuit: Circuit<Device> = Circuit::new();
        let mut pin = DriverPin::digital(2);
        pin.set_mode(PinMode::InputPullup).unwrap();
        let pin = circuit.attach_external(pin.into());
        let r = circuit.add_component(Resistor::new(10e3).unwrap().into());
        let node = circuit.connect_components(pin, 0, r, 0).unwrap();
        circuit.connect_to_node(r, 1, circuit.ground()).unwrap();

        let mut sim = Simulator::new(circuit);
        sim.step().unwrap();

        let expected = 5.0 * 10.0 / 60.0;
        let v = sim.node_voltage(node);
        assert!((v - expected).abs() < 1e-9, "expected {} V, got {}", expected, v);
        let pin = sim.circuit().component(pin).unwrap().as_driver_pin().unwrap();
        assert!(!pin.digital_read().unwrap());
    }

    #[test]
    fn test_low_output_is_resistive() {
        let mut circuit: Circuit<Device> = Circuit::new();
        let pin = circuit.attach_external(driven_pin(false));
        let r = circuit.add_component(Resistor::new(100.0).unwrap().into());
        circuit.connect_components(pin, 0, r, 0).unwrap();
        circuit.connect_to_node(r, 1, circuit.ground()).unwrap();

        let mut sim = Simulator::new(circuit);
        let report = sim.step().unwrap();
        assert!(report.converged);
        let g = sim.matrix().matrix()[(0, 0)];
        assert!((g - (1.0 / 25.0 + 1.0 / 100.0)).abs() < 1e-12, "diagonal {}", g);
        assert_eq!(sim.circuit().component(r).unwrap().current(), 0.0);
    }

    #[test]
    fn test_convergence_failure_is_not_an_error() {
        let (mut sim, _, _) = resistor_circuit(1000.0);
        sim.set_config(SimulatorConfig::default().with_max_iterations(1));
        let rx = sim.events().subscribe();

        // The first pass moves every value away from the zero baseline.
        let report = sim.step().unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
        assert!(report.ensure_converged().is_err());
        assert!(
            collect(&rx)
                .iter()
                .any(|e| *e == Event::ConvergenceFailed { iterations: 1 })
        );
    }
}
