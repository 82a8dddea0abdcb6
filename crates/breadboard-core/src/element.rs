//! The electrical capability every circuit element exposes to the solver.

use std::fmt;

/// Smallest resistance the solver will stamp (Ohm).
///
/// Elements with ideal zero resistance report this floor instead so the
/// conductance matrix stays finite.
pub const MIN_RESISTANCE: f64 = 1e-6;

/// Unique identifier for a component in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Create a new ComponentId from a raw value.
    pub fn new(id: u32) -> Self {
        ComponentId(id)
    }

    /// Get the raw component ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a single-terminal element drives its node during matrix assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceBehavior {
    /// Plain conductance (1/R) to ground.
    Passive,
    /// Forces its node to a fixed voltage.
    FixedVoltage(f64),
    /// A finite resistance toward a supply rail instead of toward ground.
    PullUp { resistance: f64, supply: f64 },
}

/// Notifications produced by a single [`Electrical::update_state`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateUpdate {
    /// Derived, user-visible state changed (e.g. an LED switched on).
    pub changed: bool,
    /// The element just transitioned into its overloaded state.
    pub overload_started: bool,
}

/// Circuit element as seen by the nodal solver.
///
/// Implementations keep their own last-solved voltage and current. The
/// solver reads [`resistance`](Electrical::resistance) while assembling the
/// matrix and calls [`update_state`](Electrical::update_state) once per
/// iteration with the solved values.
pub trait Electrical: fmt::Debug {
    /// Display name (e.g. "Red LED").
    fn name(&self) -> &str;

    /// Number of terminals, fixed at construction.
    fn terminal_count(&self) -> usize;

    /// Present resistance in ohms. Must be strictly positive.
    fn resistance(&self) -> f64;

    /// Last solved voltage across the element.
    fn voltage(&self) -> f64;

    /// Last solved current through the element.
    fn current(&self) -> f64;

    /// Accept solved values and recompute any state-dependent quantities.
    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate;

    /// Restore the element to its power-on state.
    fn reset(&mut self);

    /// Source behavior for single-terminal elements.
    fn source_behavior(&self) -> SourceBehavior {
        SourceBehavior::Passive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_display() {
        assert_eq!(ComponentId::new(3).to_string(), "#3");
        assert_eq!(ComponentId::new(3).as_u32(), 3);
    }

    #[test]
    fn test_state_update_default_is_quiet() {
        let update = StateUpdate::default();
        assert!(!update.changed);
        assert!(!update.overload_started);
    }
}
