//! Coalescing of triggered resolves through a shared handle.

use std::thread;
use std::time::Duration;

use breadboard_core::{Circuit, Event};
use breadboard_devices::{Device, DriverPin, PinMode, Resistor};
use breadboard_solver::{SimulationHandle, SimulationState, Simulator, SimulatorConfig};

fn handle(interval: Duration) -> SimulationHandle<Device> {
    let mut circuit = Circuit::new();
    let mut pin = DriverPin::digital(13);
    pin.set_mode(PinMode::Output).unwrap();
    pin.digital_write(true).unwrap();
    let pin = circuit.attach_external(pin.into());
    let r = circuit.add_component(Resistor::new(330.0).unwrap().into());
    circuit.connect_components(pin, 0, r, 0).unwrap();
    let ground = circuit.ground();
    circuit.connect_to_node(r, 1, ground).unwrap();

    let config = SimulatorConfig::default().with_min_update_interval(interval);
    SimulationHandle::new(Simulator::with_config(circuit, config))
}

fn steps(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::StepCompleted { .. }))
        .count()
}

#[test]
fn test_burst_of_triggers_coalesces() {
    let h = handle(Duration::from_millis(200));
    let rx = h.lock().events().subscribe();

    h.start().unwrap();
    for _ in 0..10 {
        h.trigger();
    }
    assert!(h.has_pending());

    thread::sleep(Duration::from_millis(600));

    let events: Vec<_> = rx.try_iter().collect();
    // One from start, one for the whole burst.
    assert_eq!(steps(&events), 2, "events: {:?}", events);
    assert!(!h.has_pending());
    assert_eq!(h.state(), SimulationState::Idle);
}

#[test]
fn test_trigger_after_interval_runs_inline() {
    let h = handle(Duration::from_millis(20));
    h.start().unwrap();
    thread::sleep(Duration::from_millis(50));

    let rx = h.lock().events().subscribe();
    h.trigger();
    assert!(!h.has_pending());

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(steps(&events), 1);
}

#[test]
fn test_stopped_handle_ignores_deferred_resolve() {
    let h = handle(Duration::from_millis(100));
    h.start().unwrap();
    let rx = h.lock().events().subscribe();

    h.trigger();
    h.stop();
    thread::sleep(Duration::from_millis(300));

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(steps(&events), 0, "events: {:?}", events);
    assert_eq!(h.state(), SimulationState::Stopped);
}

#[test]
fn test_handles_share_one_simulator() {
    let h = handle(Duration::ZERO);
    let other = h.clone();
    h.start().unwrap();

    let count = other.with_simulator(|sim| sim.step_count());
    assert_eq!(count, 1);
    other.step().unwrap();
    assert_eq!(h.with_simulator(|sim| sim.step_count()), 2);
}
