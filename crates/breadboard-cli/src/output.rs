//! Result printing.

use breadboard_core::{Circuit, Electrical};
use breadboard_devices::Device;
use breadboard_solver::{Simulator, SolveReport};

/// Print the operating point of a solved circuit.
pub fn print_solution(sim: &Simulator<Device>, report: &SolveReport) {
    let circuit = sim.circuit();

    if report.converged {
        println!("Converged in {} iterations.", report.iterations);
    } else {
        eprintln!(
            "Warning: no convergence after {} iterations; showing last values",
            report.iterations
        );
    }
    println!();

    print_node_voltages(circuit);
    print_components(circuit);
    print_leds(circuit);
}

fn print_node_voltages(circuit: &Circuit<Device>) {
    println!("Node Voltages:");
    println!("{:-<36}", "");
    for node in circuit.nodes() {
        let label = match node.name() {
            Some(name) => name.to_string(),
            None => node.id().to_string(),
        };
        println!("  V({:<10}) = {:>12.6} V", label, node.voltage());
    }
    println!();
}

fn print_components(circuit: &Circuit<Device>) {
    println!("Components:");
    println!("{:-<60}", "");
    println!(
        "  {:<16} {:<9} {:>12} {:>14}",
        "Name", "Kind", "Voltage", "Current"
    );
    for (_, device) in circuit.components() {
        println!(
            "  {:<16} {:<9} {:>10.6} V {:>11.6} mA",
            device.name(),
            device.kind(),
            device.voltage(),
            device.current() * 1e3
        );
    }
    println!();
}

fn print_leds(circuit: &Circuit<Device>) {
    let leds: Vec<_> = circuit
        .components()
        .filter_map(|(_, d)| d.as_led())
        .collect();
    if leds.is_empty() {
        return;
    }

    println!("LEDs:");
    println!("{:-<60}", "");
    for led in leds {
        let state = if led.is_on() { "ON" } else { "off" };
        println!(
            "  {:<16} {:<4} brightness {:>5.1}%  R = {:.1} Ohm  P = {:.2} mW",
            led.name(),
            state,
            led.brightness() * 100.0,
            led.resistance(),
            led.power_dissipation() * 1e3
        );
        if led.is_overloaded() {
            eprintln!("Warning: {} is overloaded", led.name());
        }
    }
    println!();
}

/// Report advisory connectivity problems on stderr.
pub fn print_connection_issues(circuit: &Circuit<Device>) {
    for issue in circuit.connection_issues() {
        eprintln!("Warning: {}", issue);
    }
}
