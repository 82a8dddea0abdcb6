//! Benchmarks for matrix assembly and the linear strategies.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::{DMatrix, DVector};

use breadboard_core::Circuit;
use breadboard_devices::{Device, DriverPin, Led, LedColor, PinMode, Resistor};
use breadboard_solver::linear::{solve_dense, solve_elimination};
use breadboard_solver::{MatrixSolver, Simulator};

/// Nodal matrix of a resistor ladder driven at node 0.
fn ladder(size: usize) -> (DMatrix<f64>, DVector<f64>) {
    let mut m = MatrixSolver::new(size);
    for i in 0..size - 1 {
        m.add_conductance(Some(i), Some(i + 1), 1e-3).unwrap();
        m.add_conductance(Some(i + 1), None, 1e-4).unwrap();
    }
    m.set_node_voltage(0, 5.0).unwrap();
    (m.matrix().clone(), m.rhs().clone())
}

fn bench_linear(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear");

    for size in [4, 16, 64, 128] {
        let (a, b) = ladder(size);
        group.bench_with_input(BenchmarkId::new("dense_lu", size), &size, |bencher, _| {
            bencher.iter(|| solve_dense(black_box(&a), black_box(&b)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("elimination", size), &size, |bencher, _| {
            bencher.iter(|| solve_elimination(black_box(&a), black_box(&b)).unwrap());
        });
    }

    group.finish();
}

fn led_simulator() -> Simulator<Device> {
    let mut circuit = Circuit::new();
    let mut pin = DriverPin::digital(13);
    pin.set_mode(PinMode::Output).unwrap();
    pin.digital_write(true).unwrap();
    let pin = circuit.attach_external(pin.into());
    let led = circuit.add_component(Led::new(LedColor::Red).into());
    let r = circuit.add_component(Resistor::new(220.0).unwrap().into());
    circuit.connect_components(pin, 0, led, Led::ANODE).unwrap();
    circuit.connect_components(led, Led::CATHODE, r, 0).unwrap();
    circuit.connect_to_node(r, 1, circuit.ground()).unwrap();
    Simulator::new(circuit)
}

fn bench_led_resolve(c: &mut Criterion) {
    c.bench_function("led_cold_resolve", |bencher| {
        bencher.iter_batched(
            || {
                let mut sim = led_simulator();
                sim.initialize().unwrap();
                sim
            },
            |mut sim| sim.solve().unwrap(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_linear, bench_led_resolve);
criterion_main!(benches);
