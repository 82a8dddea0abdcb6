//! Breadboard command-line interface.
//!
//! Builds one of a few canned circuits, runs the nonlinear solver to a
//! steady state and prints the operating point.

mod circuits;
mod output;

use anyhow::Result;
use breadboard_core::Circuit;
use breadboard_devices::{Device, LedColor};
use breadboard_solver::{LinearStrategy, Simulator, SimulatorConfig};
use clap::{Parser, Subcommand, ValueEnum};

use crate::output::{print_connection_issues, print_solution};

#[derive(Parser)]
#[command(name = "breadboard")]
#[command(about = "Breadboard - steady-state circuit simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Linear solver used inside each iteration.
    #[arg(long, value_enum, global = true, default_value_t = Strategy::Direct)]
    strategy: Strategy,

    /// Iteration budget for the nonlinear loop.
    #[arg(long, global = true, default_value_t = 100)]
    max_iterations: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// nalgebra LU decomposition
    Direct,
    /// Gaussian elimination with partial pivoting
    Elimination,
}

impl From<Strategy> for LinearStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Direct => LinearStrategy::Direct,
            Strategy::Elimination => LinearStrategy::Elimination,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Digital pin -> LED -> resistor -> GND
    Led {
        /// LED color (red, green, yellow, blue, white)
        #[arg(long, default_value = "red")]
        color: LedColor,
        /// Series resistance in ohms
        #[arg(long, default_value_t = 220.0)]
        resistance: f64,
        /// Drive the pin LOW instead of HIGH
        #[arg(long)]
        low: bool,
    },
    /// Analog pin -> resistor -> GND
    Resistor {
        #[arg(long, default_value_t = 5.0)]
        voltage: f64,
        #[arg(long, default_value_t = 220.0)]
        resistance: f64,
    },
    /// Analog pin -> R1 -> OUT -> R2 -> GND
    Divider {
        #[arg(long, default_value_t = 5.0)]
        voltage: f64,
        #[arg(long, default_value_t = 1000.0)]
        r1: f64,
        #[arg(long, default_value_t = 1000.0)]
        r2: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (title, circuit) = match cli.command {
        Command::Led {
            color,
            resistance,
            low,
        } => {
            let level = if low { "LOW" } else { "HIGH" };
            (
                format!("{} LED, {} Ohm, pin {}", color, resistance, level),
                circuits::led_loop(color, resistance, !low)?,
            )
        }
        Command::Resistor {
            voltage,
            resistance,
        } => (
            format!("{} V across {} Ohm", voltage, resistance),
            circuits::single_resistor(voltage, resistance)?,
        ),
        Command::Divider { voltage, r1, r2 } => (
            format!("{} V divider, R1 = {} Ohm, R2 = {} Ohm", voltage, r1, r2),
            circuits::divider(voltage, r1, r2)?,
        ),
    };

    let config = SimulatorConfig::default()
        .with_strategy(cli.strategy.into())
        .with_max_iterations(cli.max_iterations);
    run(&title, circuit, config)
}

fn run(title: &str, circuit: Circuit<Device>, config: SimulatorConfig) -> Result<()> {
    println!("Steady-State Analysis: {}", title);
    println!("{:=<60}", "");
    println!();

    print_connection_issues(&circuit);

    let mut sim = Simulator::with_config(circuit, config);
    let report = sim
        .step()
        .map_err(|e| anyhow::anyhow!("Solver error: {}", e))?;
    print_solution(&sim, &report);

    println!("Analysis complete.");
    Ok(())
}
