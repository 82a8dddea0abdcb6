//! Nodal-analysis solver and nonlinear simulator for Breadboard.
//!
//! This crate provides:
//! - [`MatrixSolver`]: conductance-matrix assembly (stamping) for `G * V = I`
//! - Two linear strategies: nalgebra LU and a self-contained Gaussian elimination
//! - [`Simulator`]: the outer loop that iterates nonlinear elements (LEDs)
//!   to a steady state and publishes progress on the circuit's event bus
//! - [`SimulationHandle`]: a shared, single-flight front end that coalesces
//!   bursts of resolve requests

pub mod config;
pub mod error;
pub mod handle;
pub mod linear;
pub mod matrix;
pub mod simulator;

pub use config::{SimulatorConfig, VOLTAGE_SOURCE_THRESHOLD};
pub use error::{Error, Result};
pub use handle::SimulationHandle;
pub use linear::{LinearStrategy, solve_dense, solve_elimination};
pub use matrix::MatrixSolver;
pub use simulator::{SimulationState, Simulator, SolveReport};
