//! Simulator configuration.

use std::time::Duration;

use crate::linear::LinearStrategy;

/// Single-terminal sources at or below this voltage are stamped as their
/// output resistance to ground instead of as a fixed voltage (V).
pub const VOLTAGE_SOURCE_THRESHOLD: f64 = 0.01;

/// Controls the nonlinear loop and re-solve scheduling.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Iteration budget for one full nonlinear resolve.
    pub max_iterations: usize,
    /// Per-component voltage and current change (V, A) that counts as settled.
    pub tolerance: f64,
    /// Simulated time added per resolve (s).
    pub time_step: f64,
    /// Minimum wall-clock spacing between coalesced resolves.
    pub min_update_interval: Duration,
    /// Linear solver used inside each iteration.
    pub strategy: LinearStrategy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            time_step: 0.001,
            min_update_interval: Duration::from_millis(10),
            strategy: LinearStrategy::Direct,
        }
    }
}

impl SimulatorConfig {
    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the minimum interval between coalesced resolves.
    pub fn with_min_update_interval(mut self, interval: Duration) -> Self {
        self.min_update_interval = interval;
        self
    }

    /// Set the linear solver strategy.
    pub fn with_strategy(mut self, strategy: LinearStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulatorConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.time_step, 0.001);
        assert_eq!(config.min_update_interval, Duration::from_millis(10));
        assert_eq!(config.strategy, LinearStrategy::Direct);
    }

    #[test]
    fn test_builders() {
        let config = SimulatorConfig::default()
            .with_max_iterations(5)
            .with_tolerance(1e-9)
            .with_strategy(LinearStrategy::Elimination);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.tolerance, 1e-9);
        assert_eq!(config.strategy, LinearStrategy::Elimination);
    }
}
