//! Nodal-analysis conductance system.
//!
//! [`MatrixSolver`] owns `G * V = I` for the non-ground nodes of a circuit.
//! Node arguments are `Option<usize>`: `Some(i)` is unknown `i`, `None` is
//! the ground reference, which never has a row.
//!
//! Fixed voltages are enforced by overwriting the node's row with an
//! identity row (`V_i = v`) rather than by adding a branch-current unknown
//! as full modified nodal analysis would. This is exact for sources whose
//! other end is ground. Two sources sharing a loop away from ground are not
//! modeled correctly: see [`MatrixSolver::add_voltage_source`].

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::linear::LinearStrategy;

/// Conductances and injected currents below this are not stamped.
pub const STABILITY_EPSILON: f64 = 1e-10;
/// Largest tolerated ratio between the biggest and smallest nonzero entry.
pub const CONDITION_LIMIT: f64 = 1e12;
/// Systems up to this size are checked with a determinant.
pub const DETERMINANT_MAX_DIMENSION: usize = 4;

#[derive(Debug, Clone)]
pub struct MatrixSolver {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    solution: DVector<f64>,
    /// Rows overwritten by a fixed-voltage constraint.
    forced: Vec<bool>,
    /// Current source values by (from, to), returned verbatim by
    /// [`branch_current`](MatrixSolver::branch_current).
    source_currents: HashMap<(Option<usize>, Option<usize>), f64>,
    strategy: LinearStrategy,
}

impl Default for MatrixSolver {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MatrixSolver {
    pub fn new(dimension: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(dimension, dimension),
            rhs: DVector::zeros(dimension),
            solution: DVector::zeros(dimension),
            forced: vec![false; dimension],
            source_currents: HashMap::new(),
            strategy: LinearStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: LinearStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> LinearStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: LinearStrategy) {
        self.strategy = strategy;
    }

    /// Number of unknowns.
    pub fn dimension(&self) -> usize {
        self.rhs.len()
    }

    /// Reallocate for `dimension` unknowns and zero everything.
    pub fn set_dimension(&mut self, dimension: usize) {
        if dimension != self.dimension() {
            self.matrix = DMatrix::zeros(dimension, dimension);
            self.rhs = DVector::zeros(dimension);
            self.solution = DVector::zeros(dimension);
            self.forced = vec![false; dimension];
            self.source_currents.clear();
        } else {
            self.clear();
            self.solution.fill(0.0);
        }
    }

    /// Zero the matrix and right-hand side for a fresh assembly.
    ///
    /// The previous solution is kept so it can still be read back.
    pub fn clear(&mut self) {
        self.matrix.fill(0.0);
        self.rhs.fill(0.0);
        self.forced.fill(false);
        self.source_currents.clear();
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn solution(&self) -> &DVector<f64> {
        &self.solution
    }

    fn check_index(&self, index: Option<usize>) -> Result<()> {
        match index {
            Some(i) if i >= self.dimension() => {
                log::warn!("node index {} out of range ({} unknowns)", i, self.dimension());
                Err(Error::IndexOutOfRange {
                    index: i,
                    dimension: self.dimension(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Stamp a conductance `g` between two nodes.
    ///
    /// ```text
    ///        a     b
    ///   a [ +g    -g ]
    ///   b [ -g    +g ]
    /// ```
    ///
    /// With one side at ground only the other diagonal is stamped.
    /// Conductances below [`STABILITY_EPSILON`] are skipped.
    pub fn add_conductance(&mut self, a: Option<usize>, b: Option<usize>, g: f64) -> Result<()> {
        self.check_index(a)?;
        self.check_index(b)?;
        if g < STABILITY_EPSILON {
            return Ok(());
        }
        if let Some(i) = a {
            self.matrix[(i, i)] += g;
        }
        if let Some(j) = b {
            self.matrix[(j, j)] += g;
        }
        if let (Some(i), Some(j)) = (a, b) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
        Ok(())
    }

    /// Stamp a current source pushing `current` out of `from` and into `to`.
    pub fn add_current_source(
        &mut self,
        from: Option<usize>,
        to: Option<usize>,
        current: f64,
    ) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if current.abs() < STABILITY_EPSILON {
            return Ok(());
        }
        if let Some(i) = from {
            self.rhs[i] -= current;
        }
        if let Some(j) = to {
            self.rhs[j] += current;
        }
        *self.source_currents.entry((from, to)).or_insert(0.0) += current;
        Ok(())
    }

    /// Force `V[node] = voltage` by replacing the node's row with an
    /// identity row.
    pub fn set_node_voltage(&mut self, node: usize, voltage: f64) -> Result<()> {
        self.check_index(Some(node))?;
        self.matrix.row_mut(node).fill(0.0);
        self.matrix[(node, node)] = 1.0;
        self.rhs[node] = voltage;
        self.forced[node] = true;
        Ok(())
    }

    /// Impose `V[pos] - V[neg] = voltage`.
    ///
    /// Ground-referenced sources reduce to [`set_node_voltage`]. When
    /// neither side is ground, `pos` is forced to `voltage` and `neg` to 0,
    /// which is only right when `neg` is effectively at ground potential.
    ///
    /// [`set_node_voltage`]: MatrixSolver::set_node_voltage
    pub fn add_voltage_source(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        voltage: f64,
    ) -> Result<()> {
        match (pos, neg) {
            (Some(p), None) => self.set_node_voltage(p, voltage),
            (None, Some(n)) => self.set_node_voltage(n, -voltage),
            (Some(p), Some(n)) => {
                self.set_node_voltage(p, voltage)?;
                self.set_node_voltage(n, 0.0)
            }
            (None, None) => Ok(()),
        }
    }

    /// Solve the assembled system with the configured strategy.
    ///
    /// On failure the previous solution is left in place.
    pub fn solve(&mut self) -> Result<&DVector<f64>> {
        if self.dimension() == 0 {
            return Ok(&self.solution);
        }
        self.solution = self.strategy.solve(&self.matrix, &self.rhs)?;
        Ok(&self.solution)
    }

    /// Solved voltage of unknown `index`.
    pub fn try_node_voltage(&self, index: usize) -> Result<f64> {
        self.check_index(Some(index))?;
        Ok(self.solution[index])
    }

    /// Solved voltage of unknown `index`, or 0 (with a warning) when the
    /// index is out of range.
    pub fn node_voltage(&self, index: usize) -> f64 {
        self.try_node_voltage(index).unwrap_or(0.0)
    }

    /// Current flowing from `a` to `b`.
    ///
    /// A stamped current source between the two is returned exactly, negated
    /// when queried against its direction.
    /// Otherwise the current is derived from the stamped conductance and the
    /// solved voltages. Rows overwritten by a voltage constraint no longer
    /// hold their conductances, so the other node's row is used instead; a
    /// forced node tied to ground has no usable row and reports 0.
    pub fn branch_current(&self, a: Option<usize>, b: Option<usize>) -> f64 {
        if let Some(&current) = self.source_currents.get(&(a, b)) {
            return current;
        }
        if let Some(&current) = self.source_currents.get(&(b, a)) {
            return -current;
        }
        if self.check_index(a).is_err() || self.check_index(b).is_err() {
            return 0.0;
        }

        match (a, b) {
            (Some(i), Some(j)) => {
                let g = if !self.forced[i] {
                    -self.matrix[(i, j)]
                } else if !self.forced[j] {
                    -self.matrix[(j, i)]
                } else {
                    log::warn!("branch {}-{} lies between two forced nodes", i, j);
                    0.0
                };
                g * (self.solution[i] - self.solution[j])
            }
            (Some(i), None) => self.ground_branch_current(i),
            (None, Some(j)) => -self.ground_branch_current(j),
            (None, None) => 0.0,
        }
    }

    /// Current from node `i` to ground: the diagonal minus the conductances
    /// to other unknowns leaves the conductance to ground.
    fn ground_branch_current(&self, i: usize) -> f64 {
        if self.forced[i] {
            log::warn!("node {} is forced; its ground branch is not recoverable", i);
            return 0.0;
        }
        let row = self.matrix.row(i);
        let g: f64 = row.iter().sum();
        g * self.solution[i]
    }

    /// Conditioning check run before solving.
    ///
    /// Small systems need a non-negligible determinant. Larger ones need
    /// every diagonal entry above [`STABILITY_EPSILON`] and a spread of
    /// nonzero magnitudes below [`CONDITION_LIMIT`].
    pub fn is_valid(&self) -> bool {
        let n = self.dimension();
        if n == 0 {
            return false;
        }
        if n <= DETERMINANT_MAX_DIMENSION {
            return self.matrix.determinant().abs() > STABILITY_EPSILON;
        }

        if (0..n).any(|i| self.matrix[(i, i)].abs() < STABILITY_EPSILON) {
            return false;
        }
        let (min, max) = self
            .matrix
            .iter()
            .map(|v| v.abs())
            .filter(|v| *v > 0.0)
            .fold((f64::INFINITY, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        max > STABILITY_EPSILON && max / min < CONDITION_LIMIT
    }
}
