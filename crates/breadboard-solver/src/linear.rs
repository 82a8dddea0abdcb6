//! Linear system solvers.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Pivots smaller than this are treated as zero.
pub const PIVOT_EPSILON: f64 = 1e-10;

/// Which algorithm solves the assembled `G * V = I` system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearStrategy {
    /// Dense LU decomposition from nalgebra.
    #[default]
    Direct,
    /// Self-contained Gaussian elimination with partial pivoting.
    Elimination,
}

impl LinearStrategy {
    pub fn solve(self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
        match self {
            LinearStrategy::Direct => solve_dense(a, b),
            LinearStrategy::Elimination => solve_elimination(a, b),
        }
    }
}

fn check_dimensions(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<()> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Solve a linear system Ax = b using LU decomposition.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_dimensions(a, b)?;
    let x = a.clone().lu().solve(b).ok_or(Error::SingularMatrix)?;
    // LU accepts tiny pivots that elimination would reject; a non-finite
    // result means the system was numerically singular.
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(Error::SingularMatrix)
    }
}

/// Solve a linear system Ax = b by Gaussian elimination with partial
/// pivoting followed by back-substitution.
///
/// Works on copies; `a` and `b` are left untouched.
pub fn solve_elimination(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_dimensions(a, b)?;
    let n = b.len();
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[(i, col)].abs().total_cmp(&m[(j, col)].abs()))
            .unwrap_or(col);
        if m[(pivot_row, col)].abs() < PIVOT_EPSILON {
            log::debug!("no usable pivot in column {}", col);
            return Err(Error::SingularMatrix);
        }
        if pivot_row != col {
            m.swap_rows(pivot_row, col);
            rhs.swap_rows(pivot_row, col);
        }

        let pivot = m[(col, col)];
        for j in col..n {
            m[(col, j)] /= pivot;
        }
        rhs[col] /= pivot;

        for row in (col + 1)..n {
            let factor = m[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                m[(row, j)] -= factor * m[(col, j)];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = DVector::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| m[(row, j)] * x[j]).sum();
        x[row] = rhs[row] - tail;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_solve_simple() {
        // 2x + y = 5
        // x + 3y = 6
        // Solution: x = 1.8, y = 1.4
        let a = dmatrix![2.0, 1.0; 1.0, 3.0];
        let b = dvector![5.0, 6.0];

        for strategy in [LinearStrategy::Direct, LinearStrategy::Elimination] {
            let x = strategy.solve(&a, &b).unwrap();
            assert!((x[0] - 1.8).abs() < 1e-10, "{:?}: x = {}", strategy, x[0]);
            assert!((x[1] - 1.4).abs() < 1e-10, "{:?}: y = {}", strategy, x[1]);
        }
    }

    #[test]
    fn test_elimination_needs_pivoting() {
        // Zero in the leading position forces a row swap.
        let a = dmatrix![0.0, 1.0, 1.0; 2.0, 1.0, 0.0; 1.0, 0.0, 3.0];
        let b = dvector![3.0, 4.0, 7.0];

        let x = solve_elimination(&a, &b).unwrap();
        let residual = &a * &x - &b;
        assert!(residual.norm() < 1e-12, "residual {}", residual.norm());
    }

    #[test]
    fn test_strategies_agree() {
        // Nodal matrix of a 4-node resistor ladder with a forced first row.
        let a = dmatrix![
            1.0, 0.0, 0.0, 0.0;
            -0.01, 0.03, -0.01, 0.0;
            0.0, -0.01, 0.03, -0.01;
            0.0, 0.0, -0.01, 0.02
        ];
        let b = dvector![5.0, 0.0, 0.0, 0.0];

        let direct = solve_dense(&a, &b).unwrap();
        let elim = solve_elimination(&a, &b).unwrap();
        for i in 0..4 {
            assert!(
                (direct[i] - elim[i]).abs() < 1e-9,
                "row {}: {} vs {}",
                i,
                direct[i],
                elim[i]
            );
        }
    }

    #[test]
    fn test_singular_matrix() {
        let a = dmatrix![1.0, 2.0; 2.0, 4.0]; // Singular (row 2 = 2 * row 1)
        let b = dvector![1.0, 2.0];

        assert!(matches!(solve_dense(&a, &b), Err(Error::SingularMatrix)));
        assert!(matches!(solve_elimination(&a, &b), Err(Error::SingularMatrix)));
    }

    #[test]
    fn test_zero_row_is_singular() {
        let a = dmatrix![1.0, 0.0; 0.0, 0.0];
        let b = dvector![1.0, 0.0];
        assert!(solve_elimination(&a, &b).is_err());
        assert!(solve_dense(&a, &b).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = dmatrix![1.0, 2.0; 3.0, 4.0];
        let b = dvector![1.0, 2.0, 3.0];

        let result = solve_dense(&a, &b);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
        let result = solve_elimination(&a, &b);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
