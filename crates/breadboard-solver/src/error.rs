//! Error types for breadboard-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix: no usable pivot")]
    SingularMatrix,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index {index} out of range for dimension {dimension}")]
    IndexOutOfRange { index: usize, dimension: usize },

    #[error("simulator is not initialized")]
    NotInitialized,

    #[error("circuit has no nodes to solve for")]
    NoNodes,

    #[error("did not converge after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    #[error(transparent)]
    Circuit(#[from] breadboard_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
