//! Error types for breadboard-devices.

use thiserror::Error;

use crate::pin::PinMode;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },

    #[error("unknown LED color: {0}")]
    UnknownColor(String),

    #[error("{pin} cannot {operation} in {mode:?} mode")]
    WrongMode {
        pin: String,
        mode: PinMode,
        operation: &'static str,
    },

    #[error("{0} does not support PWM")]
    PwmUnsupported(String),

    #[error(transparent)]
    Circuit(#[from] breadboard_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
