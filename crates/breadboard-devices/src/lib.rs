//! Device models for Breadboard.
//!
//! This crate provides the closed set of circuit elements the solver knows:
//! - Passive elements: resistor, wire (ideal or gauge/length derived)
//! - The empirical LED model, the only nonlinear element
//! - Microcontroller pins: driven/pull-up/power pins and high-impedance probes
//!
//! All of them are wrapped in [`Device`], which implements
//! [`breadboard_core::Electrical`] so a `Circuit<Device>` can hold any mix.

pub mod device;
pub mod error;
pub mod led;
pub mod pin;
pub mod resistor;
pub mod sense;
pub mod wire;
pub mod wiring;

pub use device::Device;
pub use error::{Error, Result};
pub use led::{Led, LedColor};
pub use pin::{DriverPin, PinKind, PinMode, PowerRail};
pub use resistor::Resistor;
pub use sense::SensePin;
pub use wire::{Point, Wire};
pub use wiring::Wiring;
