//! Fixed resistor.

use breadboard_core::{Electrical, StateUpdate};

use crate::error::{Error, Result};

/// A two-terminal linear resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    name: String,
    resistance: f64,
    voltage: f64,
    current: f64,
}

impl Resistor {
    /// Create a resistor. The value must be strictly positive.
    pub fn new(resistance: f64) -> Result<Self> {
        Self::named("Resistor", resistance)
    }

    pub fn named(name: impl Into<String>, resistance: f64) -> Result<Self> {
        check_resistance(resistance)?;
        Ok(Self {
            name: name.into(),
            resistance,
            voltage: 0.0,
            current: 0.0,
        })
    }

    /// Change the resistance. Non-positive values are rejected and the
    /// previous value is kept.
    pub fn set_resistance(&mut self, resistance: f64) -> Result<()> {
        check_resistance(resistance)?;
        self.resistance = resistance;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Dissipated power in watts.
    pub fn power(&self) -> f64 {
        (self.voltage * self.current).abs()
    }
}

fn check_resistance(resistance: f64) -> Result<()> {
    if resistance > 0.0 && resistance.is_finite() {
        Ok(())
    } else {
        log::warn!("rejecting resistance {}", resistance);
        Err(Error::InvalidValue {
            name: "resistance",
            value: resistance,
        })
    }
}

impl Electrical for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        2
    }

    fn resistance(&self) -> f64 {
        self.resistance
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate {
        self.voltage = voltage;
        self.current = current;
        StateUpdate::default()
    }

    fn reset(&mut self) {
        self.voltage = 0.0;
        self.current = 0.0;
    }
}
