//! High-impedance probe.

use breadboard_core::{Electrical, StateUpdate};

use crate::pin::{INPUT_RESISTANCE, VCC, voltage_to_adc};

/// A single-terminal measurement point that loads its node with 1 GOhm.
#[derive(Debug, Clone)]
pub struct SensePin {
    name: String,
    voltage: f64,
    current: f64,
}

impl SensePin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// Last observed node voltage.
    pub fn reading(&self) -> f64 {
        self.voltage
    }

    pub fn adc_reading(&self) -> u16 {
        voltage_to_adc(self.voltage)
    }

    pub fn is_high(&self) -> bool {
        self.voltage > VCC / 2.0
    }
}

impl Electrical for SensePin {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        1
    }

    fn resistance(&self) -> f64 {
        INPUT_RESISTANCE
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate {
        let previous = self.voltage;
        self.voltage = voltage;
        self.current = current;
        StateUpdate {
            changed: (voltage - previous).abs() > 0.01,
            overload_started: false,
        }
    }

    fn reset(&mut self) {
        self.voltage = 0.0;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_readings() {
        let mut probe = SensePin::new("A0 probe");
        let update = probe.update_state(3.3, 3.3e-9);
        assert!(update.changed);
        assert!(probe.is_high());
        assert_eq!(probe.adc_reading(), 675);
        assert!(!probe.update_state(3.301, 3.3e-9).changed);
    }
}
