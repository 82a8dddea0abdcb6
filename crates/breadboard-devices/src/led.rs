//! Empirical LED model.
//!
//! The LED is modeled as a current-dependent resistance rather than with the
//! Shockley equation. Each call to `update_state` decides whether the diode
//! conducts and, if so, sets its resistance to `Vf / I + Rs`. The outer
//! nonlinear loop iterates until that resistance and the solved current agree.

use std::fmt;
use std::str::FromStr;

use breadboard_core::{Electrical, StateUpdate};

use crate::error::{Error, Result};

/// Resistance reported while the LED is not conducting (Ohm).
pub const OFF_RESISTANCE: f64 = 1e6;
/// Current below which the LED is considered dark (A).
pub const MIN_CONDUCTION_CURRENT: f64 = 1e-6;
/// Empirical series resistance added to the dynamic term (Ohm).
pub const SERIES_RESISTANCE: f64 = 25.0;
/// Typical operating current; brightness reaches 1.0 here (A).
pub const RATED_CURRENT: f64 = 0.02;
/// Default thermal limit (W).
pub const THERMAL_LIMIT: f64 = 0.1;

/// Brightness change that counts as a visible state change.
const BRIGHTNESS_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Red,
    Green,
    Yellow,
    Blue,
    White,
}

impl LedColor {
    /// Typical forward voltage (V).
    pub fn forward_voltage(self) -> f64 {
        match self {
            LedColor::Red => 1.8,
            LedColor::Green => 2.2,
            LedColor::Yellow => 2.0,
            LedColor::Blue | LedColor::White => 3.2,
        }
    }

    /// Maximum safe current (A).
    pub fn max_current(self) -> f64 {
        match self {
            LedColor::Blue | LedColor::White => 0.020,
            _ => 0.025,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedColor::Red => "Red",
            LedColor::Green => "Green",
            LedColor::Yellow => "Yellow",
            LedColor::Blue => "Blue",
            LedColor::White => "White",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(LedColor::Red),
            "green" => Ok(LedColor::Green),
            "yellow" => Ok(LedColor::Yellow),
            "blue" => Ok(LedColor::Blue),
            "white" => Ok(LedColor::White),
            _ => Err(Error::UnknownColor(s.to_string())),
        }
    }
}

/// A light-emitting diode. Terminal 0 is the anode, terminal 1 the cathode.
#[derive(Debug, Clone)]
pub struct Led {
    name: String,
    color: LedColor,
    forward_voltage: f64,
    rated_current: f64,
    max_current: f64,
    thermal_limit: f64,
    on: bool,
    brightness: f64,
    dynamic_resistance: f64,
    overloaded: bool,
    voltage: f64,
    current: f64,
}

impl Led {
    pub const ANODE: usize = 0;
    pub const CATHODE: usize = 1;

    pub fn new(color: LedColor) -> Self {
        Self {
            name: format!("{} LED", color),
            color,
            forward_voltage: color.forward_voltage(),
            rated_current: RATED_CURRENT,
            max_current: color.max_current(),
            thermal_limit: THERMAL_LIMIT,
            on: false,
            brightness: 0.0,
            dynamic_resistance: OFF_RESISTANCE,
            overloaded: false,
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// Build a stock LED by color name. Unknown names fall back to red.
    pub fn standard(kind: &str) -> Self {
        match kind.parse() {
            Ok(color) => Self::new(color),
            Err(_) => {
                log::warn!("unknown LED type {:?}, defaulting to red", kind);
                Self::new(LedColor::Red)
            }
        }
    }

    pub fn color(&self) -> LedColor {
        self.color
    }

    /// Change color; forward voltage follows the color's typical value.
    pub fn set_color(&mut self, color: LedColor) {
        if self.color != color {
            self.color = color;
            self.forward_voltage = color.forward_voltage();
            self.recompute();
        }
    }

    pub fn forward_voltage(&self) -> f64 {
        self.forward_voltage
    }

    pub fn set_forward_voltage(&mut self, voltage: f64) -> Result<()> {
        if !voltage.is_finite() || voltage <= 0.0 {
            return Err(Error::InvalidValue {
                name: "forward voltage",
                value: voltage,
            });
        }
        self.forward_voltage = voltage;
        self.recompute();
        Ok(())
    }

    pub fn max_current(&self) -> f64 {
        self.max_current
    }

    /// Change the current limit. Returns true if this pushed the LED into
    /// overload.
    pub fn set_max_current(&mut self, current: f64) -> Result<bool> {
        if !current.is_finite() || current <= 0.0 {
            return Err(Error::InvalidValue {
                name: "max current",
                value: current,
            });
        }
        self.max_current = current;
        Ok(self.check_overload())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Relative light output in 0.0..=1.0.
    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    /// |V * I| in watts.
    pub fn power_dissipation(&self) -> f64 {
        (self.voltage * self.current).abs()
    }

    /// Linear up to the rated current, then a logarithmic saturation
    /// region clamped at 1.
    fn brightness_for(&self, current: f64) -> f64 {
        if current <= MIN_CONDUCTION_CURRENT {
            return 0.0;
        }
        if current <= self.rated_current {
            return current / self.rated_current;
        }
        let excess = current - self.rated_current;
        let headroom = self.max_current - self.rated_current;
        if headroom > 0.0 {
            (1.0 + 0.3 * (1.0 + excess / headroom).ln()).min(1.0)
        } else {
            1.0
        }
    }

    fn dynamic_resistance_for(&self, current: f64) -> f64 {
        if current <= MIN_CONDUCTION_CURRENT {
            OFF_RESISTANCE
        } else {
            SERIES_RESISTANCE + self.forward_voltage / current
        }
    }

    fn recompute(&mut self) {
        let forward = self.voltage > 0.0 && self.current > 0.0;
        let above_threshold = self.voltage.abs() >= self.forward_voltage;
        let conducting = self.current.abs() > MIN_CONDUCTION_CURRENT;
        self.on = forward && above_threshold && conducting;

        if self.on {
            let current = self.current.abs();
            self.brightness = self.brightness_for(current);
            self.dynamic_resistance = self.dynamic_resistance_for(current);
        } else {
            self.brightness = 0.0;
            self.dynamic_resistance = OFF_RESISTANCE;
        }
    }

    /// Re-evaluate the overload flag. Returns true on a fresh transition.
    fn check_overload(&mut self) -> bool {
        let was = self.overloaded;
        let current = self.current.abs();
        let power = self.power_dissipation();
        self.overloaded = current > self.max_current || power > self.thermal_limit;

        let started = self.overloaded && !was;
        if started {
            log::warn!(
                "{} overloaded: {:.2} mA (max {:.2} mA), {:.1} mW (max {:.1} mW)",
                self.name,
                current * 1e3,
                self.max_current * 1e3,
                power * 1e3,
                self.thermal_limit * 1e3
            );
        }
        started
    }
}

impl Electrical for Led {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        2
    }

    fn resistance(&self) -> f64 {
        self.dynamic_resistance
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate {
        let was_on = self.on;
        let previous_brightness = self.brightness;

        self.voltage = voltage;
        self.current = current;
        self.recompute();
        let overload_started = self.check_overload();

        StateUpdate {
            changed: was_on != self.on
                || (previous_brightness - self.brightness).abs() > BRIGHTNESS_EPSILON,
            overload_started,
        }
    }

    fn reset(&mut self) {
        self.voltage = 0.0;
        self.current = 0.0;
        self.on = false;
        self.brightness = 0.0;
        self.dynamic_resistance = OFF_RESISTANCE;
        self.overloaded = false;
    }
}
