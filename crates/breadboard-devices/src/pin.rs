//! Microcontroller pin models.
//!
//! A [`DriverPin`] is the single-terminal element a board collaborator hands
//! to the circuit for each of its pins. What it looks like to the solver
//! depends on its mode:
//!
//! | mode                     | matrix contribution                          |
//! |--------------------------|----------------------------------------------|
//! | `Output`, `AnalogOutput` | fixed node voltage (25 Ohm to ground at 0 V) |
//! | `Input`, `AnalogInput`   | 1 GOhm to ground                             |
//! | `InputPullup`            | 50 kOhm toward the 5 V rail                  |
//!
//! Power-rail pins (GND, 5V, 3V3) are fixed and cannot change mode.

use std::fmt;

use breadboard_core::{Electrical, SourceBehavior, StateUpdate};

use crate::error::{Error, Result};

/// Board supply voltage (V).
pub const VCC: f64 = 5.0;
/// Digital pins with hardware PWM on an Uno-class board.
pub const PWM_PINS: [u8; 6] = [3, 5, 6, 9, 10, 11];
pub const OUTPUT_RESISTANCE: f64 = 25.0;
pub const INPUT_RESISTANCE: f64 = 1e9;
pub const PULLUP_RESISTANCE: f64 = 50e3;
pub const POWER_RAIL_RESISTANCE: f64 = 0.01;
/// Per-pin source/sink limit (A).
pub const MAX_PIN_CURRENT: f64 = 0.04;
/// ADC resolution in bits.
pub const ADC_BITS: u32 = 10;

/// Map a voltage onto the 10-bit ADC range against the 5 V reference.
pub fn voltage_to_adc(voltage: f64) -> u16 {
    let max = f64::from((1u32 << ADC_BITS) - 1);
    let ratio = (voltage / VCC).clamp(0.0, 1.0);
    // Truncation matches the hardware's floor behavior.
    (ratio * max) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
    AnalogInput,
    AnalogOutput,
}

impl PinMode {
    pub fn is_output(self) -> bool {
        matches!(self, PinMode::Output | PinMode::AnalogOutput)
    }

    pub fn is_input(self) -> bool {
        !self.is_output()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRail {
    Ground,
    Vcc5V,
    Vcc3V3,
}

impl PowerRail {
    pub fn voltage(self) -> f64 {
        match self {
            PowerRail::Ground => 0.0,
            PowerRail::Vcc5V => 5.0,
            PowerRail::Vcc3V3 => 3.3,
        }
    }
}

impl fmt::Display for PowerRail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PowerRail::Ground => "GND",
            PowerRail::Vcc5V => "5V",
            PowerRail::Vcc3V3 => "3V3",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Digital { pwm: bool },
    Analog,
    Power(PowerRail),
}

#[derive(Debug, Clone)]
pub struct DriverPin {
    name: String,
    number: Option<u8>,
    kind: PinKind,
    mode: PinMode,
    /// Commanded value, before the mode is taken into account.
    set_value: f64,
    output_voltage: f64,
    input_voltage: f64,
    output_current: f64,
    pwm_duty: u8,
    overloaded: bool,
    voltage: f64,
    current: f64,
}

impl DriverPin {
    fn with_kind(name: String, number: Option<u8>, kind: PinKind, mode: PinMode) -> Self {
        Self {
            name,
            number,
            kind,
            mode,
            set_value: 0.0,
            output_voltage: 0.0,
            input_voltage: 0.0,
            output_current: 0.0,
            pwm_duty: 0,
            overloaded: false,
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// Digital pin `number`, starting in input mode.
    pub fn digital(number: u8) -> Self {
        let pwm = PWM_PINS.contains(&number);
        Self::with_kind(
            format!("Digital Pin {}", number),
            Some(number),
            PinKind::Digital { pwm },
            PinMode::Input,
        )
    }

    /// Analog pin A`number`, starting in input mode.
    pub fn analog(number: u8) -> Self {
        Self::with_kind(
            format!("Analog Pin A{}", number),
            Some(number),
            PinKind::Analog,
            PinMode::Input,
        )
    }

    /// A fixed supply or ground pin.
    pub fn power(rail: PowerRail) -> Self {
        let mut pin = Self::with_kind(rail.to_string(), None, PinKind::Power(rail), PinMode::Output);
        pin.set_value = rail.voltage();
        pin.output_voltage = rail.voltage();
        pin
    }

    pub fn number(&self) -> Option<u8> {
        self.number
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }

    pub fn supports_pwm(&self) -> bool {
        matches!(self.kind, PinKind::Digital { pwm: true })
    }

    pub fn is_output(&self) -> bool {
        self.mode.is_output()
    }

    /// Voltage the pin is trying to drive.
    pub fn output_voltage(&self) -> f64 {
        self.output_voltage
    }

    /// Voltage last observed on the pin while in an input mode.
    pub fn input_voltage(&self) -> f64 {
        self.input_voltage
    }

    /// Current last delivered while driving.
    pub fn output_current(&self) -> f64 {
        self.output_current
    }

    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    /// Input voltage in input modes, driven voltage otherwise.
    pub fn read(&self) -> f64 {
        if self.mode.is_input() {
            self.input_voltage
        } else {
            self.output_voltage
        }
    }

    fn wrong_mode(&self, operation: &'static str) -> Error {
        log::warn!("{} cannot {} in {:?} mode", self.name, operation, self.mode);
        Error::WrongMode {
            pin: self.name.clone(),
            mode: self.mode,
            operation,
        }
    }

    /// Change mode. Leaving an output mode clears the driven state.
    pub fn set_mode(&mut self, mode: PinMode) -> Result<()> {
        if let PinKind::Power(_) = self.kind {
            return Err(Error::InvalidParameter(format!(
                "power pin {} has a fixed mode",
                self.name
            )));
        }
        if self.mode == mode {
            return Ok(());
        }
        if self.mode.is_output() {
            self.set_value = 0.0;
            self.output_voltage = 0.0;
            self.output_current = 0.0;
            self.pwm_duty = 0;
        }
        log::debug!("{} mode {:?} -> {:?}", self.name, self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    /// Drive the pin HIGH (5 V) or LOW (0 V). Requires `Output` mode.
    pub fn digital_write(&mut self, high: bool) -> Result<()> {
        if self.mode != PinMode::Output || matches!(self.kind, PinKind::Power(_)) {
            return Err(self.wrong_mode("digital_write"));
        }
        self.pwm_duty = 0;
        self.set_value = if high { VCC } else { 0.0 };
        self.output_voltage = self.set_value;
        Ok(())
    }

    /// PWM output, modeled by its average voltage `duty / 255 * VCC`.
    pub fn analog_write(&mut self, duty: u8) -> Result<()> {
        if !self.supports_pwm() {
            log::warn!("{} does not support PWM", self.name);
            return Err(Error::PwmUnsupported(self.name.clone()));
        }
        if self.mode != PinMode::Output {
            return Err(self.wrong_mode("analog_write"));
        }
        self.pwm_duty = duty;
        self.set_value = f64::from(duty) / 255.0 * VCC;
        self.output_voltage = self.set_value;
        Ok(())
    }

    pub fn pwm_duty(&self) -> u8 {
        self.pwm_duty
    }

    /// Drive an analog voltage, clamped to 0..=5 V. Requires `AnalogOutput`.
    pub fn analog_output(&mut self, voltage: f64) -> Result<()> {
        if self.mode != PinMode::AnalogOutput {
            return Err(self.wrong_mode("analog_output"));
        }
        self.set_value = voltage.clamp(0.0, VCC);
        self.output_voltage = self.set_value;
        Ok(())
    }

    /// Logic level against a VCC/2 threshold. Requires an input mode.
    pub fn digital_read(&self) -> Result<bool> {
        if !self.mode.is_input() {
            return Err(self.wrong_mode("digital_read"));
        }
        Ok(self.input_voltage > VCC / 2.0)
    }

    /// 10-bit ADC reading. Requires `AnalogInput`.
    pub fn analog_read(&self) -> Result<u16> {
        if self.mode != PinMode::AnalogInput {
            return Err(self.wrong_mode("analog_read"));
        }
        Ok(voltage_to_adc(self.input_voltage))
    }

    fn check_overload(&mut self) -> bool {
        let was = self.overloaded;
        let current = self.output_current.abs();
        self.overloaded = self.mode.is_output() && current > MAX_PIN_CURRENT;
        let started = self.overloaded && !was;
        if started {
            log::warn!(
                "{} current overload: {:.1} mA (max {:.1} mA)",
                self.name,
                current * 1e3,
                MAX_PIN_CURRENT * 1e3
            );
        }
        started
    }
}

impl Electrical for DriverPin {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        1
    }

    fn resistance(&self) -> f64 {
        if let PinKind::Power(_) = self.kind {
            return POWER_RAIL_RESISTANCE;
        }
        match self.mode {
            PinMode::Output | PinMode::AnalogOutput => OUTPUT_RESISTANCE,
            PinMode::InputPullup => PULLUP_RESISTANCE,
            PinMode::Input | PinMode::AnalogInput => INPUT_RESISTANCE,
        }
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate {
        let previous_voltage = self.voltage;
        let previous_current = self.current;

        // Supply rails hold their voltage regardless of load.
        let voltage = match self.kind {
            PinKind::Power(rail) => rail.voltage(),
            _ => voltage,
        };
        self.voltage = voltage;
        self.current = current;
        if self.mode.is_output() {
            self.output_current = current;
        } else {
            self.input_voltage = voltage;
        }
        let overload_started = self.check_overload();

        StateUpdate {
            changed: (voltage - previous_voltage).abs() > 0.01
                || (current - previous_current).abs() > 0.001,
            overload_started,
        }
    }

    fn reset(&mut self) {
        self.voltage = 0.0;
        self.current = 0.0;
        self.input_voltage = 0.0;
        self.output_current = 0.0;
        self.pwm_duty = 0;
        self.overloaded = false;
        match self.kind {
            PinKind::Power(rail) => {
                self.set_value = rail.voltage();
                self.output_voltage = rail.voltage();
            }
            _ => {
                self.set_value = 0.0;
                self.output_voltage = 0.0;
            }
        }
    }

    fn source_behavior(&self) -> SourceBehavior {
        match self.kind {
            PinKind::Power(PowerRail::Ground) => SourceBehavior::Passive,
            PinKind::Power(rail) => SourceBehavior::FixedVoltage(rail.voltage()),
            _ => match self.mode {
                PinMode::Output | PinMode::AnalogOutput => {
                    SourceBehavior::FixedVoltage(self.output_voltage)
                }
                PinMode::InputPullup => SourceBehavior::PullUp {
                    resistance: PULLUP_RESISTANCE,
                    supply: VCC,
                },
                PinMode::Input | PinMode::AnalogInput => SourceBehavior::Passive,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_write_requires_output() {
        let mut pin = DriverPin::digital(13);
        assert!(matches!(
            pin.digital_write(true),
            Err(Error::WrongMode { operation: "digital_write", .. })
        ));

        pin.set_mode(PinMode::Output).unwrap();
        pin.digital_write(true).unwrap();
        assert_eq!(pin.output_voltage(), VCC);
        assert_eq!(pin.source_behavior(), SourceBehavior::FixedVoltage(VCC));
        assert_eq!(pin.resistance(), OUTPUT_RESISTANCE);

        pin.digital_write(false).unwrap();
        assert_eq!(pin.source_behavior(), SourceBehavior::FixedVoltage(0.0));
    }

    #[test]
    fn test_pwm_average_voltage() {
        let mut pin = DriverPin::digital(9);
        pin.set_mode(PinMode::Output).unwrap();
        pin.analog_write(51).unwrap();
        assert!((pin.output_voltage() - 1.0).abs() < 1e-12);

        let mut plain = DriverPin::digital(7);
        plain.set_mode(PinMode::Output).unwrap();
        assert!(matches!(plain.analog_write(128), Err(Error::PwmUnsupported(_))));
    }

    #[test]
    fn test_mode_change_clears_output() {
        let mut pin = DriverPin::digital(13);
        pin.set_mode(PinMode::Output).unwrap();
        pin.digital_write(true).unwrap();
        pin.set_mode(PinMode::Input).unwrap();
        assert_eq!(pin.output_voltage(), 0.0);
        assert_eq!(pin.resistance(), INPUT_RESISTANCE);
        assert_eq!(pin.source_behavior(), SourceBehavior::Passive);
    }

    #[test]
    fn test_pullup_behavior() {
        let mut pin = DriverPin::digital(2);
        pin.set_mode(PinMode::InputPullup).unwrap();
        assert_eq!(
            pin.source_behavior(),
            SourceBehavior::PullUp {
                resistance: PULLUP_RESISTANCE,
                supply: VCC
            }
        );
        pin.update_state(4.9, 0.0);
        assert!(pin.digital_read().unwrap());
        pin.update_state(0.2, 0.0);
        assert!(!pin.digital_read().unwrap());
    }

    #[test]
    fn test_analog_pin() {
        let mut pin = DriverPin::analog(0);
        pin.set_mode(PinMode::AnalogInput).unwrap();
        pin.update_state(2.5, 0.0);
        assert_eq!(pin.analog_read().unwrap(), 511);
        pin.update_state(7.0, 0.0);
        assert_eq!(pin.analog_read().unwrap(), 1023);

        pin.set_mode(PinMode::AnalogOutput).unwrap();
        assert!(pin.analog_read().is_err());
        pin.analog_output(9.0).unwrap();
        assert_eq!(pin.output_voltage(), VCC);
    }

    #[test]
    fn test_overload_once_per_transition() {
        let mut pin = DriverPin::digital(13);
        pin.set_mode(PinMode::Output).unwrap();
        pin.digital_write(true).unwrap();

        assert!(pin.update_state(5.0, 0.05).overload_started);
        assert!(!pin.update_state(5.0, 0.06).overload_started);
        assert!(pin.is_overloaded());
        pin.update_state(5.0, 0.01);
        assert!(!pin.is_overloaded());
    }

    #[test]
    fn test_power_rails() {
        let mut five = DriverPin::power(PowerRail::Vcc5V);
        assert_eq!(five.name(), "5V");
        assert_eq!(five.resistance(), POWER_RAIL_RESISTANCE);
        assert_eq!(five.source_behavior(), SourceBehavior::FixedVoltage(5.0));
        assert!(five.set_mode(PinMode::Input).is_err());

        five.update_state(4.2, 0.01);
        assert_eq!(five.voltage(), 5.0);

        let gnd = DriverPin::power(PowerRail::Ground);
        assert_eq!(gnd.source_behavior(), SourceBehavior::Passive);
    }

    #[test]
    fn test_adc_conversion() {
        assert_eq!(voltage_to_adc(0.0), 0);
        assert_eq!(voltage_to_adc(-1.0), 0);
        assert_eq!(voltage_to_adc(5.0), 1023);
    }
}
