//! Canned circuits driven from the command line.

use anyhow::{Result, bail};
use breadboard_core::Circuit;
use breadboard_devices::{Device, DriverPin, Led, LedColor, PinMode, Resistor, pin::VCC};

/// Digital pin 13 -> LED -> resistor -> GND.
pub fn led_loop(color: LedColor, resistance: f64, high: bool) -> Result<Circuit<Device>> {
    let mut circuit = Circuit::new();

    let mut pin = DriverPin::digital(13);
    pin.set_mode(PinMode::Output)?;
    pin.digital_write(high)?;

    let pin = circuit.attach_external(pin.into());
    let led = circuit.add_component(Led::new(color).into());
    let resistor = circuit.add_component(Resistor::named("R1", resistance)?.into());

    circuit.connect_components(pin, 0, led, Led::ANODE)?;
    circuit.connect_components(led, Led::CATHODE, resistor, 0)?;
    let ground = circuit.ground();
    circuit.connect_to_node(resistor, 1, ground)?;
    Ok(circuit)
}

/// Analog pin A0 held at `voltage`. Pins can only drive 0..=5 V.
fn analog_source(voltage: f64) -> Result<Device> {
    if !(0.0..=VCC).contains(&voltage) {
        bail!("source voltage {} V is outside 0..={} V", voltage, VCC);
    }
    let mut pin = DriverPin::analog(0);
    pin.set_mode(PinMode::AnalogOutput)?;
    pin.analog_output(voltage)?;
    Ok(pin.into())
}

/// A0 -> resistor -> GND.
pub fn single_resistor(voltage: f64, resistance: f64) -> Result<Circuit<Device>> {
    let mut circuit = Circuit::new();
    let source = circuit.attach_external(analog_source(voltage)?);
    let resistor = circuit.add_component(Resistor::named("R1", resistance)?.into());

    circuit.connect_components(source, 0, resistor, 0)?;
    let ground = circuit.ground();
    circuit.connect_to_node(resistor, 1, ground)?;
    Ok(circuit)
}

/// A0 -> R1 -> OUT -> R2 -> GND.
pub fn divider(voltage: f64, r1: f64, r2: f64) -> Result<Circuit<Device>> {
    let mut circuit = Circuit::new();
    let source = circuit.attach_external(analog_source(voltage)?);
    let top = circuit.add_component(Resistor::named("R1", r1)?.into());
    let bottom = circuit.add_component(Resistor::named("R2", r2)?.into());

    let out = circuit.find_or_create_node("OUT");
    circuit.connect_components(source, 0, top, 0)?;
    circuit.connect_to_node(top, 1, out)?;
    circuit.connect_to_node(bottom, 0, out)?;
    let ground = circuit.ground();
    circuit.connect_to_node(bottom, 1, ground)?;
    Ok(circuit)
}
