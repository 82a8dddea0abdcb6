//! The closed set of circuit elements.

use breadboard_core::{Electrical, SourceBehavior, StateUpdate};

use crate::led::Led;
use crate::pin::DriverPin;
use crate::resistor::Resistor;
use crate::sense::SensePin;
use crate::wire::Wire;

/// Any element that can be placed in a `Circuit<Device>`.
#[derive(Debug, Clone)]
pub enum Device {
    Resistor(Resistor),
    Wire(Wire),
    Led(Led),
    DriverPin(DriverPin),
    SensePin(SensePin),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Device::Resistor($inner) => $body,
            Device::Wire($inner) => $body,
            Device::Led($inner) => $body,
            Device::DriverPin($inner) => $body,
            Device::SensePin($inner) => $body,
        }
    };
}

impl Device {
    /// Short variant name for listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Device::Resistor(_) => "resistor",
            Device::Wire(_) => "wire",
            Device::Led(_) => "led",
            Device::DriverPin(_) => "pin",
            Device::SensePin(_) => "probe",
        }
    }

    pub fn as_resistor(&self) -> Option<&Resistor> {
        match self {
            Device::Resistor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resistor_mut(&mut self) -> Option<&mut Resistor> {
        match self {
            Device::Resistor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> Option<&Wire> {
        match self {
            Device::Wire(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_led(&self) -> Option<&Led> {
        match self {
            Device::Led(led) => Some(led),
            _ => None,
        }
    }

    pub fn as_led_mut(&mut self) -> Option<&mut Led> {
        match self {
            Device::Led(led) => Some(led),
            _ => None,
        }
    }

    pub fn as_driver_pin(&self) -> Option<&DriverPin> {
        match self {
            Device::DriverPin(pin) => Some(pin),
            _ => None,
        }
    }

    pub fn as_driver_pin_mut(&mut self) -> Option<&mut DriverPin> {
        match self {
            Device::DriverPin(pin) => Some(pin),
            _ => None,
        }
    }

    pub fn as_sense_pin(&self) -> Option<&SensePin> {
        match self {
            Device::SensePin(probe) => Some(probe),
            _ => None,
        }
    }

    /// Overload flag for elements that have one.
    pub fn is_overloaded(&self) -> bool {
        match self {
            Device::Led(led) => led.is_overloaded(),
            Device::DriverPin(pin) => pin.is_overloaded(),
            _ => false,
        }
    }
}

impl Electrical for Device {
    fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    fn terminal_count(&self) -> usize {
        dispatch!(self, d => d.terminal_count())
    }

    fn resistance(&self) -> f64 {
        dispatch!(self, d => d.resistance())
    }

    fn voltage(&self) -> f64 {
        dispatch!(self, d => d.voltage())
    }

    fn current(&self) -> f64 {
        dispatch!(self, d => d.current())
    }

    fn update_state(&mut self, voltage: f64, current: f64) -> StateUpdate {
        dispatch!(self, d => d.update_state(voltage, current))
    }

    fn reset(&mut self) {
        dispatch!(self, d => d.reset())
    }

    fn source_behavior(&self) -> SourceBehavior {
        dispatch!(self, d => d.source_behavior())
    }
}

impl From<Resistor> for Device {
    fn from(r: Resistor) -> Self {
        Device::Resistor(r)
    }
}

impl From<Wire> for Device {
    fn from(w: Wire) -> Self {
        Device::Wire(w)
    }
}

impl From<Led> for Device {
    fn from(led: Led) -> Self {
        Device::Led(led)
    }
}

impl From<DriverPin> for Device {
    fn from(pin: DriverPin) -> Self {
        Device::DriverPin(pin)
    }
}

impl From<SensePin> for Device {
    fn from(probe: SensePin) -> Self {
        Device::SensePin(probe)
    }
}
