//! Wires: ideal by default, optionally with a resistance derived from
//! length and AWG gauge.

use std::f64::consts::PI;

use breadboard_core::{Electrical, MIN_RESISTANCE, StateUpdate};

use crate::error::{Error, Result};

/// Resistance reported by an ideal wire (Ohm).
pub const IDEAL_RESISTANCE: f64 = MIN_RESISTANCE;
/// Resistivity of copper at room temperature (Ohm m).
pub const COPPER_RESISTIVITY: f64 = 1.68e-8;
/// Common breadboard jumper gauge.
pub const DEFAULT_GAUGE: u32 = 22;

/// A routing point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Conductor diameter in millimetres for an AWG gauge.
pub fn awg_diameter_mm(gauge: u32) -> f64 {
    0.127 * 92f64.powf((36.0 - f64::from(gauge)) / 39.0)
}

#[derive(Debug, Clone)]
pub struct Wire {
    name: String,
    points: Vec<Point>,
    /// Path length in metres.
    length: f64,
    gauge: u32,
    use_calculated_resistance: bool,
    voltage: f64,
    current: f64,
}

impl Default for Wire {
    fn default() -> Self {
        Self::new()
    }
}

impl Wire {
    /// An ideal 22 AWG wire with no routing points.
    pub fn new() -> Self {
        Self {
            name: "Wire".to_string(),
            points: Vec::new(),
            length: 0.0,
            gauge: DEFAULT_GAUGE,
            use_calculated_resistance: false,
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// Ideal straight jumper between two points.
    pub fn jumper(start: Point, end: Point) -> Self {
        let mut wire = Self::new();
        wire.name = "Jumper Wire".to_string();
        wire.set_points(vec![start, end]);
        wire
    }

    /// Ideal wire following a breadboard route.
    pub fn breadboard(points: Vec<Point>) -> Self {
        let mut wire = Self::new();
        wire.name = "Breadboard Wire".to_string();
        wire.set_points(points);
        wire
    }

    /// Wire whose resistance is computed from its route and gauge.
    pub fn real(points: Vec<Point>, gauge: u32) -> Result<Self> {
        let mut wire = Self::new();
        wire.set_gauge(gauge)?;
        wire.name = format!("Wire ({} AWG)", gauge);
        wire.set_points(points);
        wire.use_calculated_resistance = true;
        Ok(wire)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
        self.recompute_length();
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.recompute_length();
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
        self.length = 0.0;
    }

    /// Total path length in metres.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn gauge(&self) -> u32 {
        self.gauge
    }

    /// Set the AWG gauge (1..=50).
    pub fn set_gauge(&mut self, gauge: u32) -> Result<()> {
        if !(1..=50).contains(&gauge) {
            log::warn!("invalid wire gauge {}", gauge);
            return Err(Error::InvalidValue {
                name: "wire gauge",
                value: f64::from(gauge),
            });
        }
        self.gauge = gauge;
        Ok(())
    }

    pub fn uses_calculated_resistance(&self) -> bool {
        self.use_calculated_resistance
    }

    pub fn set_use_calculated_resistance(&mut self, enabled: bool) {
        self.use_calculated_resistance = enabled;
    }

    /// R = rho L / A for the current route and gauge, floored at the ideal value.
    pub fn calculated_resistance(&self) -> f64 {
        if self.length <= 0.0 {
            return IDEAL_RESISTANCE;
        }
        let radius = awg_diameter_mm(self.gauge) * 1e-3 / 2.0;
        let area = PI * radius * radius;
        (COPPER_RESISTIVITY * self.length / area).max(IDEAL_RESISTANCE)
    }

    fn recompute_length(&mut self) {
        let mm: f64 = self
            .points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum();
        self.length = mm * 1e-3;
    }
}

impl Electrical for Wire {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        2
    }

    fn resistance(&self) -> f64 {
        if self.use_calculated_resistance {
            self.calculated_resistance()
        } else {
            IDEAL_RESISTANCE
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_by_default() {
        let wire = Wire::jumper(Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        assert!((wire.length() - 0.05).abs() < 1e-12);
        assert_eq!(wire.resistance(), IDEAL_RESISTANCE);
        assert_eq!(wire.gauge(), DEFAULT_GAUGE);
    }

    #[test]
    fn test_awg_diameter() {
        // 22 AWG is about 0.644 mm, 36 AWG is 0.127 mm by definition.
        assert!((awg_diameter_mm(22) - 0.644).abs() < 0.002);
        assert!((awg_diameter_mm(36) - 0.127).abs() < 1e-12);
    }

    #[test]
    fn test_real_wire_resistance() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(500.0, 0.0),
            Point::new(500.0, 500.0),
        ];
        let wire = Wire::real(points, 22).unwrap();
        assert!((wire.length() - 1.0).abs() < 1e-12);

        // 22 AWG copper: ~0.0516 Ohm/m
        let r = wire.resistance();
        assert!((r - 0.0516).abs() < 0.001, "expected ~0.0516 Ohm, got {}", r);
    }

    #[test]
    fn test_gauge_range() {
        let mut wire = Wire::new();
        assert!(wire.set_gauge(0).is_err());
        assert!(wire.set_gauge(51).is_err());
        assert_eq!(wire.gauge(), DEFAULT_GAUGE);
        assert!(Wire::real(Vec::new(), 60).is_err());
    }

    #[test]
    fn test_short_route_floors_resistance() {
        let mut wire = Wire::breadboard(vec![Point::new(0.0, 0.0)]);
        wire.set_use_calculated_resistance(true);
        assert_eq!(wire.length(), 0.0);
        assert_eq!(wire.resistance(), IDEAL_RESISTANCE);
    }
}
