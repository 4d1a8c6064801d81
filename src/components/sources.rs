//! Voltage and current sources, supply rails, and the ground reference.

use crate::circuit::GROUND;
use crate::components::{Device, Pins};
use crate::solver::Stamper;

/// Default source voltage in volts.
pub const DEFAULT_VOLTAGE: f64 = 5.0;

/// An ideal two-lead voltage source.
///
/// Lead 0 is the negative terminal, lead 1 the positive. Forces
/// V[1] - V[0] = volts and costs one branch-current unknown. The reported
/// current is positive when flowing out of the positive terminal into the
/// external circuit.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pins: Pins,
    volts: f64,
}

impl Default for VoltageSource {
    fn default() -> Self {
        Self::new(DEFAULT_VOLTAGE)
    }
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(volts: f64) -> Self {
        Self {
            pins: Pins::with_leads(2),
            volts,
        }
    }

    /// Source voltage in volts.
    pub fn volts(&self) -> f64 {
        self.volts
    }

    /// Set the source voltage.
    pub fn set_voltage(&mut self, volts: f64) {
        self.volts = volts;
    }
}

impl Device for VoltageSource {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        sim.stamp_voltage_source(self.pins.node(1), self.pins.node(0), self.pins.vs(0), self.volts);
    }

    fn compute_current(&mut self) {
        // The branch unknown is the current into the positive node.
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }

    fn voltage_delta(&self) -> f64 {
        self.pins.volt(1) - self.pins.volt(0)
    }
}

/// A single-lead supply rail: forces its lead to a fixed voltage above
/// ground. The implicit return path through ground makes source loops
/// unnecessary for simple circuits.
#[derive(Debug, Clone)]
pub struct Rail {
    pins: Pins,
    volts: f64,
}

impl Default for Rail {
    fn default() -> Self {
        Self::new(DEFAULT_VOLTAGE)
    }
}

impl Rail {
    /// Create a new supply rail.
    pub fn new(volts: f64) -> Self {
        Self {
            pins: Pins::with_leads(1),
            volts,
        }
    }

    /// Rail voltage in volts.
    pub fn volts(&self) -> f64 {
        self.volts
    }

    /// Set the rail voltage.
    pub fn set_voltage(&mut self, volts: f64) {
        self.volts = volts;
    }
}

impl Device for Rail {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn has_ground_connection(&self) -> bool {
        true
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        sim.stamp_voltage_source(self.pins.node(0), GROUND, self.pins.vs(0), self.volts);
    }

    fn compute_current(&mut self) {
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }
}

/// The ground reference: forces its lead to 0V. The reported current is
/// positive when flowing into the ground from the circuit.
#[derive(Debug, Clone, Default)]
pub struct Ground {
    pins: Pins,
}

impl Ground {
    /// Create a new ground reference.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(1),
        }
    }
}

impl Device for Ground {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn has_ground_connection(&self) -> bool {
        true
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        sim.stamp_voltage_source(self.pins.node(0), GROUND, self.pins.vs(0), 0.0);
    }

    fn compute_current(&mut self) {
        let amps = self.pins.vs_current(0);
        self.pins.set_current(amps);
    }
}

/// A square-wave clock rail: forces its single lead to 5V for the first
/// half of each period and 0V for the second, referenced to ground.
///
/// The level is sampled from the simulated time at the start of each tick,
/// so a fresh circuit starts high.
#[derive(Debug, Clone)]
pub struct ClockInput {
    pins: Pins,
    hertz: f64,
    high_volts: f64,
    duty: f64,
}

impl Default for ClockInput {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl ClockInput {
    /// Create a clock at the given frequency, 5V high level, 50% duty.
    pub fn new(hertz: f64) -> Self {
        Self {
            pins: Pins::with_leads(1),
            hertz,
            high_volts: DEFAULT_VOLTAGE,
            duty: 0.5,
        }
    }

    /// Clock frequency in hertz.
    pub fn hertz(&self) -> f64 {
        self.hertz
    }

    /// Set the clock frequency.
    pub fn set_frequency(&mut self, hertz: f64) {
        self.hertz = hertz;
    }

    /// Fraction of each period spent high. Clamped to [0, 1].
    pub fn set_duty(&mut self, duty: f64) {
        self.duty = duty.clamp(0.0, 1.0);
    }

    /// Output level at a given simulated time.
    pub fn level_at(&self, time: f64) -> f64 {
        let phase = (self.hertz * time).rem_euclid(1.0);
        if phase < self.duty {
            self.high_volts
        } else {
            0.0
        }
    }
}

impl Device for ClockInput {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn has_ground_connection(&self) -> bool {
        true
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        let level = self.level_at(sim.time());
        sim.stamp_voltage_source(self.pins.node(0), GROUND, self.pins.vs(0), level);
    }

    fn compute_current(&mut self) {
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }
}

/// An ideal two-lead current source driving a constant current out of
/// lead 1 into the external circuit and back into lead 0.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pins: Pins,
    amps: f64,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(amps: f64) -> Self {
        Self {
            pins: Pins::with_leads(2),
            amps,
        }
    }

    /// Source current in amperes.
    pub fn amps(&self) -> f64 {
        self.amps
    }

    /// Set the source current.
    pub fn set_current_value(&mut self, amps: f64) {
        self.amps = amps;
    }
}

impl Device for CurrentSource {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        sim.stamp_current_source(self.pins.node(0), self.pins.node(1), self.amps);
    }

    fn compute_current(&mut self) {
        self.pins.set_current(self.amps);
    }
}
