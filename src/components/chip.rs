//! Latched digital blocks.

use crate::circuit::GROUND;
use crate::components::logic::{HIGH_VOLTAGE, LOGIC_THRESHOLD};
use crate::components::{Device, Pins};
use crate::solver::Stamper;

/// A 4-to-1 multiplexer.
///
/// Leads 0-3 are the data inputs, leads 4-5 the select lines (lead 4 is the
/// low bit), lead 6 the output. Unlike a [`LogicGate`](super::LogicGate),
/// the output is latched once per tick from the previous tick's settled
/// levels, so a change on the inputs appears on the output one tick later.
#[derive(Debug, Clone, Default)]
pub struct Multiplexer {
    pins: Pins,
    out_high: bool,
}

impl Multiplexer {
    const INPUTS: usize = 4;
    const SELECT_LOW: usize = 4;
    const SELECT_HIGH: usize = 5;
    const OUTPUT: usize = 6;

    /// Create a new multiplexer.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(7),
            out_high: false,
        }
    }

    /// Lead index of the output.
    pub fn output_lead(&self) -> usize {
        Self::OUTPUT
    }

    /// Whether the latched output is high.
    pub fn output_is_high(&self) -> bool {
        self.out_high
    }

    fn read(&self, lead: usize) -> bool {
        self.pins.volt(lead) > LOGIC_THRESHOLD
    }
}

impl Device for Multiplexer {
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

    fn execute(&mut self) {
        let mut selected = 0;
        if self.read(Self::SELECT_LOW) {
            selected += 1;
        }
        if self.read(Self::SELECT_HIGH) {
            selected += 2;
        }
        debug_assert!(selected < Self::INPUTS);
        self.out_high = self.read(selected);
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        let volts = if self.out_high { HIGH_VOLTAGE } else { 0.0 };
        sim.stamp_voltage_source(
            self.pins.node(Self::OUTPUT),
            GROUND,
            self.pins.vs(0),
            volts,
        );
    }

    fn compute_current(&mut self) {
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.out_high = false;
    }
}
