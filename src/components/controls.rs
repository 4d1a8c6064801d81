//! Topology devices: wires, switches, and probes.

use crate::components::{Device, Pins};
use crate::solver::Stamper;

/// An ideal wire: its two leads are unified into a single node at analysis
/// time, so it stamps nothing and its reported current stays exactly 0.
///
/// The zero is a limitation, not a measurement: a unified wire has no
/// branch unknown, so [`Device::current`] reads 0 even when real current
/// flows through it (an unbalanced bridge arm, for instance). To observe
/// the branch current, use a closed [`Switch`] in its place; its 0V
/// voltage-source row carries the current explicitly.
#[derive(Debug, Clone, Default)]
pub struct Wire {
    pins: Pins,
}

impl Wire {
    /// Create a new wire.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(2),
        }
    }
}

impl Device for Wire {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn is_wire(&self) -> bool {
        true
    }
}

/// A single-pole single-throw switch.
///
/// Open, it stamps nothing and its leads stay separate nodes. Closed, it
/// forces 0V across its leads through a voltage-source row, which keeps the
/// branch current observable. Toggling takes effect on the next tick, since
/// the equation count changes with the state.
#[derive(Debug, Clone)]
pub struct Switch {
    pins: Pins,
    open: bool,
}

impl Default for Switch {
    fn default() -> Self {
        Self::open()
    }
}

impl Switch {
    /// Create an open switch.
    pub fn open() -> Self {
        Self {
            pins: Pins::with_leads(2),
            open: true,
        }
    }

    /// Create a closed switch.
    pub fn closed() -> Self {
        Self {
            pins: Pins::with_leads(2),
            open: false,
        }
    }

    /// Whether the switch is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Set the switch state.
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Flip the switch state.
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }
}

impl Device for Switch {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        if self.open {
            0
        } else {
            1
        }
    }

    fn is_wire(&self) -> bool {
        true
    }

    fn leads_are_connected(&self, _a: usize, _b: usize) -> bool {
        !self.open
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        if !self.open {
            sim.stamp_voltage_source(self.pins.node(0), self.pins.node(1), self.pins.vs(0), 0.0);
        }
    }

    fn compute_current(&mut self) {
        let amps = if self.open {
            0.0
        } else {
            // Positive from lead 0 to lead 1.
            self.pins.vs_current(0)
        };
        self.pins.set_current(amps);
    }
}

/// A single-lead voltmeter: stamps nothing and draws no current. Read the
/// node voltage through [`Device::voltage_delta`] or a registered observer.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pins: Pins,
}

impl Probe {
    /// Create a new probe.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(1),
        }
    }

    /// Voltage at the probed node.
    pub fn volts(&self) -> f64 {
        self.pins.volt(0)
    }
}

impl Device for Probe {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::components::{Ground, Rail, Resistor};
    use approx::assert_abs_diff_eq;

    #[test]
    fn wire_joins_and_carries_no_reported_current() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let wire = sim.add(Wire::new());
        let r = sim.add(Resistor::new(100.0));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), wire.lead(0)).unwrap();
        sim.connect(wire.lead(1), r.lead(0)).unwrap();
        sim.connect(r.lead(1), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_abs_diff_eq!(sim.get(&r).current(), 0.05, epsilon = 1e-9);
        assert_eq!(sim.get(&wire).current(), 0.0);
        assert_abs_diff_eq!(sim.get(&wire).voltage_delta(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn unbalanced_bridge_wire_reads_zero_but_switch_measures() {
        // 5V bridge: 200/400 upper arms, 100/100 lower arms. The bridge
        // branch carries 5/1100 A left-to-right. A unified wire still
        // reports 0; swapping in a closed switch exposes the current.
        fn bridge(sim: &mut Circuit, a: crate::Lead, b: crate::Lead) {
            let rail = sim.add(Rail::new(5.0));
            let r1 = sim.add(Resistor::new(200.0));
            let r2 = sim.add(Resistor::new(400.0));
            let r3 = sim.add(Resistor::new(100.0));
            let r4 = sim.add(Resistor::new(100.0));
            let gnd = sim.add(Ground::new());
            sim.connect(rail.lead(0), r1.lead(0)).unwrap();
            sim.connect(rail.lead(0), r2.lead(0)).unwrap();
            sim.connect(r1.lead(1), r3.lead(0)).unwrap();
            sim.connect(r2.lead(1), r4.lead(0)).unwrap();
            sim.connect(r3.lead(1), gnd.lead(0)).unwrap();
            sim.connect(r4.lead(1), gnd.lead(0)).unwrap();
            sim.connect(r1.lead(1), a).unwrap();
            sim.connect(r2.lead(1), b).unwrap();
            sim.tick().unwrap();
        }

        let mut sim = Circuit::new();
        let wire = sim.add(Wire::new());
        bridge(&mut sim, wire.lead(0), wire.lead(1));
        assert_eq!(sim.get(&wire).current(), 0.0);
        // Both sides sit at the same potential, yet the branch is live.
        assert_abs_diff_eq!(sim.get(&wire).voltage_delta(), 0.0, epsilon = 1e-12);

        let mut sim = Circuit::new();
        let sw = sim.add(Switch::closed());
        bridge(&mut sim, sw.lead(0), sw.lead(1));
        assert_abs_diff_eq!(sim.get(&sw).current(), 5.0 / 1100.0, epsilon = 1e-9);
    }

    #[test]
    fn closed_switch_reports_branch_current() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let sw = sim.add(Switch::closed());
        let r = sim.add(Resistor::new(100.0));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), sw.lead(0)).unwrap();
        sim.connect(sw.lead(1), r.lead(0)).unwrap();
        sim.connect(r.lead(1), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_abs_diff_eq!(sim.get(&sw).current(), 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(sim.get(&sw).voltage_delta(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn open_switch_breaks_the_loop() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let sw = sim.add(Switch::open());
        let r = sim.add(Resistor::new(100.0));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), sw.lead(0)).unwrap();
        sim.connect(sw.lead(1), r.lead(0)).unwrap();
        sim.connect(r.lead(1), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_abs_diff_eq!(sim.get(&r).current(), 0.0, epsilon = 1e-12);
        assert_eq!(sim.get(&sw).current(), 0.0);
        // The full rail voltage appears across the open contacts.
        assert_abs_diff_eq!(sim.get(&sw).voltage_delta(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn probe_reads_node_voltage() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let r0 = sim.add(Resistor::new(100.0));
        let r1 = sim.add(Resistor::new(100.0));
        let probe = sim.add(Probe::new());
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r0.lead(0)).unwrap();
        sim.connect(r0.lead(1), r1.lead(0)).unwrap();
        sim.connect(r0.lead(1), probe.lead(0)).unwrap();
        sim.connect(r1.lead(1), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_abs_diff_eq!(sim.get(&probe).volts(), 2.5, epsilon = 1e-9);
        assert_eq!(sim.get(&probe).current(), 0.0);
    }
}
