//! Digital logic: input/output pins and multi-input gates.
//!
//! Logic devices live on the same analog solver as everything else. An
//! input forces its lead to a rail level through a voltage-source row; a
//! gate reads its input leads against the threshold each iteration and
//! drives its output row to the matching level, voting against convergence
//! until the output voltage agrees with the computed function.

use crate::circuit::GROUND;
use crate::components::{Device, Pins};
use crate::solver::{Stamper, VOLTAGE_TOLERANCE};

/// Voltage of a logic high level.
pub const HIGH_VOLTAGE: f64 = 5.0;

/// Threshold above which a lead voltage reads as logic high.
pub const LOGIC_THRESHOLD: f64 = 2.5;

/// A single-lead logic input: forces its lead to the high level or 0V.
#[derive(Debug, Clone)]
pub struct LogicInput {
    pins: Pins,
    high: bool,
}

impl Default for LogicInput {
    fn default() -> Self {
        Self::low()
    }
}

impl LogicInput {
    /// Create an input driving logic high.
    pub fn high() -> Self {
        Self {
            pins: Pins::with_leads(1),
            high: true,
        }
    }

    /// Create an input driving logic low.
    pub fn low() -> Self {
        Self {
            pins: Pins::with_leads(1),
            high: false,
        }
    }

    /// Whether the input drives high.
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Set the driven level.
    pub fn set_high(&mut self, high: bool) {
        self.high = high;
    }

    /// Flip the driven level.
    pub fn toggle(&mut self) {
        self.high = !self.high;
    }
}

impl Device for LogicInput {
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
        let volts = if self.high { HIGH_VOLTAGE } else { 0.0 };
        sim.stamp_voltage_source(self.pins.node(0), GROUND, self.pins.vs(0), volts);
    }

    fn compute_current(&mut self) {
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }
}

/// A single-lead logic output: a passive pin that reads its lead against
/// the threshold.
#[derive(Debug, Clone, Default)]
pub struct LogicOutput {
    pins: Pins,
}

impl LogicOutput {
    /// Create a new logic output.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(1),
        }
    }

    /// Whether the lead reads as logic high.
    pub fn is_high(&self) -> bool {
        self.pins.volt(0) > LOGIC_THRESHOLD
    }
}

impl Device for LogicOutput {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }
}

/// The boolean function a [`LogicGate`] computes over its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Inverter,
}

impl GateKind {
    /// Evaluate the function over the input levels.
    pub fn eval(&self, inputs: &[bool]) -> bool {
        match self {
            GateKind::And => inputs.iter().all(|&b| b),
            GateKind::Or => inputs.iter().any(|&b| b),
            GateKind::Nand => !inputs.iter().all(|&b| b),
            GateKind::Nor => !inputs.iter().any(|&b| b),
            GateKind::Xor => inputs.iter().fold(false, |acc, &b| acc ^ b),
            GateKind::Inverter => !inputs[0],
        }
    }
}

/// A logic gate with `n` input leads (0..n) and one output lead (n).
///
/// The output is driven through a voltage-source row whose target is
/// recomputed every relaxation iteration from the input levels, so gate
/// chains settle within a single tick.
#[derive(Debug, Clone)]
pub struct LogicGate {
    pins: Pins,
    kind: GateKind,
    input_count: usize,
    /// Output level carried between iterations and into the next tick's stamp
    out_volts: f64,
}

impl LogicGate {
    fn with_kind(kind: GateKind, input_count: usize) -> Self {
        let input_count = input_count.max(1);
        Self {
            pins: Pins::with_leads(input_count + 1),
            kind,
            input_count,
            out_volts: 0.0,
        }
    }

    /// An AND gate with `inputs` input leads.
    pub fn and(inputs: usize) -> Self {
        Self::with_kind(GateKind::And, inputs)
    }

    /// An OR gate with `inputs` input leads.
    pub fn or(inputs: usize) -> Self {
        Self::with_kind(GateKind::Or, inputs)
    }

    /// A NAND gate with `inputs` input leads.
    pub fn nand(inputs: usize) -> Self {
        Self::with_kind(GateKind::Nand, inputs)
    }

    /// A NOR gate with `inputs` input leads.
    pub fn nor(inputs: usize) -> Self {
        Self::with_kind(GateKind::Nor, inputs)
    }

    /// An XOR (odd parity) gate with `inputs` input leads.
    pub fn xor(inputs: usize) -> Self {
        Self::with_kind(GateKind::Xor, inputs)
    }

    /// A single-input inverter.
    pub fn inverter() -> Self {
        Self::with_kind(GateKind::Inverter, 1)
    }

    /// The gate's function.
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Lead index of the output.
    pub fn output_lead(&self) -> usize {
        self.input_count
    }

    /// Whether the output currently drives high.
    pub fn output_is_high(&self) -> bool {
        self.out_volts > LOGIC_THRESHOLD
    }

    fn read_inputs(&self) -> Vec<bool> {
        (0..self.input_count)
            .map(|i| self.pins.volt(i) > LOGIC_THRESHOLD)
            .collect()
    }
}

impl Device for LogicGate {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn is_nonlinear(&self) -> bool {
        true
    }

    fn has_ground_connection(&self) -> bool {
        true
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        let out = self.pins.node(self.input_count);
        sim.stamp_voltage_source(out, GROUND, self.pins.vs(0), self.out_volts);
    }

    fn step(&mut self, sim: &mut Stamper<'_>) {
        let f = self.kind.eval(&self.read_inputs());
        let target = if f { HIGH_VOLTAGE } else { 0.0 };
        if (self.pins.volt(self.input_count) - target).abs() > VOLTAGE_TOLERANCE {
            sim.clear_converged();
        }
        self.out_volts = target;
        sim.update_voltage_source(self.pins.vs(0), target);
    }

    fn compute_current(&mut self) {
        let amps = -self.pins.vs_current(0);
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.out_volts = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, Handle};

    fn gate_under_test(
        gate: LogicGate,
    ) -> (
        Circuit,
        Vec<Handle<LogicInput>>,
        Handle<LogicGate>,
        Handle<LogicOutput>,
    ) {
        let inputs = gate.input_count;
        let mut sim = Circuit::new();
        let g = sim.add(gate);
        let ins: Vec<_> = (0..inputs).map(|_| sim.add(LogicInput::low())).collect();
        let out = sim.add(LogicOutput::new());
        for (i, input) in ins.iter().enumerate() {
            sim.connect(input.lead(0), g.lead(i)).unwrap();
        }
        sim.connect(g.lead(inputs), out.lead(0)).unwrap();
        (sim, ins, g, out)
    }

    fn check_truth_table(gate: LogicGate, expected: &[(bool, bool, bool)]) {
        let (mut sim, ins, _g, out) = gate_under_test(gate);
        for &(a, b, want) in expected {
            sim.get_mut(&ins[0]).set_high(a);
            sim.get_mut(&ins[1]).set_high(b);
            sim.ticks(100).unwrap();
            assert!(sim.converged());
            assert_eq!(
                sim.get(&out).is_high(),
                want,
                "inputs ({a}, {b}) gave the wrong level"
            );
        }
    }

    #[test]
    fn and_gate_truth_table() {
        check_truth_table(
            LogicGate::and(2),
            &[
                (false, false, false),
                (true, false, false),
                (false, true, false),
                (true, true, true),
            ],
        );
    }

    #[test]
    fn or_gate_truth_table() {
        check_truth_table(
            LogicGate::or(2),
            &[
                (false, false, false),
                (true, false, true),
                (false, true, true),
                (true, true, true),
            ],
        );
    }

    #[test]
    fn nand_gate_truth_table() {
        check_truth_table(
            LogicGate::nand(2),
            &[
                (false, false, true),
                (true, false, true),
                (false, true, true),
                (true, true, false),
            ],
        );
    }

    #[test]
    fn nor_gate_truth_table() {
        check_truth_table(
            LogicGate::nor(2),
            &[
                (false, false, true),
                (true, false, false),
                (false, true, false),
                (true, true, false),
            ],
        );
    }

    #[test]
    fn xor_gate_truth_table() {
        check_truth_table(
            LogicGate::xor(2),
            &[
                (false, false, false),
                (true, false, true),
                (false, true, true),
                (true, true, false),
            ],
        );
    }

    #[test]
    fn inverter_flips_its_input() {
        let (mut sim, ins, _g, out) = gate_under_test(LogicGate::inverter());
        sim.ticks(100).unwrap();
        assert!(sim.get(&out).is_high());

        sim.get_mut(&ins[0]).set_high(true);
        sim.ticks(100).unwrap();
        assert!(!sim.get(&out).is_high());
    }

    #[test]
    fn gate_chain_settles_in_one_tick() {
        // input -> inverter -> inverter -> output
        let mut sim = Circuit::new();
        let input = sim.add(LogicInput::high());
        let g0 = sim.add(LogicGate::inverter());
        let g1 = sim.add(LogicGate::inverter());
        let out = sim.add(LogicOutput::new());
        sim.connect(input.lead(0), g0.lead(0)).unwrap();
        sim.connect(g0.lead(1), g1.lead(0)).unwrap();
        sim.connect(g1.lead(1), out.lead(0)).unwrap();

        sim.tick().unwrap();
        assert!(sim.converged());
        assert!(sim.get(&out).is_high());
    }

    #[test]
    fn xor_parity_over_three_inputs() {
        assert!(!GateKind::Xor.eval(&[false, false, false]));
        assert!(GateKind::Xor.eval(&[true, false, false]));
        assert!(!GateKind::Xor.eval(&[true, true, false]));
        assert!(GateKind::Xor.eval(&[true, true, true]));
    }
}
