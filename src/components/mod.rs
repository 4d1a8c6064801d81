//! Device models and the device contract.
//!
//! The [`Device`] trait is the capability set the simulation core consumes:
//! stamping, per-tick stepping, convergence hints, and current readback.
//! Everything else in this module is the bundled device library:
//! - Linear: [`Resistor`], [`Potentiometer`], [`Capacitor`], [`Inductor`]
//! - Sources: [`VoltageSource`], [`Rail`], [`Ground`], [`CurrentSource`],
//!   [`ClockInput`]
//! - Topology: [`Wire`], [`Switch`], [`Probe`]
//! - Nonlinear: [`Diode`], [`TunnelDiode`], [`Triode`]
//! - Digital: [`LogicInput`], [`LogicOutput`], [`LogicGate`], [`Multiplexer`]
//!
//! New device kinds plug in by implementing [`Device`]; the core never
//! enumerates concrete types.

mod chip;
mod controls;
mod diode;
mod linear;
mod logic;
mod sources;
mod triode;

pub use chip::Multiplexer;
pub use controls::{Probe, Switch, Wire};
pub use diode::{Diode, DiodeParams, TunnelDiode};
pub use linear::{Capacitor, Inductor, Potentiometer, Resistor, DEFAULT_RESISTANCE};
pub use logic::{GateKind, LogicGate, LogicInput, LogicOutput, HIGH_VOLTAGE, LOGIC_THRESHOLD};
pub use sources::{ClockInput, CurrentSource, Ground, Rail, VoltageSource, DEFAULT_VOLTAGE};
pub use triode::Triode;

use std::any::Any;
use std::fmt;

use crate::solver::Stamper;

/// Per-device state managed by the circuit: resolved node indices, the most
/// recent solved lead voltages, allocated voltage-source rows and their
/// branch currents, and the device's reportable current.
///
/// Every device embeds one `Pins` block and exposes it through
/// [`Device::pins`]/[`Device::pins_mut`]; the core writes into it at analysis
/// and solve time, devices read from it while stamping.
#[derive(Debug, Clone, Default)]
pub struct Pins {
    node: Vec<usize>,
    volt: Vec<f64>,
    vsrc: Vec<usize>,
    vs_current: Vec<f64>,
    current: f64,
}

impl Pins {
    /// Create pin state for a device with the given lead count.
    pub fn with_leads(leads: usize) -> Self {
        Self {
            node: vec![crate::circuit::GROUND; leads],
            volt: vec![0.0; leads],
            vsrc: Vec::new(),
            vs_current: Vec::new(),
            current: 0.0,
        }
    }

    /// Number of leads.
    pub fn lead_count(&self) -> usize {
        self.node.len()
    }

    /// Resolved node index of a lead (0 is ground).
    pub fn node(&self, lead: usize) -> usize {
        self.node[lead]
    }

    pub(crate) fn set_node(&mut self, lead: usize, node: usize) {
        self.node[lead] = node;
    }

    /// Most recently solved voltage at a lead.
    pub fn volt(&self, lead: usize) -> f64 {
        self.volt[lead]
    }

    pub(crate) fn set_volt(&mut self, lead: usize, volts: f64) {
        self.volt[lead] = volts;
    }

    /// Number of voltage-source rows allocated to this device.
    pub fn source_count(&self) -> usize {
        self.vsrc.len()
    }

    /// The k-th voltage-source row allocated to this device.
    pub fn vs(&self, k: usize) -> usize {
        self.vsrc[k]
    }

    /// Branch current of the k-th allocated voltage source, valid after the
    /// relaxation loop commits.
    pub fn vs_current(&self, k: usize) -> f64 {
        self.vs_current[k]
    }

    pub(crate) fn set_vs_current(&mut self, k: usize, amps: f64) {
        self.vs_current[k] = amps;
    }

    pub(crate) fn allocate_sources(&mut self, first: usize, count: usize) {
        self.vsrc = (first..first + count).collect();
        self.vs_current = vec![0.0; count];
    }

    /// Reportable current, valid after the relaxation loop commits.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Set the reportable current. Called from `compute_current`.
    pub fn set_current(&mut self, amps: f64) {
        self.current = amps;
    }

    /// Zero all transient electrical state, keeping the topology mapping.
    pub fn reset(&mut self) {
        self.volt.fill(0.0);
        self.vs_current.fill(0.0);
        self.current = 0.0;
    }
}

/// The capability set every device implements.
///
/// The core calls these in a fixed order per tick:
/// `execute` (once, digital pin blocks only), `stamp` (linear part),
/// then per relaxation iteration `step`, and finally `compute_current`
/// once the loop has converged or exhausted its budget. `begin_step` runs
/// before the first iteration so devices can capture companion-model values
/// from the prior tick's settled state.
///
/// A device violating its declared lead or voltage-source counts after
/// analysis is reported as
/// [`CircuitError::ConstraintViolation`](crate::CircuitError::ConstraintViolation)
/// at the next stamp pass.
pub trait Device: Any + fmt::Debug {
    /// Pin state shared with the core.
    fn pins(&self) -> &Pins;

    /// Mutable pin state shared with the core.
    fn pins_mut(&mut self) -> &mut Pins;

    /// Number of external connection points.
    fn lead_count(&self) -> usize {
        self.pins().lead_count()
    }

    /// Number of independent voltage sources this device stamps. Each one
    /// costs an extra branch-current unknown.
    fn voltage_source_count(&self) -> usize {
        0
    }

    /// Whether this device must be re-linearized every relaxation iteration.
    fn is_nonlinear(&self) -> bool {
        false
    }

    /// Whether this device is a zero-impedance joint. Pure wires (no
    /// voltage-source rows) have their leads unified into one node.
    fn is_wire(&self) -> bool {
        false
    }

    /// Whether this device references the ground node internally (rails,
    /// grounds, logic levels). Ensures the reference node exists.
    fn has_ground_connection(&self) -> bool {
        false
    }

    /// Whether two leads are internally joined at zero impedance.
    fn leads_are_connected(&self, a: usize, b: usize) -> bool {
        let _ = (a, b);
        true
    }

    /// Clear transient state (stored charge, operating points, latches).
    fn reset(&mut self) {
        self.pins_mut().reset();
    }

    /// Stamp the linear, per-tick-constant part of this device's law.
    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        let _ = sim;
    }

    /// Capture the pre-iteration operating point (companion-model values
    /// derived from the prior tick's settled state).
    fn begin_step(&mut self, dt: f64) {
        let _ = dt;
    }

    /// Stamp per-iteration contributions on top of the linear part. This is
    /// where non-linear devices re-linearize, clamp their own voltage step,
    /// and vote on convergence via [`Stamper::clear_converged`].
    fn step(&mut self, sim: &mut Stamper<'_>) {
        let _ = sim;
    }

    /// Digital pin block hook: runs exactly once per tick, before stamping.
    /// For devices that only read and write logic levels.
    fn execute(&mut self) {}

    /// Derive the reportable current from the final solved voltages.
    fn compute_current(&mut self) {}

    /// Voltage across the device: lead 0 relative to lead 1, or to ground
    /// for single-lead devices.
    fn voltage_delta(&self) -> f64 {
        let pins = self.pins();
        match pins.lead_count() {
            0 => 0.0,
            1 => pins.volt(0),
            _ => pins.volt(0) - pins.volt(1),
        }
    }

    /// Reportable current, valid once the tick has committed.
    fn current(&self) -> f64 {
        self.pins().current()
    }
}
