//! Diode models.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! Each relaxation iteration linearizes around the current operating point:
//!   I ~ I0 + G_d * (V - V0)
//!
//! where G_d = dI/dV = Is/(n*Vt) * exp(V0/(n*Vt)), and stamps the
//! linearization as a conductance plus a current source.

use crate::components::{Device, Pins};
use crate::solver::{Stamper, VOLTAGE_TOLERANCE};
use crate::THERMAL_VOLTAGE;

/// Parameters for a diode model.
#[derive(Debug, Clone)]
pub struct DiodeParams {
    /// Saturation current (Is), typically 1e-14 to 1e-12 A
    pub is: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub n: f64,
    /// Forward voltage drop, typically 0.6-0.7V for silicon
    pub vf: f64,
    /// Maximum voltage for exp() calculation to prevent overflow
    pub v_crit: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self {
            is: 1e-14,
            n: 1.0,
            vf: 0.7,
            v_crit: 0.7, // About 27 * Vt, at the knee of the curve
        }
    }
}

impl DiodeParams {
    /// Create parameters for a germanium diode (lower forward voltage).
    pub fn germanium() -> Self {
        Self {
            is: 1e-9,
            n: 1.5,
            vf: 0.3,
            v_crit: 0.5,
        }
    }

    /// Create parameters for an LED.
    pub fn led(color_vf: f64) -> Self {
        Self {
            is: 1e-18,
            n: 2.0,
            vf: color_vf, // Red ~1.8V, Green ~2.2V, Blue ~3.3V
            v_crit: color_vf,
        }
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * THERMAL_VOLTAGE
    }
}

/// A diode. Lead 0 is the anode, lead 1 the cathode.
#[derive(Debug, Clone)]
pub struct Diode {
    pins: Pins,
    params: DiodeParams,
    /// Operating point voltage from the previous iteration
    last_v: f64,
}

impl Default for Diode {
    fn default() -> Self {
        Self::new(DiodeParams::default())
    }
}

impl Diode {
    /// Create a new diode with the given parameters.
    pub fn new(params: DiodeParams) -> Self {
        Self {
            pins: Pins::with_leads(2),
            params,
            last_v: 0.0,
        }
    }

    /// Model parameters.
    pub fn params(&self) -> &DiodeParams {
        &self.params
    }

    /// Calculate the diode current at a given voltage.
    pub fn current_at(&self, v: f64) -> f64 {
        let n_vt = self.params.n_vt();

        // Limit voltage to prevent overflow
        let v_limited = v.min(self.params.v_crit * 2.0);

        if v_limited > self.params.v_crit {
            // Linear extrapolation for high forward bias
            let i_crit = self.params.is * ((self.params.v_crit / n_vt).exp() - 1.0);
            let g_crit = self.params.is / n_vt * (self.params.v_crit / n_vt).exp();
            i_crit + g_crit * (v_limited - self.params.v_crit)
        } else if v_limited < -5.0 * n_vt {
            // Deep reverse bias - just use saturation current
            -self.params.is
        } else {
            self.params.is * ((v_limited / n_vt).exp() - 1.0)
        }
    }

    /// Calculate the conductance (dI/dV) at a given voltage.
    pub fn conductance_at(&self, v: f64) -> f64 {
        let n_vt = self.params.n_vt();
        let v_limited = v.min(self.params.v_crit * 2.0);

        if v_limited > self.params.v_crit {
            self.params.is / n_vt * (self.params.v_crit / n_vt).exp()
        } else if v_limited < -5.0 * n_vt {
            // Very small conductance in deep reverse bias
            1e-12
        } else {
            self.params.is / n_vt * (v_limited / n_vt).exp()
        }
    }

    /// Linearized model at an operating point: (conductance G, equivalent
    /// current source I_eq) such that I = G * V + I_eq.
    fn linearize(&self, v_op: f64) -> (f64, f64) {
        let g = self.conductance_at(v_op).max(1e-12);
        let i = self.current_at(v_op);
        (g, i - g * v_op)
    }

    /// Clamp the voltage step between iterations so the exponential cannot
    /// blow up, while still allowing steps large enough to converge fast.
    fn limit_voltage_step(&self, v_old: f64, v_new: f64) -> f64 {
        let max_step = self.params.v_crit.max(0.5);
        (v_new - v_old).clamp(-max_step, max_step) + v_old
    }
}

impl Device for Diode {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn is_nonlinear(&self) -> bool {
        true
    }

    fn step(&mut self, sim: &mut Stamper<'_>) {
        let v = self.pins.volt(0) - self.pins.volt(1);
        if (v - self.last_v).abs() > VOLTAGE_TOLERANCE {
            sim.clear_converged();
        }
        let v_op = self.limit_voltage_step(self.last_v, v);
        self.last_v = v_op;

        let (g, i_eq) = self.linearize(v_op);
        let (anode, cathode) = (self.pins.node(0), self.pins.node(1));
        sim.stamp_conductance(anode, cathode, g);
        sim.stamp_current_source(anode, cathode, i_eq);
    }

    fn compute_current(&mut self) {
        let amps = self.current_at(self.voltage_delta());
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.last_v = 0.0;
    }
}

/// A tunnel diode, with its characteristic negative-resistance region.
/// Lead 0 is the anode, lead 1 the cathode.
#[derive(Debug, Clone, Default)]
pub struct TunnelDiode {
    pins: Pins,
    last_v: f64,
}

// Peak/valley curve constants for a germanium tunnel diode.
const PVP: f64 = 0.1;
const PIP: f64 = 4.7e-3;
const PVV: f64 = 0.37;
const PVT: f64 = 0.026;
const PVPP: f64 = 0.525;
const PIV: f64 = 370e-6;

impl TunnelDiode {
    /// Create a new tunnel diode.
    pub fn new() -> Self {
        Self {
            pins: Pins::with_leads(2),
            last_v: 0.0,
        }
    }

    /// Characteristic current at a given voltage: the tunneling term, the
    /// negative-resistance hump, and the ordinary diode tail.
    pub fn current_at(&self, v: f64) -> f64 {
        PIP * (-PVPP / PVT).exp() * ((v / PVT).exp() - 1.0)
            + PIP * (v / PVP) * (1.0 - v / PVP).exp()
            + PIV * (v - PVV).exp()
    }

    fn conductance_at(&self, v: f64) -> f64 {
        PIP * (-PVPP / PVT).exp() * (v / PVT).exp() / PVT
            + PIP * (1.0 - v / PVP).exp() / PVP
            - (1.0 - v / PVP).exp() * PIP * v / (PVP * PVP)
            + (v - PVV).exp() * PIV
    }

    /// Iteration steps larger than 1V get clamped; the exponentials make
    /// anything bigger numerically hopeless.
    fn limit_voltage_step(&self, v_old: f64, v_new: f64) -> f64 {
        (v_new - v_old).clamp(-1.0, 1.0) + v_old
    }
}

impl Device for TunnelDiode {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn is_nonlinear(&self) -> bool {
        true
    }

    fn step(&mut self, sim: &mut Stamper<'_>) {
        let v = self.pins.volt(0) - self.pins.volt(1);
        if (v - self.last_v).abs() > VOLTAGE_TOLERANCE {
            sim.clear_converged();
        }
        let v_op = self.limit_voltage_step(self.last_v, v);
        self.last_v = v_op;

        let i = self.current_at(v_op);
        let geq = self.conductance_at(v_op);
        let i_eq = i - geq * v_op;
        let (anode, cathode) = (self.pins.node(0), self.pins.node(1));
        sim.stamp_conductance(anode, cathode, geq);
        sim.stamp_current_source(anode, cathode, i_eq);
    }

    fn compute_current(&mut self) {
        let amps = self.current_at(self.voltage_delta());
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.last_v = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::components::{Ground, Rail, Resistor};
    use approx::assert_relative_eq;

    #[test]
    fn diode_forward_bias_curve() {
        let d = Diode::default();

        // At 0V, current should be approximately 0
        assert!(d.current_at(0.0).abs() < 1e-10);

        // At forward bias, current should increase exponentially
        let i_small = d.current_at(0.3);
        let i_large = d.current_at(0.6);
        assert!(i_large > i_small * 100.0);
    }

    #[test]
    fn diode_reverse_bias_saturates() {
        let d = Diode::default();
        let i_rev = d.current_at(-1.0);
        assert!(i_rev < 0.0);
        assert!(i_rev > -2.0 * d.params().is);
    }

    #[test]
    fn diode_drops_forward_voltage_in_circuit() {
        // 5V rail, 1k series resistor, diode to ground. The diode settles
        // near its forward drop and the resistor takes the rest.
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let r = sim.add(Resistor::new(1000.0));
        let d = sim.add(Diode::default());
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r.lead(0)).unwrap();
        sim.connect(r.lead(1), d.lead(0)).unwrap();
        sim.connect(d.lead(1), gnd.lead(0)).unwrap();

        sim.ticks(10).unwrap();
        assert!(sim.converged());

        let vd = sim.get(&d).voltage_delta();
        assert!(vd > 0.5 && vd < 0.8, "forward drop out of range: {vd}");
        // KCL through the series branch.
        assert_relative_eq!(
            sim.get(&r).current(),
            (5.0 - vd) / 1000.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(sim.get(&d).current(), sim.get(&r).current(), epsilon = 1e-4);
    }

    #[test]
    fn reversed_diode_blocks() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(5.0));
        let r = sim.add(Resistor::new(1000.0));
        let d = sim.add(Diode::default());
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r.lead(0)).unwrap();
        // Cathode toward the rail side.
        sim.connect(r.lead(1), d.lead(1)).unwrap();
        sim.connect(d.lead(0), gnd.lead(0)).unwrap();

        sim.ticks(10).unwrap();
        assert!(sim.converged());
        assert!(sim.get(&r).current().abs() < 1e-6);
    }

    #[test]
    fn tunnel_diode_has_negative_resistance_region() {
        let td = TunnelDiode::new();
        // Current at the peak exceeds current in the valley.
        let i_peak = td.current_at(0.1);
        let i_valley = td.current_at(0.37);
        assert!(i_peak > i_valley);
        assert!(i_peak > 0.0);
    }

    #[test]
    fn tunnel_diode_settles_in_circuit() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(1.0));
        let r = sim.add(Resistor::new(200.0));
        let td = sim.add(TunnelDiode::new());
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r.lead(0)).unwrap();
        sim.connect(r.lead(1), td.lead(0)).unwrap();
        sim.connect(td.lead(1), gnd.lead(0)).unwrap();

        sim.ticks(50).unwrap();
        assert!(sim.converged());

        // Load line: the settled point satisfies both laws.
        let vd = sim.get(&td).voltage_delta();
        let i = sim.get(&td).current();
        assert_relative_eq!(i, (1.0 - vd) / 200.0, epsilon = 1e-4);
        assert_relative_eq!(i, sim.get(&td).current_at(vd), epsilon = 1e-9);
    }
}
