//! Linear passive components: Resistor, Potentiometer, Capacitor, Inductor.

use crate::components::{Device, Pins};
use crate::solver::Stamper;

/// Default resistance in ohms for [`Resistor::default`].
pub const DEFAULT_RESISTANCE: f64 = 100.0;

/// A resistor between two leads.
#[derive(Debug, Clone)]
pub struct Resistor {
    pins: Pins,
    ohms: f64,
}

impl Default for Resistor {
    fn default() -> Self {
        Self::new(DEFAULT_RESISTANCE)
    }
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(ohms: f64) -> Self {
        Self {
            pins: Pins::with_leads(2),
            // Minimum resistance to avoid singularity
            ohms: ohms.max(1e-12),
        }
    }

    /// Resistance in ohms.
    pub fn ohms(&self) -> f64 {
        self.ohms
    }

    /// Set the resistance in ohms.
    pub fn set_ohms(&mut self, ohms: f64) {
        self.ohms = ohms.max(1e-12);
    }

    /// Conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.ohms
    }
}

impl Device for Resistor {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        sim.stamp_resistor(self.pins.node(0), self.pins.node(1), self.ohms);
    }

    fn compute_current(&mut self) {
        let amps = self.voltage_delta() / self.ohms;
        self.pins.set_current(amps);
    }
}

/// A potentiometer: a resistive track with a wiper tap.
///
/// Lead 0 and lead 1 are the track ends, lead 2 the wiper. The wiper
/// position splits the track into two series resistances, stamped as two
/// independent resistors meeting at the wiper node. Position 0 puts the
/// wiper at lead 0's end of the track.
#[derive(Debug, Clone)]
pub struct Potentiometer {
    pins: Pins,
    max_ohms: f64,
    position: f64,
    wiper_amps: f64,
}

impl Default for Potentiometer {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl Potentiometer {
    /// Create a potentiometer with the given track resistance, wiper
    /// centered.
    pub fn new(max_ohms: f64) -> Self {
        Self {
            pins: Pins::with_leads(3),
            max_ohms: max_ohms.max(1e-12),
            position: 0.5,
            wiper_amps: 0.0,
        }
    }

    /// Full track resistance in ohms.
    pub fn max_ohms(&self) -> f64 {
        self.max_ohms
    }

    /// Wiper position in [0, 1].
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Move the wiper. Clamped to [0, 1].
    pub fn set_position(&mut self, position: f64) {
        self.position = position.clamp(0.0, 1.0);
    }

    /// Resistance from lead 0 to the wiper.
    fn lower_ohms(&self) -> f64 {
        (self.max_ohms * self.position).max(1e-12)
    }

    /// Resistance from the wiper to lead 1.
    fn upper_ohms(&self) -> f64 {
        (self.max_ohms * (1.0 - self.position)).max(1e-12)
    }

    /// Current drawn out of the wiper by the external circuit, from the
    /// last committed tick.
    pub fn wiper_current(&self) -> f64 {
        self.wiper_amps
    }
}

impl Device for Potentiometer {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        let (end0, end1, wiper) = (self.pins.node(0), self.pins.node(1), self.pins.node(2));
        sim.stamp_resistor(end0, wiper, self.lower_ohms());
        sim.stamp_resistor(wiper, end1, self.upper_ohms());
    }

    fn compute_current(&mut self) {
        // Track currents flowing into the wiper from each end; whatever
        // does not cancel leaves through the wiper lead.
        let vw = self.pins.volt(2);
        let from_end0 = (self.pins.volt(0) - vw) / self.lower_ohms();
        let from_end1 = (self.pins.volt(1) - vw) / self.upper_ohms();
        self.wiper_amps = from_end0 + from_end1;
        self.pins.set_current(self.wiper_amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.wiper_amps = 0.0;
    }
}

/// A capacitor between two leads.
///
/// In discrete-time simulation, a capacitor is modeled using a companion
/// model. Using the trapezoidal rule:
///   i(t) = (2C/dt) * v(t) - i_eq(t-dt)
///
/// where i_eq(t-dt) = (2C/dt) * v(t-dt) + i(t-dt)
///
/// This gives an equivalent conductance G = 2C/dt in parallel with a history
/// current source, both re-stamped at the start of every tick.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pins: Pins,
    farads: f64,
    g: f64,
    v_prev: f64,
    i_prev: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(farads: f64) -> Self {
        Self {
            pins: Pins::with_leads(2),
            farads,
            g: 0.0,
            v_prev: 0.0,
            i_prev: 0.0,
        }
    }

    /// Capacitance in farads.
    pub fn farads(&self) -> f64 {
        self.farads
    }
}

impl Device for Capacitor {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        self.g = 2.0 * self.farads / sim.dt();
        // I_eq = G*v(t-dt) + i(t-dt), driven into lead 0.
        let i_eq = self.g * self.v_prev + self.i_prev;
        let (a, b) = (self.pins.node(0), self.pins.node(1));
        sim.stamp_conductance(a, b, self.g);
        sim.stamp_current_source(b, a, i_eq);
    }

    fn compute_current(&mut self) {
        // i(t) = G * (v(t) - v(t-dt)) - i(t-dt)
        let v = self.voltage_delta();
        let amps = self.g * (v - self.v_prev) - self.i_prev;
        self.v_prev = v;
        self.i_prev = amps;
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.v_prev = 0.0;
        self.i_prev = 0.0;
    }
}

/// An inductor between two leads.
///
/// Modeled as a Norton companion under the trapezoidal rule: an equivalent
/// conductance G = dt/(2L) in parallel with a history current source
///   I_eq = i(t-dt) + G * v(t-dt)
/// carrying the previous current forward.
#[derive(Debug, Clone)]
pub struct Inductor {
    pins: Pins,
    henries: f64,
    g: f64,
    i_hist: f64,
    v_prev: f64,
    i_prev: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(henries: f64) -> Self {
        Self {
            pins: Pins::with_leads(2),
            henries,
            g: 0.0,
            i_hist: 0.0,
            v_prev: 0.0,
            i_prev: 0.0,
        }
    }

    /// Inductance in henries.
    pub fn henries(&self) -> f64 {
        self.henries
    }
}

impl Device for Inductor {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn stamp(&mut self, sim: &mut Stamper<'_>) {
        self.g = sim.dt() / (2.0 * self.henries);
        self.i_hist = self.i_prev + self.g * self.v_prev;
        let (a, b) = (self.pins.node(0), self.pins.node(1));
        sim.stamp_conductance(a, b, self.g);
        // History current continues in the lead 0 -> lead 1 direction.
        sim.stamp_current_source(a, b, self.i_hist);
    }

    fn compute_current(&mut self) {
        // i(t) = G * v(t) + I_eq
        let v = self.voltage_delta();
        let amps = self.g * v + self.i_hist;
        self.v_prev = v;
        self.i_prev = amps;
        self.pins.set_current(amps);
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.i_hist = 0.0;
        self.v_prev = 0.0;
        self.i_prev = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, SimConfig};
    use crate::components::{Ground, Rail};
    use approx::assert_relative_eq;

    #[test]
    fn resistor_clamps_to_minimum() {
        let r = Resistor::new(0.0);
        assert!(r.ohms() > 0.0);
        assert!(r.conductance().is_finite());
    }

    #[test]
    fn potentiometer_taps_proportional_voltage() {
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(10.0));
        let pot = sim.add(Potentiometer::new(1000.0));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), pot.lead(1)).unwrap();
        sim.connect(pot.lead(0), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_relative_eq!(sim.get(&pot).pins().volt(2), 5.0, epsilon = 1e-9);
        // An unloaded wiper carries no current.
        assert!(sim.get(&pot).wiper_current().abs() < 1e-12);

        // Move the wiper a quarter of the way up from the grounded end.
        sim.get_mut(&pot).set_position(0.25);
        sim.tick().unwrap();
        assert_relative_eq!(sim.get(&pot).pins().volt(2), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn potentiometer_position_is_clamped() {
        let mut pot = Potentiometer::new(1000.0);
        pot.set_position(1.5);
        assert_eq!(pot.position(), 1.0);
        pot.set_position(-0.5);
        assert_eq!(pot.position(), 0.0);
    }

    #[test]
    fn loaded_wiper_draws_current() {
        // 10V across the track, wiper at mid, 500 ohm load to ground.
        // Thevenin at the wiper: 5V behind 250 ohm, so the load sees
        // 10/3 V and the wiper supplies 20/3 mA.
        let mut sim = Circuit::new();
        let rail = sim.add(Rail::new(10.0));
        let pot = sim.add(Potentiometer::new(1000.0));
        let load = sim.add(Resistor::new(500.0));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), pot.lead(1)).unwrap();
        sim.connect(pot.lead(0), gnd.lead(0)).unwrap();
        sim.connect(pot.lead(2), load.lead(0)).unwrap();
        sim.connect(load.lead(1), gnd.lead(0)).unwrap();

        sim.tick().unwrap();
        assert_relative_eq!(sim.get(&pot).pins().volt(2), 10.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(sim.get(&pot).wiper_current(), 0.02 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn rc_charging_follows_exponential() {
        // 5V rail into R = 1k, C = 1uF: tau = 1ms. After one tau the
        // capacitor sits at 5 * (1 - e^-1).
        let dt = 1e-6;
        let steps = 1000;
        let mut sim = Circuit::with_config(SimConfig::new().with_time_step(dt));
        let rail = sim.add(Rail::new(5.0));
        let r = sim.add(Resistor::new(1000.0));
        let c = sim.add(Capacitor::new(1e-6));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r.lead(0)).unwrap();
        sim.connect(r.lead(1), c.lead(0)).unwrap();
        sim.connect(c.lead(1), gnd.lead(0)).unwrap();

        sim.ticks(steps).unwrap();

        let expected = 5.0 * (1.0 - (-1.0f64).exp());
        assert_relative_eq!(sim.get(&c).voltage_delta(), expected, epsilon = 1e-2);

        // Fully charged after many more constants: no current flows.
        sim.ticks(steps * 10).unwrap();
        assert_relative_eq!(sim.get(&c).voltage_delta(), 5.0, epsilon = 1e-3);
        assert!(sim.get(&r).current().abs() < 1e-5);
    }

    #[test]
    fn rl_current_rises_toward_steady_state() {
        // 5V rail into R = 100, L = 10mH: tau = 0.1ms, steady state 50mA.
        let dt = 1e-6;
        let mut sim = Circuit::with_config(SimConfig::new().with_time_step(dt));
        let rail = sim.add(Rail::new(5.0));
        let r = sim.add(Resistor::new(100.0));
        let l = sim.add(Inductor::new(10e-3));
        let gnd = sim.add(Ground::new());
        sim.connect(rail.lead(0), r.lead(0)).unwrap();
        sim.connect(r.lead(1), l.lead(0)).unwrap();
        sim.connect(l.lead(1), gnd.lead(0)).unwrap();

        // After one time constant the current reaches 50mA * (1 - e^-1).
        sim.ticks(100).unwrap();
        let expected = 0.05 * (1.0 - (-1.0f64).exp());
        assert_relative_eq!(sim.get(&l).current(), expected, epsilon = 1e-3);

        // Long after, the inductor is a short.
        sim.ticks(2000).unwrap();
        assert_relative_eq!(sim.get(&l).current(), 0.05, epsilon = 1e-4);
        assert!(sim.get(&l).voltage_delta().abs() < 1e-3);
    }
}
