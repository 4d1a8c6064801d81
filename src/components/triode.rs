//! Vacuum triode model.
//!
//! Uses the Child-Langmuir law for the plate current:
//!   I_p = (V_gk + V_pk / mu)^1.5 / kg1
//!
//! Each relaxation iteration linearizes the law into a plate conductance
//! (dI/dV_pk), a transconductance (dI/dV_gk), and a compensating current,
//! stamped asymmetrically across the plate and cathode rows. A positive
//! grid additionally draws current through a fixed grid resistance.

use crate::components::{Device, Pins};
use crate::solver::{Stamper, VOLTAGE_TOLERANCE};

const PLATE: usize = 0;
const GRID: usize = 1;
const CATHODE: usize = 2;

/// Grid-cathode resistance in ohms when the grid is driven positive.
const GRID_RESISTANCE: f64 = 6000.0;

/// Below cutoff the plate path degenerates to a large resistor; an exact
/// zero would make the matrix singular.
const CUTOFF_CONDUCTANCE: f64 = 1e-8;

/// A vacuum triode. Lead 0 is the plate, lead 1 the grid, lead 2 the
/// cathode.
#[derive(Debug, Clone)]
pub struct Triode {
    pins: Pins,
    /// Amplification factor
    mu: f64,
    /// Perveance constant
    kg1: f64,
    last_v: [f64; 3],
    plate_amps: f64,
    grid_amps: f64,
}

impl Default for Triode {
    fn default() -> Self {
        Self::new()
    }
}

impl Triode {
    /// Create a triode with 12AX7-like parameters (mu = 93, kg1 = 680).
    pub fn new() -> Self {
        Self::with_params(93.0, 680.0)
    }

    /// Create a triode with explicit amplification factor and perveance.
    pub fn with_params(mu: f64, kg1: f64) -> Self {
        Self {
            pins: Pins::with_leads(3),
            mu,
            kg1,
            last_v: [0.0; 3],
            plate_amps: 0.0,
            grid_amps: 0.0,
        }
    }

    /// Amplification factor.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Plate current from the last committed tick.
    pub fn plate_current(&self) -> f64 {
        self.plate_amps
    }

    /// Grid current from the last committed tick (non-zero only when the
    /// grid is driven positive).
    pub fn grid_current(&self) -> f64 {
        self.grid_amps
    }

    /// Cathode current from the last committed tick: the plate and grid
    /// currents returning through the cathode.
    pub fn cathode_current(&self) -> f64 {
        self.plate_amps + self.grid_amps
    }

    fn plate_law(&self, vgk: f64, vpk: f64) -> f64 {
        let ival = vgk + vpk / self.mu;
        if ival < 0.0 {
            vpk * CUTOFF_CONDUCTANCE
        } else {
            ival.powf(1.5) / self.kg1
        }
    }
}

impl Device for Triode {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn is_nonlinear(&self) -> bool {
        true
    }

    /// The grid is insulated from the other two terminals.
    fn leads_are_connected(&self, a: usize, b: usize) -> bool {
        !(a == GRID || b == GRID)
    }

    fn step(&mut self, sim: &mut Stamper<'_>) {
        let mut vs = [
            self.pins.volt(PLATE),
            self.pins.volt(GRID),
            self.pins.volt(CATHODE),
        ];
        // Grid and cathode swings steer the exponent; clamp them to 0.5V
        // per iteration to damp oscillation. The plate is left free.
        for lead in [GRID, CATHODE] {
            vs[lead] = (vs[lead] - self.last_v[lead]).clamp(-0.5, 0.5) + self.last_v[lead];
        }

        if vs
            .iter()
            .zip(self.last_v.iter())
            .any(|(v, last)| (v - last).abs() > VOLTAGE_TOLERANCE)
        {
            sim.clear_converged();
        }
        self.last_v = vs;

        let vgk = vs[GRID] - vs[CATHODE];
        let vpk = vs[PLATE] - vs[CATHODE];

        let (plate, grid, cathode) = (
            self.pins.node(PLATE),
            self.pins.node(GRID),
            self.pins.node(CATHODE),
        );

        if vgk > 0.01 {
            sim.stamp_resistor(grid, cathode, GRID_RESISTANCE);
        }

        let ival = vgk + vpk / self.mu;
        let (ids, gds, gm) = if ival < 0.0 {
            (vpk * CUTOFF_CONDUCTANCE, CUTOFF_CONDUCTANCE, 0.0)
        } else {
            let q = 1.5 * ival.sqrt() / self.kg1;
            (ival.powf(1.5) / self.kg1, q, q / self.mu)
        };

        // I_p = Gds*V_pk + gm*V_gk - rs, split across the plate and cathode
        // rows; the grid row carries no plate current.
        let rs = -ids + gds * vpk + gm * vgk;
        sim.stamp_matrix(plate, plate, gds);
        sim.stamp_matrix(plate, cathode, -gds - gm);
        sim.stamp_matrix(plate, grid, gm);
        sim.stamp_matrix(cathode, plate, -gds);
        sim.stamp_matrix(cathode, cathode, gds + gm);
        sim.stamp_matrix(cathode, grid, -gm);
        sim.stamp_right_side(plate, rs);
        sim.stamp_right_side(cathode, -rs);
    }

    fn compute_current(&mut self) {
        let vgk = self.pins.volt(GRID) - self.pins.volt(CATHODE);
        let vpk = self.pins.volt(PLATE) - self.pins.volt(CATHODE);
        self.grid_amps = if vgk > 0.01 {
            vgk / GRID_RESISTANCE
        } else {
            0.0
        };
        self.plate_amps = self.plate_law(vgk, vpk);
        self.pins.set_current(self.cathode_current());
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.last_v = [0.0; 3];
        self.plate_amps = 0.0;
        self.grid_amps = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::components::{Ground, Rail, Resistor};
    use approx::assert_relative_eq;

    fn common_cathode(plate_volts: f64, grid_volts: f64) -> (Circuit, crate::Handle<Triode>) {
        let mut sim = Circuit::new();
        let supply = sim.add(Rail::new(plate_volts));
        let load = sim.add(Resistor::new(10_000.0));
        let bias = sim.add(Rail::new(grid_volts));
        let tri = sim.add(Triode::new());
        let gnd = sim.add(Ground::new());
        sim.connect(supply.lead(0), load.lead(0)).unwrap();
        sim.connect(load.lead(1), tri.lead(0)).unwrap();
        sim.connect(bias.lead(0), tri.lead(1)).unwrap();
        sim.connect(tri.lead(2), gnd.lead(0)).unwrap();
        (sim, tri)
    }

    #[test]
    fn plate_law_matches_load_line() {
        let (mut sim, tri) = common_cathode(200.0, 0.0);
        sim.ticks(20).unwrap();
        assert!(sim.converged());

        // The settled plate voltage sits where the Child-Langmuir curve
        // crosses the 10k load line.
        let vp = sim.get(&tri).pins().volt(0);
        assert!(vp > 140.0 && vp < 180.0, "plate voltage out of range: {vp}");
        assert_relative_eq!(
            sim.get(&tri).plate_current(),
            (200.0 - vp) / 10_000.0,
            epsilon = 1e-4
        );
        // Grounded grid draws no grid current; the cathode returns the
        // plate current alone.
        assert_eq!(sim.get(&tri).grid_current(), 0.0);
        assert_relative_eq!(
            sim.get(&tri).cathode_current(),
            sim.get(&tri).plate_current(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn negative_grid_cuts_the_tube_off() {
        let (mut sim, tri) = common_cathode(200.0, -5.0);
        sim.ticks(30).unwrap();
        assert!(sim.converged());

        // Below cutoff only the leak conductance remains; the plate rides
        // up to the supply.
        let vp = sim.get(&tri).pins().volt(0);
        assert!(vp > 199.9, "plate should sit at the supply, got {vp}");
        assert!(sim.get(&tri).plate_current() < 1e-5);
    }

    #[test]
    fn grid_voltage_controls_plate_current() {
        let (mut sim_hot, tri_hot) = common_cathode(200.0, 0.0);
        let (mut sim_cool, tri_cool) = common_cathode(200.0, -2.0);
        sim_hot.ticks(20).unwrap();
        sim_cool.ticks(20).unwrap();

        let hot = sim_hot.get(&tri_hot).plate_current();
        let cool = sim_cool.get(&tri_cool).plate_current();
        assert!(
            hot > 10.0 * cool,
            "grid bias should throttle the plate: {hot} vs {cool}"
        );
    }

    #[test]
    fn positive_grid_draws_grid_current() {
        let mut sim = Circuit::new();
        let supply = sim.add(Rail::new(200.0));
        let load = sim.add(Resistor::new(10_000.0));
        let bias = sim.add(Rail::new(3.0));
        let grid_stop = sim.add(Resistor::new(1000.0));
        let tri = sim.add(Triode::new());
        let gnd = sim.add(Ground::new());
        sim.connect(supply.lead(0), load.lead(0)).unwrap();
        sim.connect(load.lead(1), tri.lead(0)).unwrap();
        sim.connect(bias.lead(0), grid_stop.lead(0)).unwrap();
        sim.connect(grid_stop.lead(1), tri.lead(1)).unwrap();
        sim.connect(tri.lead(2), gnd.lead(0)).unwrap();

        sim.ticks(30).unwrap();
        assert!(sim.converged());

        let vgk = sim.get(&tri).pins().volt(1);
        assert!(vgk > 0.01);
        assert_relative_eq!(
            sim.get(&tri).grid_current(),
            vgk / 6000.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            sim.get(&tri).cathode_current(),
            sim.get(&tri).plate_current() + sim.get(&tri).grid_current(),
            epsilon = 1e-12
        );
    }
}
