//! The circuit: device arena, lead connections, analysis cache, and the
//! fixed-step time driver.

use std::any::Any;
use std::collections::HashMap;

use super::types::{Handle, Lead, Sample, GROUND};
use super::unify::Unifier;
use crate::components::Device;
use crate::error::{CircuitError, Result};
use crate::solver::{relaxation, MnaMatrix, Stamper, MAX_ITERATIONS};

/// Default time step in seconds (5 microseconds).
pub const DEFAULT_TIME_STEP: f64 = 5e-6;

/// Configuration for the time-step driver.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Fixed time step in seconds.
    pub time_step: f64,
    /// Maximum relaxation iterations per tick.
    pub max_iterations: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl SimConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fixed time step in seconds.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the relaxation iteration budget per tick.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of unifying leads and sizing the system: the cached analysis,
/// discarded and rebuilt on any topology change.
#[derive(Debug)]
struct Analysis {
    /// The tick's stamped linear system.
    base: MnaMatrix,
    /// Per-iteration scratch; holds the final solution after a tick.
    work: MnaMatrix,
}

/// A circuit under simulation.
///
/// Hosts register devices, connect leads, and advance simulated time:
///
/// ```
/// use breadboard::{Circuit, Device, components::{Rail, Resistor, Ground}};
///
/// let mut sim = Circuit::new();
/// let rail = sim.add(Rail::new(5.0));
/// let res = sim.add(Resistor::new(100.0));
/// let gnd = sim.add(Ground::new());
/// sim.connect(rail.lead(0), res.lead(0)).unwrap();
/// sim.connect(res.lead(1), gnd.lead(0)).unwrap();
/// sim.ticks(10).unwrap();
/// assert!((sim.get(&res).current() - 0.05).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Circuit {
    devices: Vec<Box<dyn Device>>,
    links: Vec<(Lead, Lead)>,
    config: SimConfig,
    analysis: Option<Analysis>,
    needs_analysis: bool,
    time: f64,
    converged: bool,
    iterations: usize,
    scopes: HashMap<usize, Vec<Sample>>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create an empty circuit with a custom configuration.
    pub fn with_config(config: SimConfig) -> Self {
        Self {
            devices: Vec::new(),
            links: Vec::new(),
            config,
            analysis: None,
            needs_analysis: true,
            time: 0.0,
            converged: true,
            iterations: 0,
            scopes: HashMap::new(),
        }
    }

    /// Register a device. Its leads start unconnected.
    pub fn add<T: Device>(&mut self, device: T) -> Handle<T> {
        let handle = Handle::new(self.devices.len());
        self.devices.push(Box::new(device));
        self.needs_analysis = true;
        handle
    }

    /// Shared access to a registered device.
    pub fn get<T: Device>(&self, handle: &Handle<T>) -> &T {
        let device: &dyn Device = self.devices[handle.index()].as_ref();
        (device as &dyn Any)
            .downcast_ref::<T>()
            .expect("handle does not match the device registered at its index")
    }

    /// Exclusive access to a registered device.
    ///
    /// Any mutable access may change what the device stamps or how its leads
    /// join (switch toggles, source values), so the cached analysis is
    /// invalidated and rebuilt on the next tick.
    pub fn get_mut<T: Device>(&mut self, handle: &Handle<T>) -> &mut T {
        self.needs_analysis = true;
        let device: &mut dyn Device = self.devices[handle.index()].as_mut();
        (device as &mut dyn Any)
            .downcast_mut::<T>()
            .expect("handle does not match the device registered at its index")
    }

    /// Declare two leads electrically joined (a zero-impedance connection).
    ///
    /// The circuit stays in its last valid state when the connection is
    /// rejected.
    pub fn connect(&mut self, a: Lead, b: Lead) -> Result<()> {
        self.check_lead(a)?;
        self.check_lead(b)?;
        if a == b {
            return Err(CircuitError::SelfConnection {
                device: a.device,
                lead: a.lead,
            });
        }
        self.links.push((a, b));
        self.needs_analysis = true;
        Ok(())
    }

    fn check_lead(&self, lead: Lead) -> Result<()> {
        let Some(device) = self.devices.get(lead.device) else {
            return Err(CircuitError::UnknownDevice {
                device: lead.device,
            });
        };
        let count = device.lead_count();
        if lead.lead >= count {
            return Err(CircuitError::LeadOutOfRange {
                device: lead.device,
                lead: lead.lead,
                count,
            });
        }
        Ok(())
    }

    /// Register an observer on a device: a `(time, voltage, current)` sample
    /// is appended after every tick. Re-registering restarts the stream.
    pub fn watch<T: Device>(&mut self, handle: &Handle<T>) {
        self.scopes.insert(handle.index(), Vec::new());
    }

    /// Samples collected for a watched device (empty when unwatched).
    pub fn samples<T: Device>(&self, handle: &Handle<T>) -> &[Sample] {
        self.scopes
            .get(&handle.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Whether the last tick's relaxation loop settled within budget. A
    /// false value flags the last tick's readings as unreliable; it is not
    /// an error, and the next tick starts from the unsettled state.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Relaxation iterations spent by the last tick.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Reset simulated time and all device state, keeping the topology.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.converged = true;
        self.iterations = 0;
        for device in &mut self.devices {
            device.reset();
        }
        for samples in self.scopes.values_mut() {
            samples.clear();
        }
    }

    /// Force a full topology rebuild: unify leads into nodes, allocate
    /// voltage-source rows, size the system, and stamp the linear part.
    ///
    /// Implicitly invoked by the first tick after any topology change;
    /// calling it twice without changes yields an identical system.
    pub fn analyze(&mut self) -> Result<()> {
        // Lead offsets into the union-find slot space.
        let mut offsets = Vec::with_capacity(self.devices.len());
        let mut total_leads = 0;
        for device in &self.devices {
            offsets.push(total_leads);
            total_leads += device.lead_count();
        }

        let mut unifier = Unifier::new(total_leads);

        // Explicit connections.
        for (a, b) in &self.links {
            self.check_lead(*a)?;
            self.check_lead(*b)?;
            unifier.union(offsets[a.device] + a.lead, offsets[b.device] + b.lead);
        }

        // Pure wires join their own leads. Devices that also stamp a
        // voltage-source row (closed switches) are joined through that row
        // instead, so the branch current stays observable.
        for (idx, device) in self.devices.iter().enumerate() {
            if !device.is_wire() || device.voltage_source_count() != 0 {
                continue;
            }
            let leads = device.lead_count();
            for i in 0..leads {
                for j in (i + 1)..leads {
                    if device.leads_are_connected(i, j) {
                        unifier.union(offsets[idx] + i, offsets[idx] + j);
                    }
                }
            }
        }

        // Ground reference: devices that stamp against ground (rails,
        // grounds, logic levels) pin the reference themselves. Without any,
        // the first lead's class becomes the reference so that source loops
        // with no explicit ground stay solvable.
        let grounded = self.devices.iter().any(|d| d.has_ground_connection());
        let ground_root = if !grounded && total_leads > 0 {
            Some(unifier.find(0))
        } else {
            None
        };

        // Number the classes densely; ground is 0.
        let mut node_of_root: HashMap<usize, usize> = HashMap::new();
        if let Some(root) = ground_root {
            node_of_root.insert(root, GROUND);
        }
        let mut next_node = 1;
        for slot in 0..total_leads {
            let root = unifier.find(slot);
            node_of_root.entry(root).or_insert_with(|| {
                let node = next_node;
                next_node += 1;
                node
            });
        }
        let node_count = next_node;

        // Write resolved nodes and voltage-source rows into every device.
        let mut source_cursor = 0;
        for (idx, device) in self.devices.iter_mut().enumerate() {
            let leads = device.lead_count();
            let sources = device.voltage_source_count();
            let pins = device.pins_mut();
            for lead in 0..leads {
                let root = unifier.find(offsets[idx] + lead);
                pins.set_node(lead, node_of_root[&root]);
            }
            pins.allocate_sources(source_cursor, sources);
            source_cursor += sources;
        }

        self.analysis = Some(Analysis {
            base: MnaMatrix::new(node_count - 1, source_cursor),
            work: MnaMatrix::new(node_count - 1, source_cursor),
        });
        self.needs_analysis = false;

        self.stamp_linear()
    }

    /// Stamp the linear part of every device into the tick's base system.
    /// Runs once per tick; per-iteration contributions go on top of a copy.
    fn stamp_linear(&mut self) -> Result<()> {
        let dt = self.config.time_step;
        let time = self.time;
        let Some(analysis) = self.analysis.as_mut() else {
            return Ok(());
        };

        // Contract check: declared counts must still match the analyzed
        // allocation. A mismatch is a device-implementation bug.
        for (idx, device) in self.devices.iter().enumerate() {
            let pins = device.pins();
            if device.lead_count() != pins.lead_count() {
                return Err(CircuitError::constraint(
                    idx,
                    format!(
                        "declares {} leads but carries {}",
                        device.lead_count(),
                        pins.lead_count()
                    ),
                ));
            }
            if device.voltage_source_count() != pins.source_count() {
                return Err(CircuitError::constraint(
                    idx,
                    format!(
                        "declares {} voltage sources but was allocated {}",
                        device.voltage_source_count(),
                        pins.source_count()
                    ),
                ));
            }
        }

        analysis.base.clear();
        let mut converged = true;
        let mut sim = Stamper::new(&mut analysis.base, &mut converged, dt, time);
        for device in self.devices.iter_mut() {
            device.stamp(&mut sim);
        }
        Ok(())
    }

    /// Advance simulated time by one step.
    ///
    /// Re-analyzes first if the topology changed, runs the relaxation loop,
    /// then appends a sample to every registered observer. Non-convergence
    /// is reported through [`Circuit::converged`], not as an error.
    pub fn tick(&mut self) -> Result<()> {
        if self.needs_analysis || self.analysis.is_none() {
            self.analyze()?;
        }

        // Digital pin blocks latch their outputs from the settled previous
        // tick, exactly once per tick.
        for device in self.devices.iter_mut() {
            device.execute();
        }

        self.stamp_linear()?;

        let Some(analysis) = self.analysis.as_mut() else {
            return Ok(());
        };
        let report = relaxation::settle(
            &mut self.devices,
            &analysis.base,
            &mut analysis.work,
            self.config.time_step,
            self.time,
            self.config.max_iterations,
        )?;
        self.converged = report.converged;
        self.iterations = report.iterations;
        self.time += self.config.time_step;

        for (&idx, samples) in self.scopes.iter_mut() {
            let device = &self.devices[idx];
            samples.push(Sample {
                time: self.time,
                voltage: device.voltage_delta(),
                current: device.current(),
            });
        }

        Ok(())
    }

    /// Advance simulated time by `n` steps; behaviorally identical to `n`
    /// sequential [`Circuit::tick`] calls.
    pub fn ticks(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }
}
