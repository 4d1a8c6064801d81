//! # Breadboard
//!
//! A discrete-time circuit simulation engine.
//!
//! This library provides:
//! - A device arena with typed handles and explicit lead-to-lead connections
//! - Modified Nodal Analysis (MNA) based circuit simulation
//! - Linear components (R, C, L, potentiometer), sources and clock rails,
//!   switches, diodes, a triode, and a small digital library (logic levels,
//!   gates, a multiplexer)
//! - A fixed-step time driver with per-device observers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Circuit graph, lead unification, and the time-step driver
//! - [`components`] - Device models and the [`Device`] contract
//! - [`solver`] - MNA matrix assembly, LU solving, and the relaxation loop
//!
//! ## Usage
//!
//! ```
//! use breadboard::{Circuit, Device, components::{VoltageSource, Resistor}};
//!
//! let mut sim = Circuit::new();
//! let volt = sim.add(VoltageSource::new(10.0));
//! let r0 = sim.add(Resistor::new(10_000.0));
//! let r1 = sim.add(Resistor::new(10_000.0));
//! sim.connect(volt.lead(1), r0.lead(0)).unwrap();
//! sim.connect(r0.lead(1), r1.lead(0)).unwrap();
//! sim.connect(r1.lead(1), volt.lead(0)).unwrap();
//!
//! sim.ticks(100).unwrap();
//! assert!((sim.get(&r1).voltage_delta() - 5.0).abs() < 1e-9);
//! ```
//!
//! ## Circuit Simulation Method
//!
//! The simulator uses Modified Nodal Analysis (MNA). For each fixed time
//! step:
//!
//! 1. Assemble the system matrix A and source vector z from device stamps
//! 2. Solve Ax = z for node voltages and branch currents
//! 3. For nonlinear devices, iterate until every device's operating point
//!    stops moving (or the iteration budget runs out, which is reported
//!    rather than raised)
//!
//! Reactive elements (C, L) are discretized using the trapezoidal rule for
//! accuracy and stability.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{Circuit, Handle, Lead, Sample, SimConfig, DEFAULT_TIME_STEP, GROUND};
pub use components::{Device, Pins};
pub use error::{CircuitError, Result};
pub use solver::{Stamper, MAX_ITERATIONS, VOLTAGE_TOLERANCE};

/// Thermal voltage at room temperature (approximately 26mV)
pub const THERMAL_VOLTAGE: f64 = 0.0258;
