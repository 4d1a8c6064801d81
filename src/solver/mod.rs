//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for circuit simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D is usually 0 (for ideal voltage sources)
//! - v is the vector of node voltages
//! - j is the vector of voltage source currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! Non-linear devices are settled by the relaxation loop in [`relaxation`]:
//! each iteration re-stamps their linearized companion models on top of the
//! tick's linear system and re-solves until every device stops moving.

mod matrix;
pub(crate) mod relaxation;

pub use matrix::{MnaMatrix, Stamper};
pub use relaxation::TickReport;

/// Absolute voltage tolerance for the relaxation loop's convergence votes.
pub const VOLTAGE_TOLERANCE: f64 = 0.01;

/// Maximum relaxation iterations per time step.
pub const MAX_ITERATIONS: usize = 5000;
