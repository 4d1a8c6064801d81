//! Error types for the Breadboard circuit simulator.
//!
//! This module provides a unified error type [`CircuitError`] that covers
//! all error conditions that can occur while building a topology and
//! while solving it.

use thiserror::Error;

/// Result type alias using [`CircuitError`].
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Unified error type for all Breadboard operations.
#[derive(Error, Debug)]
pub enum CircuitError {
    // ============ Topology Errors ============
    /// A lead was connected to itself
    #[error("cannot connect lead {lead} of device {device} to itself")]
    SelfConnection { device: usize, lead: usize },

    /// A lead index exceeds the device's declared lead count
    #[error("device {device} has {count} leads, lead {lead} is out of range")]
    LeadOutOfRange {
        device: usize,
        lead: usize,
        count: usize,
    },

    /// A connection referenced a device that was never registered
    #[error("device {device} does not exist in this circuit")]
    UnknownDevice { device: usize },

    // ============ Simulation Errors ============
    /// Matrix cannot be solved (floating node or conflicting forced voltages)
    #[error("singular matrix - circuit may have a floating node or conflicting voltage sources")]
    SingularMatrix,

    /// A device's declared contract counts mismatch its analyzed allocation
    #[error("device {device} violated its contract: {message}")]
    ConstraintViolation { device: usize, message: String },
}

impl CircuitError {
    /// Create a constraint violation error.
    pub fn constraint(device: usize, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            device,
            message: message.into(),
        }
    }
}
