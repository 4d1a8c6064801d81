//! Core types for circuit topology.

use std::fmt;
use std::marker::PhantomData;

use crate::components::Device;

/// The ground reference node. Always index 0, always 0V, never an unknown.
pub const GROUND: usize = 0;

/// A typed handle to a device registered in a [`Circuit`](crate::Circuit).
///
/// The type parameter records the concrete device type so that
/// `Circuit::get`/`get_mut` can hand back the device without the caller
/// spelling out a downcast. Handles are only meaningful for the circuit
/// that issued them.
pub struct Handle<T: Device> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Device> Handle<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Address one of this device's leads.
    pub fn lead(&self, lead: usize) -> Lead {
        Lead {
            device: self.index,
            lead,
        }
    }
}

impl<T: Device> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Device> Copy for Handle<T> {}

impl<T: Device> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// A device's external connection point: (device index, lead index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lead {
    pub(crate) device: usize,
    pub(crate) lead: usize,
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}:{}", self.device, self.lead)
    }
}

/// One observer record: the state of a watched device at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Simulated time at the end of the tick that produced this sample.
    pub time: f64,
    /// Voltage across the device (lead 0 relative to lead 1, or to ground
    /// for single-lead devices).
    pub voltage: f64,
    /// Reportable current through the device.
    pub current: f64,
}
