//! Circuit topology: devices, leads, nodes, and the time-step driver.

mod graph;
mod types;
pub(crate) mod unify;

pub use graph::{Circuit, SimConfig, DEFAULT_TIME_STEP};
pub use types::{Handle, Lead, Sample, GROUND};
