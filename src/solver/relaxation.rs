//! The per-tick relaxation loop.
//!
//! One tick runs the state machine
//! `BEGIN_STEP -> {STAMP, SOLVE, CHECK_CONVERGED}* -> COMMIT`:
//! devices capture companion values from the prior tick, then each iteration
//! re-stamps per-iteration contributions on top of a copy of the tick's
//! linear system, factors, solves, and writes the node voltages back into
//! every device's pins. Non-linear devices vote against convergence through
//! the shared flag in [`Stamper`] when their operating point moved more than
//! tolerance; the loop stops when the flag survives a full pass or the
//! iteration budget runs out.

use crate::components::Device;
use crate::error::Result;
use crate::solver::matrix::{MnaMatrix, Stamper};

/// Outcome of one tick's relaxation loop.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    /// False when the iteration budget ran out before the circuit settled.
    /// The last computed solution is kept either way.
    pub converged: bool,
    /// Iterations spent (at least 1, at most the budget).
    pub iterations: usize,
}

/// Run one tick's relaxation to completion.
///
/// `base` holds the tick's stamped linear system; `work` is scratch of the
/// same dimension that ends up holding the final solution.
pub(crate) fn settle(
    devices: &mut [Box<dyn Device>],
    base: &MnaMatrix,
    work: &mut MnaMatrix,
    dt: f64,
    time: f64,
    max_iterations: usize,
) -> Result<TickReport> {
    // BEGIN_STEP: capture companion-model values from the settled state.
    for device in devices.iter_mut() {
        device.begin_step(dt);
    }

    let has_nonlinear = devices.iter().any(|d| d.is_nonlinear());

    let mut settled = false;
    let mut iterations = 0;

    for iter in 0..max_iterations {
        iterations = iter + 1;

        // STAMP: per-iteration contributions over a fresh copy of the
        // linear part.
        work.copy_assembled_from(base);
        let mut converged = true;
        {
            let mut sim = Stamper::new(work, &mut converged, dt, time);
            for device in devices.iter_mut() {
                device.step(&mut sim);
            }
        }

        // SOLVE: every iteration is a fresh factorization.
        if work.size > 0 {
            work.factor()?;
            work.solve()?;
        }
        write_lead_voltages(devices, work);

        // CHECK_CONVERGED: linear circuits settle in one pass; anything
        // non-linear needs at least one follow-up pass over the new
        // operating point.
        if !has_nonlinear || (converged && iter > 0) {
            settled = true;
            break;
        }
    }

    commit(devices, work);

    Ok(TickReport {
        converged: settled,
        iterations,
    })
}

/// Push solved node voltages into every device's pins.
fn write_lead_voltages(devices: &mut [Box<dyn Device>], m: &MnaMatrix) {
    for device in devices.iter_mut() {
        let pins = device.pins_mut();
        for lead in 0..pins.lead_count() {
            let node = pins.node(lead);
            let volts = if node == crate::circuit::GROUND {
                0.0
            } else {
                m.x(node - 1)
            };
            pins.set_volt(lead, volts);
        }
    }
}

/// COMMIT: hand branch currents to their owners, then let every device
/// derive its reportable current from the final voltages.
fn commit(devices: &mut [Box<dyn Device>], m: &MnaMatrix) {
    for device in devices.iter_mut() {
        let pins = device.pins_mut();
        for k in 0..pins.source_count() {
            let amps = m.branch_current(pins.vs(k));
            pins.set_vs_current(k, amps);
        }
        device.compute_current();
    }
}
