//! MNA matrix assembly and solving.

use crate::error::{CircuitError, Result};

/// MNA matrix system Ax = z.
///
/// Unknowns are laid out as the non-ground node voltages followed by one
/// branch current per voltage source. Ground (node 0) is excluded.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// Number of non-ground node unknowns (voltage-source rows follow them)
    nodes: usize,
    /// LU decomposition of A
    lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a zeroed system with `nodes` non-ground node unknowns and
    /// `sources` voltage-source branch unknowns.
    pub fn new(nodes: usize, sources: usize) -> Self {
        let size = nodes + sources;
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            nodes,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and source vector to zero, keeping the solution.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Copy another system's assembled A and z (sizes must match). The
    /// previous solution is kept as the next solve's reference point.
    pub fn copy_assembled_from(&mut self, other: &MnaMatrix) {
        self.a.copy_from_slice(&other.a);
        self.z.copy_from_slice(&other.z);
    }

    /// Row index of a voltage source's branch-current unknown.
    pub fn source_row(&self, vs: usize) -> usize {
        self.nodes + vs
    }

    /// Branch current of a voltage source from the last solve.
    pub fn branch_current(&self, vs: usize) -> f64 {
        self.x[self.nodes + vs]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two node rows.
    /// For a conductance G between rows n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a voltage source forcing V[n+] - V[n-] = volts, with its branch
    /// current injected into both node equations.
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        vs: usize,
        volts: f64,
    ) {
        let row = self.source_row(vs);
        if let Some(i) = n_pos {
            self.add(row, i, 1.0);
            self.add(i, row, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(row, j, -1.0);
            self.add(j, row, -1.0);
        }
        self.z[row] = volts;
    }

    /// Rewrite a voltage source's target without touching its matrix
    /// pattern. Used by devices whose forced voltage changes per iteration.
    pub fn update_voltage_source(&mut self, vs: usize, volts: f64) {
        let row = self.source_row(vs);
        self.z[row] = volts;
    }

    /// Stamp a constant current driven out of n_from and into n_to.
    pub fn stamp_current_source(&mut self, n_from: Option<usize>, n_to: Option<usize>, amps: f64) {
        if let Some(i) = n_from {
            self.add_source(i, -amps);
        }
        if let Some(j) = n_to {
            self.add_source(j, amps);
        }
    }

    /// Perform LU decomposition with partial pivoting.
    ///
    /// A pivot column with no usable entry means a structurally singular
    /// system - typically a floating node or two independently forced
    /// voltages fighting over one node pair.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < 1e-15 {
                return Err(CircuitError::SingularMatrix);
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        let b = self.z.clone();
        for i in 0..n {
            self.x[i] = b[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            self.x[i] /= self.lu[i * n + i];
        }

        if self.x.iter().any(|v| !v.is_finite()) {
            return Err(CircuitError::SingularMatrix);
        }

        Ok(())
    }

    /// Get a solved unknown.
    pub fn x(&self, row: usize) -> f64 {
        self.x[row]
    }
}

/// The stamping context handed to every `stamp`/`step` call.
///
/// Wraps the working matrix for one relaxation iteration together with the
/// shared convergence flag and the tick parameters. Devices address nodes by
/// their resolved index (0 is ground); the ground index is silently dropped
/// from all stamps since it is not an unknown.
#[derive(Debug)]
pub struct Stamper<'a> {
    matrix: &'a mut MnaMatrix,
    converged: &'a mut bool,
    dt: f64,
    time: f64,
}

impl<'a> Stamper<'a> {
    pub(crate) fn new(
        matrix: &'a mut MnaMatrix,
        converged: &'a mut bool,
        dt: f64,
        time: f64,
    ) -> Self {
        Self {
            matrix,
            converged,
            dt,
            time,
        }
    }

    /// The fixed simulation time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated time at the start of the current tick.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Vote against convergence: the caller's operating point moved more
    /// than its tolerance since the previous iteration.
    pub fn clear_converged(&mut self) {
        *self.converged = false;
    }

    /// Stamp a conductance between two nodes.
    pub fn stamp_conductance(&mut self, a: usize, b: usize, g: f64) {
        self.matrix.stamp_conductance(unknown(a), unknown(b), g);
    }

    /// Stamp a resistor between two nodes.
    pub fn stamp_resistor(&mut self, a: usize, b: usize, ohms: f64) {
        self.stamp_conductance(a, b, 1.0 / ohms);
    }

    /// Stamp a voltage source forcing V[pos] - V[neg] = volts.
    pub fn stamp_voltage_source(&mut self, pos: usize, neg: usize, vs: usize, volts: f64) {
        self.matrix
            .stamp_voltage_source(unknown(pos), unknown(neg), vs, volts);
    }

    /// Rewrite a voltage source's target for this iteration.
    pub fn update_voltage_source(&mut self, vs: usize, volts: f64) {
        self.matrix.update_voltage_source(vs, volts);
    }

    /// Stamp a constant current driven out of node `from` and into node `to`.
    pub fn stamp_current_source(&mut self, from: usize, to: usize, amps: f64) {
        self.matrix
            .stamp_current_source(unknown(from), unknown(to), amps);
    }

    /// Add directly into the matrix at a node row/column pair. For devices
    /// whose linearization is not symmetric (transconductances), where the
    /// paired stamp templates do not apply.
    pub fn stamp_matrix(&mut self, row: usize, col: usize, value: f64) {
        if let (Some(r), Some(c)) = (unknown(row), unknown(col)) {
            self.matrix.add(r, c, value);
        }
    }

    /// Add directly into the source vector at a node row.
    pub fn stamp_right_side(&mut self, node: usize, value: f64) {
        if let Some(r) = unknown(node) {
            self.matrix.add_source(r, value);
        }
    }
}

/// Map a node index to its matrix row; ground has none.
fn unknown(node: usize) -> Option<usize> {
    if node == crate::circuit::GROUND {
        None
    } else {
        Some(node - 1)
    }
}
