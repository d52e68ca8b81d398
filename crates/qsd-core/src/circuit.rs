// This code is part of the qsd-core workspace.
//
// Copyright 2026 The qsd-core Authors
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

//! The `Circuit` collaborator contract and a minimal concrete
//! implementation (`DenseCircuit`) so this crate is directly usable and
//! testable without every caller writing their own collaborator first.
//!
//! The circuit object itself is explicitly out of scope for the synthesis
//! core; this module specifies only the trait boundary the QSD
//! pipeline writes gates through, grounded on an append-only-instruction-log
//! builder API shape.

use ndarray::Array2;
use num_complex::Complex64;

/// One primitive gate invocation, per the declared gate set.
///
/// `UCRZ` is delivered as a single logical gate; whether a given `Circuit`
/// implementation expands it into CNOT/RZ at append time or at
/// `get_unitary()` time is that implementation's concern, not this crate's.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    Ry { theta: f64, qubit: usize },
    Rz { theta: f64, qubit: usize },
    U3 {
        theta: f64,
        phi: f64,
        lambda: f64,
        qubit: usize,
    },
    GlobalPhase { alpha: f64 },
    Cx { control: usize, target: usize },
    Cz { control: usize, target: usize },
    Ucrz {
        angles: Vec<f64>,
        controls: Vec<usize>,
        target: usize,
    },
}

/// The circuit collaborator contract.
///
/// Implementors are an append-only, order-preserving record of [`Gate`]
/// invocations. `slice`/`extend` back the A.2 post-pass's block rewrite;
/// `update` rebuilds any cached representation after a direct
/// `circuit_log` mutation — the A.2 pass buffers its decomposition into an
/// intermediate fragment and only splices it back through direct log
/// mutation plus `update()`, rather than requiring a public `splice`
/// operation on the trait itself.
pub trait Circuit {
    /// Append one gate to the end of the record.
    fn append(&mut self, gate: Gate);

    /// Current length of the record (an opaque position index).
    fn length(&self) -> usize;

    /// Extract the half-open range `[start, end)` as a standalone fragment.
    fn slice(&self, start: usize, end: usize) -> Vec<Gate>;

    /// Append a fragment (as produced by [`Circuit::slice`]) to the end of
    /// the record.
    fn extend(&mut self, fragment: Vec<Gate>);

    /// Truncate the record to empty.
    fn reset(&mut self);

    /// Rebuild any cached representation after a direct `circuit_log`
    /// mutation. A no-op for implementations with no cache.
    fn update(&mut self);

    /// Direct, mutable access to the gate log (used by the A.2 post-pass to
    /// splice fused leaf blocks in place).
    fn circuit_log_mut(&mut self) -> &mut Vec<Gate>;

    /// The product matrix of every gate in the record, applied in order.
    fn get_unitary(&self, num_qubits: usize) -> Array2<Complex64>;
}

/// A minimal concrete [`Circuit`]: an in-memory `Vec<Gate>` with a lazily
/// rebuilt unitary cache. Good enough for tests and for callers who don't
/// already own a circuit representation; production callers are expected
/// to implement [`Circuit`] over their own IR (the circuit object is
/// explicitly treated as an external collaborator here).
#[derive(Debug, Clone, Default)]
pub struct DenseCircuit {
    log: Vec<Gate>,
}

impl DenseCircuit {
    pub fn new() -> Self {
        DenseCircuit { log: Vec::new() }
    }

    pub fn gates(&self) -> &[Gate] {
        &self.log
    }

    /// Count of `CX` gates in the record, plus the CNOT-equivalent cost of
    /// any `UCRZ`/`CZ` gates present — used by the A.2-monotone property test
    /// to compare entangling-gate counts with and without the peephole
    /// optimizations. A `UCRZ` over `k` controls expands to `2^k` CNOTs;
    /// `CZ` counts as one entangler, matching `CX`.
    pub fn entangler_count(&self) -> usize {
        self.log
            .iter()
            .map(|gate| match gate {
                Gate::Cx { .. } | Gate::Cz { .. } => 1,
                Gate::Ucrz { controls, .. } => 1usize << controls.len(),
                _ => 0,
            })
            .sum()
    }
}

impl Circuit for DenseCircuit {
    fn append(&mut self, gate: Gate) {
        self.log.push(gate);
    }

    fn length(&self) -> usize {
        self.log.len()
    }

    fn slice(&self, start: usize, end: usize) -> Vec<Gate> {
        self.log[start..end].to_vec()
    }

    fn extend(&mut self, fragment: Vec<Gate>) {
        self.log.extend(fragment);
    }

    fn reset(&mut self) {
        self.log.clear();
    }

    fn update(&mut self) {
        // No cached representation to rebuild; `get_unitary` is computed
        // fresh from `log` on every call.
    }

    fn circuit_log_mut(&mut self) -> &mut Vec<Gate> {
        &mut self.log
    }

    fn get_unitary(&self, num_qubits: usize) -> Array2<Complex64> {
        gate_log_unitary(&self.log, num_qubits)
    }
}

/// Compute the product matrix of a gate log acting on `num_qubits` logical
/// qubits, qubit `0` least significant. Shared by `DenseCircuit` and the
/// A.2 post-pass's transient leaf sub-circuits.
pub fn gate_log_unitary(log: &[Gate], num_qubits: usize) -> Array2<Complex64> {
    let dim = 1usize << num_qubits;
    let mut acc = Array2::<Complex64>::eye(dim);
    for gate in log {
        let step = gate_matrix(gate, num_qubits);
        acc = step.dot(&acc);
    }
    acc
}

fn gate_matrix(gate: &Gate, num_qubits: usize) -> Array2<Complex64> {
    use qsd_gatematrix::{cx_matrix, cz_matrix, rz_matrix, ry_matrix};
    match gate {
        Gate::Ry { theta, qubit } => embed_one_qubit(&ry_matrix(*theta), *qubit, num_qubits),
        Gate::Rz { theta, qubit } => embed_one_qubit(&rz_matrix(*theta), *qubit, num_qubits),
        Gate::U3 {
            theta,
            phi,
            lambda,
            qubit,
        } => embed_one_qubit(&u3_matrix(*theta, *phi, *lambda), *qubit, num_qubits),
        Gate::GlobalPhase { alpha } => {
            let phase = Complex64::new(0.0, *alpha).exp();
            Array2::<Complex64>::eye(1usize << num_qubits).mapv(|c| c * phase)
        }
        Gate::Cx { control, target } => embed_two_qubit(&cx_matrix(), *control, *target, num_qubits),
        Gate::Cz { control, target } => embed_two_qubit(&cz_matrix(), *control, *target, num_qubits),
        Gate::Ucrz {
            angles,
            controls,
            target,
        } => ucrz_matrix(angles, controls, *target, num_qubits),
    }
}

fn u3_matrix(theta: f64, phi: f64, lambda: f64) -> Array2<Complex64> {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    let e_i_phi = Complex64::new(0.0, phi).exp();
    let e_i_lambda = Complex64::new(0.0, lambda).exp();
    let e_i_phi_lambda = Complex64::new(0.0, phi + lambda).exp();
    ndarray::array![
        [Complex64::new(c, 0.0), -e_i_lambda * s],
        [e_i_phi * s, e_i_phi_lambda * c],
    ]
}

/// Embed a 2x2 one-qubit matrix acting on logical qubit `qubit` into the
/// full `2^num_qubits`-dimensional space, qubit 0 least significant.
fn embed_one_qubit(m: &Array2<Complex64>, qubit: usize, num_qubits: usize) -> Array2<Complex64> {
    let dim = 1usize << num_qubits;
    let mut out = Array2::<Complex64>::zeros((dim, dim));
    let bit = 1usize << qubit;
    for row in 0..dim {
        let row_bit = (row & bit != 0) as usize;
        let row_rest = row & !bit;
        for col_bit in 0..2 {
            let col = row_rest | (col_bit << qubit);
            out[[row, col]] = m[[row_bit, col_bit]];
        }
    }
    out
}

/// Embed a 4x4 two-qubit matrix (row/col index = `2*q_hi_bit + q_lo_bit`
/// with `q_lo` the first listed qubit) acting on `(control, target)`.
fn embed_two_qubit(
    m: &Array2<Complex64>,
    control: usize,
    target: usize,
    num_qubits: usize,
) -> Array2<Complex64> {
    let dim = 1usize << num_qubits;
    let mut out = Array2::<Complex64>::zeros((dim, dim));
    let cbit = 1usize << control;
    let tbit = 1usize << target;
    for row in 0..dim {
        let rc = (row & cbit != 0) as usize;
        let rt = (row & tbit != 0) as usize;
        let rest = row & !cbit & !tbit;
        let row_local = (rc << 1) | rt;
        for local_col in 0..4 {
            let cc = (local_col >> 1) & 1;
            let ct = local_col & 1;
            let col = rest | (cc << control) | (ct << target);
            out[[row, col]] = m[[row_local, local_col]];
        }
    }
    out
}

/// Dense matrix of a uniformly-controlled RZ: `diag` selected by the
/// control bitstring, target rotated by `angles[bitstring]`.
fn ucrz_matrix(
    angles: &[f64],
    controls: &[usize],
    target: usize,
    num_qubits: usize,
) -> Array2<Complex64> {
    let dim = 1usize << num_qubits;
    let mut out = Array2::<Complex64>::zeros((dim, dim));
    let tbit = 1usize << target;
    for row in 0..dim {
        let mut index = 0usize;
        for (bit_pos, &ctrl) in controls.iter().enumerate() {
            if row & (1usize << ctrl) != 0 {
                index |= 1 << bit_pos;
            }
        }
        let theta = angles[index];
        let rz = qsd_gatematrix::rz_matrix(theta);
        let rbit = (row & tbit != 0) as usize;
        let rest = row & !tbit;
        for cbit in 0..2 {
            let col = rest | (cbit << target);
            out[[row, col]] = rz[[rbit, cbit]];
        }
    }
    out
}
