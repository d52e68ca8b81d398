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

//! Gate matrix-algebra helper used only for classical simulation and testing.
//!
//! This mirrors `qickit.circuit.gate_matrix.Gate` (`gate.py`)'s static
//! gate-matrix definitions, wrapped as an owned, independently-unitary-checked
//! value type rather than a bag of `pyfunction`s.

mod constants;
pub mod error;

pub use constants::*;
pub use error::{GateMatrixError, GateMatrixResult};

use ndarray::Array2;
use num_complex::Complex64;

/// Qubit-index convention of a gate's matrix representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// Most-significant-qubit-first (the default produced by tensor construction).
    Msb,
    /// Least-significant-qubit-first.
    Lsb,
}

/// A named, unitary-checked gate matrix.
#[derive(Debug, Clone)]
pub struct Gate {
    pub name: String,
    pub matrix: Array2<Complex64>,
    pub num_qubits: u32,
    pub ordering: Ordering,
}

/// `‖M·Mᴴ − I‖∞ ≤ τ`, restricted to square power-of-two matrices.
pub fn is_unitary_matrix(matrix: &Array2<Complex64>, tolerance: f64) -> bool {
    let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
    if rows != cols || !rows.is_power_of_two() {
        return false;
    }
    let product = matrix.dot(&matrix.t().mapv(|c| c.conj()));
    let identity = Array2::<Complex64>::eye(rows);
    let max_dev = (&product - &identity)
        .iter()
        .map(|c| c.norm())
        .fold(0.0_f64, f64::max);
    max_dev <= tolerance
}

impl Gate {
    /// Tolerance mirrors the synthesis engine's `τ_unitary` default rather than inventing a new one.
    const DEFAULT_UNITARY_TOLERANCE: f64 = 1e-8;

    pub fn new(name: impl Into<String>, matrix: Array2<Complex64>) -> GateMatrixResult<Self> {
        let name = name.into();
        let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
        if rows != cols || !rows.is_power_of_two() {
            return Err(GateMatrixError::ShapeMismatch { rows, cols });
        }
        if !is_unitary_matrix(&matrix, Self::DEFAULT_UNITARY_TOLERANCE) {
            return Err(GateMatrixError::NotUnitary {
                name,
                tolerance: Self::DEFAULT_UNITARY_TOLERANCE,
            });
        }
        Ok(Gate {
            name,
            num_qubits: rows.trailing_zeros(),
            matrix,
            ordering: Ordering::Msb,
        })
    }

    /// `Mᴴ`.
    pub fn adjoint(&self) -> Array2<Complex64> {
        self.matrix.t().mapv(|c| c.conj())
    }

    /// Lift this gate to act under `num_control_qubits` extra controls, active on
    /// the all-ones control bitstring.
    ///
    /// The source (`gate.py`) writes this as a single `|0><0|⊗I + |1><1|⊗U` sum,
    /// which only type-checks when the number of control qubits equals
    /// `self.num_qubits` (both kron terms must agree in shape). We generalize
    /// to an arbitrary number of controls via a block-diagonal construction
    /// (identity on every control pattern but all-ones, `self.matrix` on the
    /// all-ones block), which reduces to the source's formula exactly when
    /// `num_control_qubits == self.num_qubits` and remains a valid unitary of
    /// size `2^(num_qubits + num_control_qubits)` in general.
    pub fn control(&self, num_control_qubits: u32) -> GateMatrixResult<Gate> {
        if num_control_qubits < 1 {
            return Err(GateMatrixError::InvalidOperand(num_control_qubits));
        }

        let target_dim = self.matrix.shape()[0];
        let num_blocks = 1usize << num_control_qubits;
        let total_dim = num_blocks * target_dim;

        let mut controlled = Array2::<Complex64>::zeros((total_dim, total_dim));
        for block in 0..num_blocks {
            let offset = block * target_dim;
            if block == num_blocks - 1 {
                controlled
                    .slice_mut(ndarray::s![offset..offset + target_dim, offset..offset + target_dim])
                    .assign(&self.matrix);
            } else {
                for i in 0..target_dim {
                    controlled[[offset + i, offset + i]] = Complex64::new(1., 0.);
                }
            }
        }

        Gate::new(format!("C{}-{}", num_control_qubits, self.name), controlled)
    }

    /// Permute rows and columns by bit-reversal of the index, toggling between
    /// MSB-first and LSB-first qubit conventions.
    ///
    /// The source (`change_mapping`) allocates the replacement array with
    /// `dtype=type(self.matrix[0][0])`, i.e. from a single scalar rather than
    /// the array's own dtype — flagged in the design notes as a latent bug.
    /// Here the element type (`Complex64`) is fixed by the type system, so the
    /// bug has no equivalent to reproduce.
    pub fn change_mapping(&mut self, ordering: Ordering) {
        if ordering == self.ordering {
            return;
        }
        let size = self.matrix.shape()[0];
        let num_qubits = size.trailing_zeros();
        let mut reordered = Array2::<Complex64>::zeros((size, size));
        for i in 0..size {
            for j in 0..size {
                let new_i = reverse_bits(i, num_qubits);
                let new_j = reverse_bits(j, num_qubits);
                reordered[[new_i, new_j]] = self.matrix[[i, j]];
            }
        }
        self.matrix = reordered;
        self.ordering = ordering;
    }
}

fn reverse_bits(value: usize, width: u32) -> usize {
    let mut result = 0usize;
    for bit in 0..width {
        if value & (1 << bit) != 0 {
            result |= 1 << (width - 1 - bit);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn control_of_single_qubit_gate_is_unitary_of_expected_size() {
        let h = Gate::new("H", h_matrix()).unwrap();
        for k in 1..=3u32 {
            let controlled = h.control(k).unwrap();
            assert_eq!(controlled.matrix.shape()[0], 1 << (k + 1));
            assert!(is_unitary_matrix(&controlled.matrix, 1e-10));
        }
    }

    #[test]
    fn control_rejects_zero_controls() {
        let h = Gate::new("H", h_matrix()).unwrap();
        assert!(h.control(0).is_err());
    }

    #[test]
    fn change_mapping_round_trips() {
        let mut cx = Gate::new("CX", cx_matrix()).unwrap();
        let original = cx.matrix.clone();
        cx.change_mapping(Ordering::Lsb);
        assert_ne!(cx.matrix, original);
        cx.change_mapping(Ordering::Msb);
        for (a, b) in cx.matrix.iter().zip(original.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_non_unitary_matrix() {
        let bad = ndarray::array![
            [Complex64::new(1., 0.), Complex64::new(1., 0.)],
            [Complex64::new(0., 0.), Complex64::new(1., 0.)]
        ];
        assert!(Gate::new("bad", bad).is_err());
    }
}
