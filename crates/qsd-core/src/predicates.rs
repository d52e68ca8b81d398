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

//! Matrix predicates used throughout synthesis to validate inputs
//! and intermediate results within tolerance.

use ndarray::Array2;
use num_complex::Complex64;

use crate::linalg::{dagger, max_abs_diff};

/// Default tolerance for [`is_hermitian`] / [`is_diagonal`].
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// `true` iff `M` is square, has a power-of-two side, and `‖M·Mᴴ − I‖∞ ≤ τ`.
pub fn is_unitary(matrix: &Array2<Complex64>, tolerance: f64) -> bool {
    let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
    if rows != cols || rows == 0 || !rows.is_power_of_two() {
        return false;
    }
    let product = matrix.dot(&dagger(matrix));
    let identity = Array2::<Complex64>::eye(rows);
    max_abs_diff(&product, &identity) <= tolerance
}

/// `true` iff `‖M − Mᴴ‖∞ ≤ τ`.
pub fn is_hermitian(matrix: &Array2<Complex64>, tolerance: f64) -> bool {
    let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
    if rows != cols {
        return false;
    }
    max_abs_diff(matrix, &dagger(matrix)) <= tolerance
}

/// `true` iff every off-diagonal entry has `|·| ≤ τ`.
pub fn is_diagonal(matrix: &Array2<Complex64>, tolerance: f64) -> bool {
    let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
    for i in 0..rows {
        for j in 0..cols {
            if i != j && matrix[[i, j]].norm() > tolerance {
                return false;
            }
        }
    }
    true
}
