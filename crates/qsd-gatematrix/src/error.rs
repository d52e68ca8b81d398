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

use thiserror::Error;

/// Errors raised by the [`crate::Gate`] matrix-algebra helper.
///
/// A struct-like, `#[non_exhaustive]` thiserror enum rather than `PyErr`
/// conversions, which only make sense inside a PyO3 extension module.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateMatrixError {
    #[error("gate matrix must be square with a power-of-two side, got shape {rows}x{cols}")]
    ShapeMismatch { rows: usize, cols: usize },

    #[error("gate matrix for `{name}` is not unitary within tolerance {tolerance:e}")]
    NotUnitary { name: String, tolerance: f64 },

    #[error("number of control qubits must be at least 1, got {0}")]
    InvalidOperand(u32),
}

pub type GateMatrixResult<T> = Result<T, GateMatrixError>;
