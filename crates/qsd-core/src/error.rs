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

/// Errors surfaced by the synthesis engine.
///
/// A `#[non_exhaustive]`, `thiserror`-derived enum with struct-like variants
/// carrying diagnostic context (recursion depth, subsystem, numeric
/// deviation) rather than a single opaque message string.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SynthesisError {
    /// Wrong qubit-index count, non-integer indices, unknown basis string.
    #[error("invalid operand: {reason}")]
    InvalidOperand { reason: String },

    /// Matrix side is not `2^n`, or does not match the qubit count.
    #[error("shape mismatch: expected a {expected} unitary, got shape {rows}x{cols}")]
    ShapeMismatch {
        expected: String,
        rows: usize,
        cols: usize,
    },

    /// Operator construction rejected the matrix.
    #[error("matrix is not unitary within tolerance {tolerance:e} (max deviation {max_deviation:e})")]
    NotUnitary { tolerance: f64, max_deviation: f64 },

    /// Eigen/Schur did not converge, or produced a non-unitary factor, during
    /// recursion. Carries the recursion depth and subsystem tag for debugging.
    #[error("numeric failure in `{subsystem}` at recursion depth {depth}: {reason}")]
    NumericFailure {
        subsystem: &'static str,
        depth: usize,
        reason: String,
    },

    /// The final A.2 reconstruction assertion (or any other post-pass
    /// integrity check) did not hold. Soft-fatal: the synthesis is wrong, not
    /// the caller's input.
    #[error("integrity violation: {reason} (max deviation {max_deviation:e})")]
    IntegrityViolation { reason: String, max_deviation: f64 },
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;
