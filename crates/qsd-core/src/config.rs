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

//! Synthesis configuration: numerical tolerances plus the A.1/A.2 peephole
//! toggles, bundled so recursion can thread a single reference through
//! instead of five separate arguments.

/// One-qubit decomposition basis. Both stay selectable so callers targeting
/// a native `U3` gate set don't pay for the extra `RZ`/`RY`/`RZ` fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneQubitBasis {
    /// `RZ(lambda), RY(theta), RZ(phi), GlobalPhase(alpha)`.
    Zyz,
    /// `U3(theta, phi, lambda), GlobalPhase(alpha - (phi+lambda)/2)`.
    U3,
}

/// Tolerances and feature toggles threaded through a single `apply_unitary`
/// call via [`crate::qsd::QsdContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QsdConfig {
    /// Suppress zero-angle rotation emission.
    pub eps_angle: f64,
    /// Input-validation tolerance for `is_unitary`.
    pub tau_unitary: f64,
    /// Post-pass integrity-check tolerance.
    pub tau_verify: f64,
    /// Enable the A.1 CZ-basis substitution in the central rotation.
    pub enable_a1: bool,
    /// Enable the A.2 diagonal-fusion post-pass.
    pub enable_a2: bool,
    /// One-qubit closed-form basis.
    pub one_qubit_basis: OneQubitBasis,
}

impl Default for QsdConfig {
    fn default() -> Self {
        QsdConfig {
            eps_angle: 1e-10,
            tau_unitary: 1e-8,
            tau_verify: 1e-7,
            enable_a1: true,
            enable_a2: true,
            one_qubit_basis: OneQubitBasis::Zyz,
        }
    }
}

impl QsdConfig {
    /// Same tolerances, with both peephole optimizations disabled — used by
    /// the A.2-monotone property test to compare CNOT counts.
    pub fn without_optimizations() -> Self {
        QsdConfig {
            enable_a1: false,
            enable_a2: false,
            ..QsdConfig::default()
        }
    }
}
