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

//! Quantum Shannon Decomposition unitary-synthesis engine.
//!
//! Recursively decomposes an arbitrary `2^n x 2^n` unitary into the gate
//! set `{RY, RZ, U3, GlobalPhase, CX, CZ, UCRZ}` via cosine-sine
//! decomposition, uniformly-controlled rotations, and closed-form one- and
//! two-qubit terminal cases, plus the A.1/A.2 peephole optimizations. See
//! [`qsd::apply_unitary`] for the entry point and [`QsdConfig`] for the
//! tunables.
//!
//! The circuit itself is an external collaborator (the [`circuit::Circuit`]
//! trait); [`circuit::DenseCircuit`] is a minimal concrete implementation
//! for callers who don't already have their own circuit IR.

mod a2;
pub mod circuit;
pub mod config;
pub mod cs_decompose;
pub mod demultiplex;
pub mod error;
pub mod linalg;
pub mod one_qubit;
pub mod predicates;
pub mod qsd;
pub mod two_qubit;
pub mod ucr;

pub use circuit::{Circuit, DenseCircuit, Gate};
pub use config::{OneQubitBasis, QsdConfig};
pub use error::{SynthesisError, SynthesisResult};
pub use qsd::apply_unitary;
