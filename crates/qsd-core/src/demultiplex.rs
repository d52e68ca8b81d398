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

//! The demultiplexor: rewriting a block-diagonal `diag(U1, U2)`
//! as `(I⊗E) * UCRZ * (I⊗W)`, closing over the recursive QSD call for `W`
//! and `E`.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use tracing::instrument;

use crate::circuit::{Circuit, Gate};
use crate::error::SynthesisResult;
use crate::linalg::{dagger, diag, hermitian_eigendecomposition, normal_eigendecomposition, principal_sqrt};
use crate::predicates::is_hermitian;
use crate::qsd::QsdContext;
use crate::ucr::{emit_ucr, transform_angles, Entangler};

/// Rewrite `diag(U1, U2)` (each `m x m`, `m = 2^target_qubits.len()`) as a
/// circuit on `target_qubits ++ [control_qubit]`.
///
/// `U1 = E * D * W`, `U2 = E * D⁻¹ * W`, where `E` is the eigenvector matrix
/// of `T = U1 * U2ᴴ` and `D = diag(sqrt(eigenvalues of T))` (principal
/// branch). The circuit is emitted `W`, then the `UCRZ`
/// realizing `D`/`D⁻¹` (target = `control_qubit`, controls = `target_qubits`,
/// per the role-swap the multiplexed rotation performs), then `E`, each of
/// the two one-qubit-or-larger unitaries recursed on through the QSD driver.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(circuit, u1, u2, ctx), fields(m = u1.shape()[0], control_qubit, depth))]
pub fn demultiplex<C: Circuit>(
    circuit: &mut C,
    u1: &Array2<Complex64>,
    u2: &Array2<Complex64>,
    target_qubits: &[usize],
    control_qubit: usize,
    depth: usize,
    ctx: &mut QsdContext,
) -> SynthesisResult<()> {
    let m = u1.shape()[0];
    let t = u1.dot(&dagger(u2));

    let (eigenvalues, e) = if is_hermitian(&t, ctx.cfg.tau_verify) {
        let (real_eigenvalues, e) = hermitian_eigendecomposition(&t, depth)?;
        let eigenvalues = real_eigenvalues.mapv(|lambda| Complex64::new(lambda, 0.0));
        (eigenvalues, e)
    } else {
        normal_eigendecomposition(&t, depth)?
    };
    let d: Array1<Complex64> = eigenvalues.mapv(principal_sqrt);

    let w = diag(&d).dot(&dagger(&e)).dot(u2);

    crate::qsd::recurse(circuit, &w, target_qubits, depth + 1, ctx)?;

    let mut angles: Vec<f64> = (0..m).map(|i| -2.0 * d[i].arg()).collect();
    transform_angles(&mut angles, false);
    emit_ucr(
        circuit,
        &angles,
        target_qubits,
        control_qubit,
        Entangler::Cx,
        false,
        |theta, q| Gate::Rz { theta, qubit: q },
        &ctx.cfg,
    );

    crate::qsd::recurse(circuit, &e, target_qubits, depth + 1, ctx)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DenseCircuit;
    use crate::config::QsdConfig;
    use crate::predicates::is_unitary;
    use approx::assert_abs_diff_eq;

    fn random_unitary(n: usize, seed: u64) -> Array2<Complex64> {
        use crate::linalg::svd;
        use rand::prelude::*;
        use rand_distr::StandardNormal;
        use rand_pcg::Pcg64Mcg;
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut m = Array2::<Complex64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let re: f64 = rng.sample(StandardNormal);
                let im: f64 = rng.sample(StandardNormal);
                m[[i, j]] = Complex64::new(re, im);
            }
        }
        let (q, _sigma, _v) = svd(&m, 0).unwrap();
        q
    }

    #[test]
    fn demultiplexes_two_one_qubit_blocks() {
        let u1 = random_unitary(2, 11);
        let u2 = random_unitary(2, 12);
        let mut ctx = QsdContext::new(QsdConfig::default());
        let mut circuit = DenseCircuit::new();
        demultiplex(&mut circuit, &u1, &u2, &[0], 1, 0, &mut ctx).unwrap();
        let synthesized = circuit.get_unitary(2);
        assert!(is_unitary(&synthesized, 1e-7));

        let mut expected = Array2::<Complex64>::zeros((4, 4));
        expected.slice_mut(ndarray::s![0..2, 0..2]).assign(&u1);
        expected.slice_mut(ndarray::s![2..4, 2..4]).assign(&u2);
        for (a, b) in synthesized.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-6);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn demultiplexes_equal_blocks_to_identity_rotation() {
        // U1 == U2 makes T Hermitian-friendly (T = I), exercising the
        // Hermitian branch.
        let u1 = random_unitary(2, 21);
        let mut ctx = QsdContext::new(QsdConfig::default());
        let mut circuit = DenseCircuit::new();
        demultiplex(&mut circuit, &u1, &u1, &[0], 1, 0, &mut ctx).unwrap();
        let synthesized = circuit.get_unitary(2);
        let mut expected = Array2::<Complex64>::zeros((4, 4));
        expected.slice_mut(ndarray::s![0..2, 0..2]).assign(&u1);
        expected.slice_mut(ndarray::s![2..4, 2..4]).assign(&u1);
        for (a, b) in synthesized.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-6);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }
}
