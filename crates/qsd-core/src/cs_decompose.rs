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

//! The cosine-sine decomposition adapter:
//! `U = diag(L1, L2) * [[C, -S], [S, C]] * diag(R1, R2)`.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::SynthesisResult;
use crate::linalg::{dagger, fit_unitary_columns, svd};

/// The five pieces of a CS-decomposition: two pairs of `m x m` unitary
/// blocks and the `m` central angles, `cos(theta_i)` read off the singular
/// values of the top-left block.
pub struct CsDecomposition {
    pub l1: Array2<Complex64>,
    pub l2: Array2<Complex64>,
    pub theta: Array1<f64>,
    pub r1: Array2<Complex64>,
    pub r2: Array2<Complex64>,
}

/// Decompose a `2m x 2m` unitary `u`, split into four `m x m` blocks
/// `u11, u12, u21, u22`, into `CsDecomposition`.
///
/// `u11 = L1 C R1ᴴ`, `u21 = L2 S R1ᴴ`, `u12 = -L1 S R2ᴴ`, `u22 = L2 C R2ᴴ`,
/// with `C = diag(cos theta)`, `S = diag(sin theta)`. Obtained via the SVD
/// of `u11` (giving `L1`, `theta`, `R1`), then recovering `L2` and `R2` from
/// the off-diagonal blocks, scaled by `sin(theta)`. Any standard CS routine
/// that returns these five outputs separately is acceptable here; this
/// one is built from the SVD kernel already shared with the demultiplexor.
pub fn cs_decompose(u: &Array2<Complex64>, depth: usize) -> SynthesisResult<CsDecomposition> {
    let dim = u.shape()[0];
    let m = dim / 2;
    let u11 = u.slice(ndarray::s![0..m, 0..m]).to_owned();
    let u21 = u.slice(ndarray::s![m..dim, 0..m]).to_owned();
    let u12 = u.slice(ndarray::s![0..m, m..dim]).to_owned();

    let (l1, sigma, r1) = svd(&u11, depth)?;
    let theta = sigma.mapv(|s| s.clamp(-1.0, 1.0).acos());
    let sin_theta = theta.mapv(f64::sin);

    let x = u21.dot(&r1);
    let l2 = fit_unitary_columns(&x, &sin_theta, depth, "cs")?;

    let y = dagger(&l1).dot(&u12).mapv(|c| -c);
    let r2_raw = dagger(&y);
    let r2 = fit_unitary_columns(&r2_raw, &sin_theta, depth, "cs")?;

    Ok(CsDecomposition {
        l1,
        l2,
        theta,
        r1,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::is_unitary;
    use approx::assert_abs_diff_eq;

    fn random_unitary(n: usize, seed: u64) -> Array2<Complex64> {
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

    fn reconstruct(cs: &CsDecomposition) -> Array2<Complex64> {
        let m = cs.theta.len();
        let dim = 2 * m;
        let mut envelope = Array2::<Complex64>::zeros((dim, dim));
        for i in 0..m {
            let (c, s) = (cs.theta[i].cos(), cs.theta[i].sin());
            envelope[[i, i]] = Complex64::new(c, 0.0);
            envelope[[i, m + i]] = Complex64::new(-s, 0.0);
            envelope[[m + i, i]] = Complex64::new(s, 0.0);
            envelope[[m + i, m + i]] = Complex64::new(c, 0.0);
        }
        let mut left = Array2::<Complex64>::zeros((dim, dim));
        left.slice_mut(ndarray::s![0..m, 0..m]).assign(&cs.l1);
        left.slice_mut(ndarray::s![m..dim, m..dim]).assign(&cs.l2);
        let mut right = Array2::<Complex64>::zeros((dim, dim));
        right.slice_mut(ndarray::s![0..m, 0..m]).assign(&cs.r1);
        right.slice_mut(ndarray::s![m..dim, m..dim]).assign(&cs.r2);
        left.dot(&envelope).dot(&dagger(&right))
    }

    #[test]
    fn decomposes_and_reconstructs_a_random_unitary() {
        let u = random_unitary(4, 7);
        let cs = cs_decompose(&u, 0).unwrap();
        assert!(is_unitary(&cs.l1, 1e-8));
        assert!(is_unitary(&cs.l2, 1e-8));
        assert!(is_unitary(&cs.r1, 1e-8));
        assert!(is_unitary(&cs.r2, 1e-8));
        let reconstructed = reconstruct(&cs);
        for (a, b) in reconstructed.iter().zip(u.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-7);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-7);
        }
    }

    #[test]
    fn decomposes_identity_with_zero_angles() {
        let id = Array2::<Complex64>::eye(4);
        let cs = cs_decompose(&id, 0).unwrap();
        for &theta in cs.theta.iter() {
            assert_abs_diff_eq!(theta, 0.0, epsilon = 1e-8);
        }
    }
}
