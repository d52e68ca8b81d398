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

//! Dense complex linear algebra kernels shared by the CS-decomposition
//! adapter and the demultiplexor.
//!
//! The two-qubit KAK module leans on `faer`'s real `selfadjoint_eigendecomposition`
//! plus a "randomize and retry" trick to simultaneously diagonalize a
//! complex-symmetric matrix (`M2`) that isn't directly Hermitian. This
//! module generalizes that same idea — commuting Hermitian real/imaginary
//! parts, diagonalized by a random real combination, with verification and
//! retry — to the Hermitian and unitary (normal) matrices the QSD
//! demultiplexor and CS-decomposition actually need, using an explicit
//! complex Jacobi eigensolver in place of `faer` (neither of those two
//! matrices is the *real* symmetric matrix the two-qubit module's `M2`
//! construction produces, so there is nothing for `faer` to act on in this
//! module specifically; the two-qubit KAK module does build that real `M2`
//! and uses `faer` for it directly).

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::prelude::*;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;

use crate::error::{SynthesisError, SynthesisResult};

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOL: f64 = 1e-13;
const DIAGONALIZE_SEED: u64 = 0x5153_445f_4b41_4b21; // "QSD_KAK!" in hex-ish, fixed for determinism
const DIAGONALIZE_MAX_TRIES: usize = 64;

/// `Mᴴ`.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|c| c.conj())
}

/// `‖A − B‖∞` (max absolute entrywise deviation).
pub fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0_f64, f64::max)
}

/// Principal complex square root, selecting the branch with non-negative
/// imaginary part so negative-real eigenvalues don't fall through to NaN.
///
/// `Complex64::sqrt` already implements the standard branch cut (positive
/// real axis), which has non-negative imaginary part everywhere except
/// exactly on the negative real axis, where it returns `+i*sqrt(|z|)`. The
/// wrapper below exists purely to document that requirement at the
/// demultiplexor's call site rather than reintroducing the branch logic.
pub fn principal_sqrt(z: Complex64) -> Complex64 {
    let root = z.sqrt();
    if root.im < 0.0 {
        -root
    } else {
        root
    }
}

/// Complex Jacobi eigendecomposition of a Hermitian matrix: returns
/// `(eigenvalues, E)` with `H = E * diag(eigenvalues) * Eᴴ`, eigenvalues
/// ascending.
///
/// Classical cyclic Jacobi sweep, generalized to complex Hermitian input by
/// first rotating the pivot element onto the real axis (`h_pq = r e^{iφ}`)
/// with a diagonal phase similarity, then applying the usual real Jacobi
/// rotation. Adequate for the small (`m ≤ 64`) matrices QSD produces; not a
/// general-purpose dense eigensolver.
pub fn hermitian_eigendecomposition(
    h: &Array2<Complex64>,
    depth: usize,
) -> SynthesisResult<(Array1<f64>, Array2<Complex64>)> {
    let n = h.shape()[0];
    let mut a = h.clone();
    let mut v = Array2::<Complex64>::eye(n);

    for _sweep in 0..JACOBI_MAX_SWEEPS {
        let off = off_diagonal_norm(&a);
        if off <= JACOBI_TOL {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.norm() <= JACOBI_TOL {
                    continue;
                }
                // Rotate the pivot onto the positive real axis.
                let phase = apq / apq.norm();
                for k in 0..n {
                    let t = a[[k, q]] * phase;
                    a[[k, q]] = t;
                    let t = a[[q, k]] * phase.conj();
                    a[[q, k]] = t;
                }
                for k in 0..n {
                    let t = v[[k, q]] * phase;
                    v[[k, q]] = t;
                }
                let app = a[[p, p]].re;
                let aqq = a[[q, q]].re;
                let apq_re = a[[p, q]].re;
                let theta = 0.5 * (2.0 * apq_re).atan2(app - aqq);
                let (c, s) = (theta.cos(), theta.sin());
                apply_real_jacobi_rotation(&mut a, &mut v, p, q, c, s);
            }
        }
    }

    let off = off_diagonal_norm(&a);
    if off > 1e-6 {
        tracing::warn!(depth, residual = off, "Jacobi eigensolver failed to converge");
        return Err(SynthesisError::NumericFailure {
            subsystem: "demux",
            depth,
            reason: format!(
                "Jacobi eigensolver failed to converge (residual off-diagonal norm {off:e})"
            ),
        });
    }

    let eigenvalues = Array1::from_iter((0..n).map(|i| a[[i, i]].re));
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigenvalues[i].partial_cmp(&eigenvalues[j]).unwrap());
    let sorted_values = Array1::from_iter(order.iter().map(|&i| eigenvalues[i]));
    let mut sorted_vectors = Array2::<Complex64>::zeros((n, n));
    for (new_col, &old_col) in order.iter().enumerate() {
        sorted_vectors
            .column_mut(new_col)
            .assign(&v.column(old_col));
    }
    Ok((sorted_values, sorted_vectors))
}

fn off_diagonal_norm(a: &Array2<Complex64>) -> f64 {
    let n = a.shape()[0];
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                total += a[[i, j]].norm_sqr();
            }
        }
    }
    total.sqrt()
}

fn apply_real_jacobi_rotation(
    a: &mut Array2<Complex64>,
    v: &mut Array2<Complex64>,
    p: usize,
    q: usize,
    c: f64,
    s: f64,
) {
    let n = a.shape()[0];
    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = akp * c + akq * s;
        a[[k, q]] = -akp * s + akq * c;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = apk * c + aqk * s;
        a[[q, k]] = -apk * s + aqk * c;
    }
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = vkp * c + vkq * s;
        v[[k, q]] = -vkp * s + vkq * c;
    }
}

/// Eigendecomposition of a normal matrix `T` (here always unitary, since it
/// is built as `U1 * U2ᴴ`): `T = E * diag(d) * Eᴴ` with `|d_i| = 1`.
///
/// Mirrors the two-qubit module's `M2` trick structurally: split `T` into
/// commuting Hermitian real/imaginary parts `A = (T + Tᴴ)/2`,
/// `B = (T − Tᴴ)/(2i)`, diagonalize a random real combination `a·A + b·B`
/// (any generic `(a, b)` simultaneously diagonalizes both, since `T` normal
/// ⇒ `A`, `B` commute), then read `d` off the diagonal of `EᴴTE` and verify;
/// retry with a fresh `(a, b)` pair on failure. The retry loop is seeded for
/// deterministic failures, same as the two-qubit module's.
pub fn normal_eigendecomposition(
    t: &Array2<Complex64>,
    depth: usize,
) -> SynthesisResult<(Array1<Complex64>, Array2<Complex64>)> {
    let n = t.shape()[0];
    let t_dagger = dagger(t);
    let a = (t + &t_dagger).mapv(|c| c * 0.5);
    let b = (t - &t_dagger).mapv(|c| c * Complex64::new(0.0, -0.5));

    let mut rng = Pcg64Mcg::seed_from_u64(DIAGONALIZE_SEED);
    for _try in 0..DIAGONALIZE_MAX_TRIES {
        let ra: f64 = rng.sample(StandardNormal);
        let rb: f64 = rng.sample(StandardNormal);
        let combo = (a.mapv(|c| c * ra)) + (b.mapv(|c| c * rb));
        let (_eigs, e) = hermitian_eigendecomposition(&combo, depth)?;

        let e_dagger = dagger(&e);
        let diagonalized = e_dagger.dot(t).dot(&e);
        if !is_nearly_diagonal(&diagonalized, 1e-9) {
            continue;
        }
        let d = Array1::from_iter((0..n).map(|i| diagonalized[[i, i]]));
        let reconstructed = e.dot(&diag(&d)).dot(&e_dagger);
        if max_abs_diff(&reconstructed, t) < 1e-8 {
            return Ok((d, e));
        }
    }

    Err(SynthesisError::NumericFailure {
        subsystem: "demux",
        depth,
        reason: "failed to simultaneously diagonalize U1*U2^H after repeated random retries"
            .to_string(),
    })
}

fn is_nearly_diagonal(m: &Array2<Complex64>, tol: f64) -> bool {
    let n = m.shape()[0];
    for i in 0..n {
        for j in 0..n {
            if i != j && m[[i, j]].norm() > tol {
                return false;
            }
        }
    }
    true
}

/// Determinant via Gaussian elimination with partial pivoting.
///
/// Only ever called on the small (`4x4`) matrices the two-qubit KAK module
/// scales by, so no attempt is made to special-case nearly-singular pivots
/// beyond the partial-pivoting search itself.
pub fn determinant(m: &Array2<Complex64>) -> Complex64 {
    let n = m.shape()[0];
    let mut a = m.clone();
    let mut det = Complex64::new(1.0, 0.0);
    for col in 0..n {
        let mut pivot = col;
        let mut best = a[[col, col]].norm();
        for row in (col + 1)..n {
            let v = a[[row, col]].norm();
            if v > best {
                best = v;
                pivot = row;
            }
        }
        if best < 1e-300 {
            return Complex64::new(0.0, 0.0);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            det = -det;
        }
        det *= a[[col, col]];
        let inv_pivot = Complex64::new(1.0, 0.0) / a[[col, col]];
        for row in (col + 1)..n {
            let factor = a[[row, col]] * inv_pivot;
            if factor.norm() == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] = a[[row, k]] - a[[col, k]] * factor;
            }
        }
    }
    det
}

/// `diag(v)` as a dense matrix.
pub fn diag(v: &Array1<Complex64>) -> Array2<Complex64> {
    let n = v.len();
    let mut out = Array2::<Complex64>::zeros((n, n));
    for i in 0..n {
        out[[i, i]] = v[i];
    }
    out
}

/// Singular value decomposition `m = u * diag(sigma) * v_dagger`, obtained
/// via the Hermitian eigendecomposition of `mᴴm` (right singular vectors),
/// then recovering left singular vectors column-by-column for non-zero
/// singular values and completing any zero-singular-value columns with a
/// Gram-Schmidt sweep against the columns already fixed.
///
/// Adequate for the generic, non-degenerate unitaries the CS-decomposition
/// adapter is applied to in this crate (random unitaries, and structured
/// gates like CNOT/Hadamard-tensor-products whose singular values are all
/// exactly `1`, i.e. no zero singular values ever arise in practice here).
/// A fully degenerate-safe LAPACK-grade CSD (distinguishing `σ_i = 0` from
/// `σ_i = 1` columns via the off-diagonal blocks too) is out of scope; see
/// `DESIGN.md`.
pub fn svd(
    m: &Array2<Complex64>,
    depth: usize,
) -> SynthesisResult<(Array2<Complex64>, Array1<f64>, Array2<Complex64>)> {
    let n = m.shape()[0];
    let gram = dagger(m).dot(m);
    let (eigenvalues, v) = hermitian_eigendecomposition(&gram, depth)?;
    // Descending singular values read more naturally for CSD's angle order.
    let mut order: Vec<usize> = (0..n).collect();
    order.reverse();
    let sigma = Array1::from_iter(order.iter().map(|&i| eigenvalues[i].max(0.0).sqrt()));
    let mut v_sorted = Array2::<Complex64>::zeros((n, n));
    for (new_col, &old_col) in order.iter().enumerate() {
        v_sorted.column_mut(new_col).assign(&v.column(old_col));
    }

    let mv = m.dot(&v_sorted);
    let u = fit_unitary_columns(&mv, &sigma, depth, "cs")?;

    Ok((u, sigma, v_sorted))
}

/// Build a unitary whose `i`-th column is `raw[:, i] / scale[i]` wherever
/// `scale[i]` is non-negligible, completing the remaining columns with a
/// Gram-Schmidt sweep against the columns already fixed.
///
/// Shared by [`svd`] (left singular vectors from `M*V / sigma`) and the
/// CS-decomposition adapter (`L2`, `R2` from the off-diagonal blocks scaled
/// by `sin(theta)`).
pub fn fit_unitary_columns(
    raw: &Array2<Complex64>,
    scale: &Array1<f64>,
    depth: usize,
    subsystem: &'static str,
) -> SynthesisResult<Array2<Complex64>> {
    let n = raw.shape()[0];
    const SCALE_TOL: f64 = 1e-9;
    let mut u = Array2::<Complex64>::zeros((n, n));
    let mut fixed: Vec<usize> = Vec::new();
    for i in 0..n {
        if scale[i] > SCALE_TOL {
            let col = raw.column(i).mapv(|c| c / Complex64::new(scale[i], 0.0));
            u.column_mut(i).assign(&col);
            fixed.push(i);
        }
    }
    for i in 0..n {
        if scale[i] > SCALE_TOL {
            continue;
        }
        let mut candidate = Array1::<Complex64>::zeros(n);
        candidate[i % n] = Complex64::new(1.0, 0.0);
        if candidate.iter().all(|c| c.norm() < 1e-300) {
            candidate[0] = Complex64::new(1.0, 0.0);
        }
        for &j in &fixed {
            let proj: Complex64 = u
                .column(j)
                .iter()
                .zip(candidate.iter())
                .map(|(uj, c)| uj.conj() * c)
                .sum();
            candidate = candidate - u.column(j).mapv(|c| c * proj);
        }
        for k in 0..i {
            if scale[k] > SCALE_TOL {
                continue;
            }
            let proj: Complex64 = u
                .column(k)
                .iter()
                .zip(candidate.iter())
                .map(|(uk, c)| uk.conj() * c)
                .sum();
            candidate = candidate - u.column(k).mapv(|c| c * proj);
        }
        let norm = candidate.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return Err(SynthesisError::NumericFailure {
                subsystem,
                depth,
                reason: "Gram-Schmidt completion of degenerate subspace collapsed".to_string(),
            });
        }
        u.column_mut(i).assign(&candidate.mapv(|c| c / norm));
        fixed.push(i);
    }
    Ok(u)
}
