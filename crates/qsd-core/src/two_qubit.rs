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

//! Two-qubit KAK/Weyl decomposition: `U = (K1l⊗K1r) · N(a,b,c) ·
//! (K2l⊗K2r)`, where `N(a,b,c) = exp(i(a·XX + b·YY + c·ZZ))` is the
//! canonical interaction and `K1l, K1r, K2l, K2r` are one-qubit unitaries.
//!
//! Uses the magic-basis transform, the complex-symmetric `M2 = u_pᵀ u_p`
//! construction, and the "diagonalize a random real combination of
//! `Re(M2)`/`Im(M2)` and retry" trick common to KAK implementations (here
//! using `faer`'s `selfadjoint_eigendecomposition` — the one place in this
//! crate a *real* symmetric matrix of the shape `faer` wants actually
//! arises), plus a `decompose_two_qubit_product_gate` step used to split a
//! matrix already known to be of product form.
//!
//! Two deliberate simplifications, recorded in `DESIGN.md`:
//!
//! - A full KAK implementation folds `(a, b, c)` into the fundamental Weyl
//!   chamber and then dispatches to one of several named-gate
//!   specializations (shaving CNOTs for e.g. `SWAP`-like or controlled
//!   gates). That folding is a correctness-preserving rewrite of an already
//!   valid decomposition, not a precondition for one, so this module
//!   stops at the unfolded, general-case `(a, b, c)` and emits the
//!   canonical interaction directly, at the cost of not recognizing special
//!   gates.
//! - Because the declared gate set has no native `RXX`/`RYY`/`RZZ`, `N`
//!   is realized as three independent `CX`-sandwiches (`exp(-iθ/2 ZZ) =
//!   CX·RZ(θ)·CX`, with `XX`/`YY` obtained by conjugating that same
//!   sandwich with a local basis change — `H` for `XX`, `S·H` for `YY`,
//!   using `H = U3(π/2, 0, π)` exactly) rather than the literature's
//!   interleaved 3-CNOT circuit. This costs up to 6 CNOTs instead of 3 for
//!   a generic interaction; see `DESIGN.md` for the tradeoff.

use std::f64::consts::FRAC_PI_2;

use faer::IntoNdarray;
use faer::Mat;
use faer::Side::Lower;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::prelude::*;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;

use crate::circuit::{Circuit, Gate};
use crate::config::QsdConfig;
use crate::error::{SynthesisError, SynthesisResult};
use crate::linalg::{dagger, determinant, max_abs_diff};
use crate::one_qubit::{self, ZyzParameters};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;
const TWO_QUBIT_SEED: u64 = 0x4b41_4b5f_5357_4c21; // "KAK_SWL!" in hex-ish
const DIAGONALIZE_MAX_TRIES: usize = 100;
const RECONSTRUCTION_TOLERANCE: f64 = 1e-6;

/// The result of decomposing an arbitrary `4x4` unitary into local
/// unitaries around a canonical two-qubit interaction.
#[derive(Debug, Clone)]
pub struct TwoQubitWeylDecomposition {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub global_phase: f64,
    pub k1l: Array2<Complex64>,
    pub k1r: Array2<Complex64>,
    pub k2l: Array2<Complex64>,
    pub k2r: Array2<Complex64>,
}

impl TwoQubitWeylDecomposition {
    /// Compute `U = (K1l⊗K1r) · N(a, b, c) · (K2l⊗K2r)` up to `global_phase`,
    /// with `K1r`/`K2r` acting on the first listed qubit and `K1l`/`K2l` on
    /// the second (the "last qubit is most significant" convention used
    /// throughout this crate, specialized to the two-qubit case).
    pub fn new(u: &Array2<Complex64>, depth: usize) -> SynthesisResult<Self> {
        let det_u = determinant(u);
        let scale = det_u.powf(-0.25);
        let u_scaled = u.mapv(|x| x * scale);
        let mut global_phase = det_u.arg() / 4.0;

        let u_p = transform_from_magic_basis(&u_scaled, true);
        let m2 = u_p.t().to_owned().dot(&u_p);

        let (p, d) = diagonalize_m2(&m2, depth)?;
        let (p, d) = order_and_orient(p, d);

        let cs: Vec<f64> = (0..3).map(|i| ((d[i] + d[3]) / 2.0).rem_euclid(TWO_PI)).collect();

        let mut temp = Array2::<Complex64>::zeros((4, 4));
        for k in 0..4 {
            temp[[k, k]] = Complex64::new(0.0, d[k]).exp();
        }
        let k1_full = transform_from_magic_basis(&u_p.dot(&p).dot(&temp), false);
        let k2_full = transform_from_magic_basis(&p.t().to_owned(), false);

        let (k1l, k1r, phase_l) = decompose_two_qubit_product_gate(&k1_full, depth)?;
        let (k2l, k2r, phase_r) = decompose_two_qubit_product_gate(&k2_full, depth)?;
        global_phase += phase_l + phase_r;

        let (a, b, c) = (cs[1], cs[0], cs[2]);

        let decomposition = TwoQubitWeylDecomposition {
            a,
            b,
            c,
            global_phase,
            k1l,
            k1r,
            k2l,
            k2r,
        };
        decomposition.verify_reconstruction(&u_scaled, depth)?;
        Ok(decomposition)
    }

    fn verify_reconstruction(&self, u_scaled: &Array2<Complex64>, depth: usize) -> SynthesisResult<()> {
        let local = ndarray::linalg::kron(&self.k1l, &self.k1r)
            .dot(&canonical_matrix(self.a, self.b, self.c))
            .dot(&ndarray::linalg::kron(&self.k2l, &self.k2r));
        let phase = Complex64::new(0.0, self.global_phase).exp();
        let reconstructed = local.mapv(|x| x * phase);
        let deviation = max_abs_diff(&reconstructed, u_scaled);
        if deviation > RECONSTRUCTION_TOLERANCE {
            return Err(SynthesisError::NumericFailure {
                subsystem: "kak",
                depth,
                reason: format!(
                    "two-qubit KAK reconstruction deviates from input by {deviation:e}"
                ),
            });
        }
        Ok(())
    }

    /// Emit the full circuit realizing this decomposition on `qubits`
    /// (`qubits[0]` gets `K1r`/`K2r`, `qubits[1]` gets `K1l`/`K2l`).
    fn emit<C: Circuit>(&self, circuit: &mut C, qubits: &[usize], cfg: &QsdConfig) -> SynthesisResult<()> {
        one_qubit::apply_unitary(circuit, &self.k2r, &qubits[0..1], cfg)?;
        one_qubit::apply_unitary(circuit, &self.k2l, &qubits[1..2], cfg)?;
        emit_xx_sandwich(circuit, qubits[0], qubits[1], -2.0 * self.a, cfg);
        emit_yy_sandwich(circuit, qubits[0], qubits[1], -2.0 * self.b, cfg);
        emit_zz_sandwich(circuit, qubits[0], qubits[1], -2.0 * self.c, cfg);
        one_qubit::apply_unitary(circuit, &self.k1r, &qubits[0..1], cfg)?;
        one_qubit::apply_unitary(circuit, &self.k1l, &qubits[1..2], cfg)?;
        if self.global_phase.abs() > cfg.eps_angle {
            circuit.append(Gate::GlobalPhase {
                alpha: self.global_phase,
            });
        }
        Ok(())
    }
}

/// Validate the shared `(qubits, unitary)` contract for the two functions
/// below: exactly two qubit indices, a `4x4` matrix.
fn validate(u: &Array2<Complex64>, qubits: &[usize]) -> SynthesisResult<()> {
    if qubits.len() != 2 {
        return Err(SynthesisError::InvalidOperand {
            reason: format!(
                "two-qubit decomposition requires exactly two qubit indices, got {}",
                qubits.len()
            ),
        });
    }
    let (rows, cols) = (u.shape()[0], u.shape()[1]);
    if rows != 4 || cols != 4 {
        return Err(SynthesisError::ShapeMismatch {
            expected: "4x4".to_string(),
            rows,
            cols,
        });
    }
    Ok(())
}

/// Emit the full decomposition of `u` on `qubits`.
pub fn prepare_unitary<C: Circuit>(
    circuit: &mut C,
    u: &Array2<Complex64>,
    qubits: &[usize],
    depth: usize,
    cfg: &QsdConfig,
) -> SynthesisResult<()> {
    validate(u, qubits)?;
    TwoQubitWeylDecomposition::new(u, depth)?.emit(circuit, qubits, cfg)
}

/// Emit all of `u`'s decomposition except the trailing one-qubit diagonal
/// factor on each wire, returning that factor as a dense `4x4` diagonal `D`
/// (local basis, `qubits[0]` least significant) such that the emitted
/// circuit realizes `u · D⁻¹`.
///
/// The peeled factor is exactly the outer `RZ(phi)` of each wire's closing
/// ZYZ rotation (ZYZ is used here regardless of `cfg.one_qubit_basis`,
/// since it is the form that exposes a diagonal trailing gate to peel). The
/// A.2 post-pass absorbs `D` into the next leaf's own `prepare_unitary`
/// call, where it folds into that leaf's own closing `RZ(lambda)` at zero
/// extra gate cost.
pub fn apply_unitary_up_to_diagonal<C: Circuit>(
    circuit: &mut C,
    u: &Array2<Complex64>,
    qubits: &[usize],
    depth: usize,
    cfg: &QsdConfig,
) -> SynthesisResult<Array2<Complex64>> {
    validate(u, qubits)?;
    let decomp = TwoQubitWeylDecomposition::new(u, depth)?;

    one_qubit::apply_unitary(circuit, &decomp.k2r, &qubits[0..1], cfg)?;
    one_qubit::apply_unitary(circuit, &decomp.k2l, &qubits[1..2], cfg)?;
    emit_xx_sandwich(circuit, qubits[0], qubits[1], -2.0 * decomp.a, cfg);
    emit_yy_sandwich(circuit, qubits[0], qubits[1], -2.0 * decomp.b, cfg);
    emit_zz_sandwich(circuit, qubits[0], qubits[1], -2.0 * decomp.c, cfg);

    let params_r = one_qubit::zyz_parameters(&decomp.k1r);
    let params_l = one_qubit::zyz_parameters(&decomp.k1l);
    emit_zyz_prefix(circuit, qubits[0], &params_r, cfg);
    emit_zyz_prefix(circuit, qubits[1], &params_l, cfg);
    if decomp.global_phase.abs() > cfg.eps_angle {
        circuit.append(Gate::GlobalPhase {
            alpha: decomp.global_phase,
        });
    }

    Ok(diagonal_local_d(params_r.phi, params_l.phi))
}

/// `RZ(lambda), RY(theta), GlobalPhase(alpha)` — a closing ZYZ rotation
/// with the trailing `RZ(phi)` withheld (it becomes part of the returned
/// diagonal in [`apply_unitary_up_to_diagonal`]).
fn emit_zyz_prefix<C: Circuit>(circuit: &mut C, qubit: usize, p: &ZyzParameters, cfg: &QsdConfig) {
    if p.lambda.abs() > cfg.eps_angle {
        circuit.append(Gate::Rz {
            theta: p.lambda,
            qubit,
        });
    }
    if p.theta.abs() > cfg.eps_angle {
        circuit.append(Gate::Ry {
            theta: p.theta,
            qubit,
        });
    }
    if p.alpha.abs() > cfg.eps_angle {
        circuit.append(Gate::GlobalPhase { alpha: p.alpha });
    }
}

/// `RZ(phi_r) ⊗ RZ(phi_l)` as a dense local `4x4` diagonal, `wire_r`
/// (`qubits[0]`) least significant.
fn diagonal_local_d(phi_r: f64, phi_l: f64) -> Array2<Complex64> {
    ndarray::linalg::kron(&qsd_gatematrix::rz_matrix(phi_l), &qsd_gatematrix::rz_matrix(phi_r))
}

/// `exp(i(a·XX + b·YY + c·ZZ))`, built independently of the circuit
/// construction below (via direct eigen-exponentiation of the Hermitian
/// generator) so it can serve as a ground-truth cross-check in
/// [`TwoQubitWeylDecomposition::verify_reconstruction`].
fn canonical_matrix(a: f64, b: f64, c: f64) -> Array2<Complex64> {
    use qsd_gatematrix::{x_matrix, y_matrix, z_matrix};
    let xx = ndarray::linalg::kron(&x_matrix(), &x_matrix());
    let yy = ndarray::linalg::kron(&y_matrix(), &y_matrix());
    let zz = ndarray::linalg::kron(&z_matrix(), &z_matrix());
    let h = xx.mapv(|v| v * a) + yy.mapv(|v| v * b) + zz.mapv(|v| v * c);
    let (eigs, v) = crate::linalg::hermitian_eigendecomposition(&h, 0)
        .expect("a·XX + b·YY + c·ZZ is exactly Hermitian by construction");
    let exp_diag = crate::linalg::diag(&eigs.mapv(|e| Complex64::new(0.0, e).exp()));
    v.dot(&exp_diag).dot(&dagger(&v))
}

fn emit_h<C: Circuit>(circuit: &mut C, qubit: usize) {
    circuit.append(Gate::U3 {
        theta: FRAC_PI_2,
        phi: 0.0,
        lambda: std::f64::consts::PI,
        qubit,
    });
}

fn emit_s<C: Circuit>(circuit: &mut C, qubit: usize) {
    circuit.append(Gate::Rz {
        theta: FRAC_PI_2,
        qubit,
    });
}

fn emit_sdg<C: Circuit>(circuit: &mut C, qubit: usize) {
    circuit.append(Gate::Rz {
        theta: -FRAC_PI_2,
        qubit,
    });
}

/// `exp(-i theta/2 · ZZ)`, via `CX(a,b); RZ(theta, b); CX(a,b)`.
fn emit_zz_sandwich<C: Circuit>(circuit: &mut C, a: usize, b: usize, theta: f64, cfg: &QsdConfig) {
    if theta.abs() <= cfg.eps_angle {
        return;
    }
    circuit.append(Gate::Cx { control: a, target: b });
    circuit.append(Gate::Rz { theta, qubit: b });
    circuit.append(Gate::Cx { control: a, target: b });
}

/// `exp(-i theta/2 · XX)`, via an `H`-conjugated `ZZ` sandwich (`H Z H = X`
/// exactly, so conjugating the whole `ZZ` block by `H` on both wires gives
/// the `XX` block).
fn emit_xx_sandwich<C: Circuit>(circuit: &mut C, a: usize, b: usize, theta: f64, cfg: &QsdConfig) {
    if theta.abs() <= cfg.eps_angle {
        return;
    }
    emit_h(circuit, a);
    emit_h(circuit, b);
    emit_zz_sandwich_unconditional(circuit, a, b, theta);
    emit_h(circuit, a);
    emit_h(circuit, b);
}

/// `exp(-i theta/2 · YY)`, via an `S·H`-conjugated `ZZ` sandwich (`(SH) Z
/// (SH)† = Y` exactly: `H Z H = X`, `S X S† = Y`). The two wires' `S`/`S†`
/// global phases (`+pi/4` before, `-pi/4` after) cancel exactly, so no
/// `GlobalPhase` bookkeeping is needed for this sandwich.
fn emit_yy_sandwich<C: Circuit>(circuit: &mut C, a: usize, b: usize, theta: f64, cfg: &QsdConfig) {
    if theta.abs() <= cfg.eps_angle {
        return;
    }
    emit_h(circuit, a);
    emit_s(circuit, a);
    emit_h(circuit, b);
    emit_s(circuit, b);
    emit_zz_sandwich_unconditional(circuit, a, b, theta);
    emit_sdg(circuit, a);
    emit_h(circuit, a);
    emit_sdg(circuit, b);
    emit_h(circuit, b);
}

fn emit_zz_sandwich_unconditional<C: Circuit>(circuit: &mut C, a: usize, b: usize, theta: f64) {
    circuit.append(Gate::Cx { control: a, target: b });
    circuit.append(Gate::Rz { theta, qubit: b });
    circuit.append(Gate::Cx { control: a, target: b });
}

/// The magic-basis change of basis, bridging the computational basis and
/// the basis in which `SU(2)⊗SU(2)` acts as real orthogonal matrices.
fn transform_from_magic_basis(u: &Array2<Complex64>, reverse: bool) -> Array2<Complex64> {
    let i = Complex64::new(0.0, 1.0);
    let o = Complex64::new(1.0, 0.0);
    let z = Complex64::new(0.0, 0.0);
    let b = ndarray::array![
        [o, i, z, z],
        [z, z, i, o],
        [z, z, i, -o],
        [o, -i, z, z],
    ];
    let b_dagger = dagger(&b).mapv(|x| x * 0.5);
    if reverse {
        b_dagger.dot(u).dot(&b)
    } else {
        b.dot(u).dot(&b_dagger)
    }
}

/// Split a `4x4` unitary already known to be (up to scale) a product
/// `L ⊗ R` of two one-qubit unitaries into `(l, r, phase)` with
/// `u ≈ e^{i·phase} · (l ⊗ r)`.
///
/// `u`'s top-left `2x2` block is `r` scaled by some factor whose square is
/// `det(r)`; that block can vanish (e.g. when `r` itself is close to `X`),
/// so the bottom-left block is used instead whenever the top-left's
/// determinant magnitude is too small. `l` is then recovered by dividing
/// `u` through by `I ⊗ r†` and reading off every second row/column.
fn decompose_two_qubit_product_gate(
    u: &Array2<Complex64>,
    depth: usize,
) -> SynthesisResult<(Array2<Complex64>, Array2<Complex64>, f64)> {
    let mut r = u.slice(ndarray::s![0..2, 0..2]).to_owned();
    let mut det_r = determinant(&r);
    if det_r.norm() < 0.1 {
        r = u.slice(ndarray::s![2..4, 0..2]).to_owned();
        det_r = determinant(&r);
    }
    if det_r.norm() < 1e-10 {
        return Err(SynthesisError::NumericFailure {
            subsystem: "kak",
            depth,
            reason: "two-qubit product-gate split found no well-conditioned 2x2 block".to_string(),
        });
    }
    r.mapv_inplace(|x| x / det_r.sqrt());

    let r_dagger = dagger(&r);
    let identity2 = Array2::<Complex64>::eye(2);
    let temp = u.dot(&ndarray::linalg::kron(&identity2, &r_dagger));

    let mut l = Array2::<Complex64>::zeros((2, 2));
    for i in 0..2 {
        for j in 0..2 {
            l[[i, j]] = temp[[2 * i, 2 * j]];
        }
    }
    let det_l = determinant(&l);
    if det_l.norm() < 1e-10 {
        return Err(SynthesisError::NumericFailure {
            subsystem: "kak",
            depth,
            reason: "two-qubit product-gate split produced a singular left factor".to_string(),
        });
    }
    l.mapv_inplace(|x| x / det_l.sqrt());
    let phase = det_l.arg() / 2.0;

    Ok((l, r, phase))
}

/// Diagonalize the complex-symmetric `M2 = u_pᵀ u_p` as `M2 = P D Pᵀ` with
/// `P` real-orthogonal, `D` diagonal with unit-magnitude entries.
///
/// `M2 = A + iB` for real-symmetric `A, B`; `M2ᴴM2 = I` forces `A, B` to
/// commute, hence they are simultaneously diagonalizable by some real
/// orthogonal `P`. A random real combination `ra·A + rb·B` is diagonalized
/// instead (generic `(ra, rb)` still diagonalizes both), with retries on a
/// fixed seed so any failure is deterministic.
fn diagonalize_m2(
    m2: &Array2<Complex64>,
    depth: usize,
) -> SynthesisResult<(Array2<Complex64>, Array1<Complex64>)> {
    let mut rng = Pcg64Mcg::seed_from_u64(TWO_QUBIT_SEED);
    for _ in 0..DIAGONALIZE_MAX_TRIES {
        let ra: f64 = rng.sample(StandardNormal);
        let rb: f64 = rng.sample(StandardNormal);
        let m2_real = Mat::<f64>::from_fn(4, 4, |i, j| ra * m2[[i, j]].re + rb * m2[[i, j]].im);
        let p_real: Array2<f64> = m2_real
            .selfadjoint_eigendecomposition(Lower)
            .u()
            .into_ndarray()
            .to_owned();
        let p = p_real.mapv(|x| Complex64::new(x, 0.0));

        let d_full = p.t().to_owned().dot(m2).dot(&p);
        let mut diag_d = Array2::<Complex64>::zeros((4, 4));
        for k in 0..4 {
            diag_d[[k, k]] = d_full[[k, k]];
        }
        let reconstructed = p.dot(&diag_d).dot(&p.t().to_owned());
        if max_abs_diff(&reconstructed, m2) < 1e-10 {
            let d = Array1::from_iter((0..4).map(|k| d_full[[k, k]]));
            return Ok((p, d));
        }
    }

    Err(SynthesisError::NumericFailure {
        subsystem: "kak",
        depth,
        reason: "failed to simultaneously diagonalize M2 after repeated random retries".to_string(),
    })
}

/// Order the three free eigenphases by how close their folded value sits
/// to the chamber boundary, then fix `P`'s orientation to `det = +1`.
///
/// This is the part of the "flip into Weyl chamber" step that is
/// load-bearing (it keeps `d[3]`'s dependent-phase convention and `P`'s
/// column order mutually consistent) rather than cosmetic; the subsequent
/// per-coordinate folding into `[0, pi/4]`, which isn't required for a
/// correct (if unfolded) decomposition, is the part this module skips.
fn order_and_orient(mut p: Array2<Complex64>, d: Array1<Complex64>) -> (Array2<Complex64>, Vec<f64>) {
    let mut angles: Vec<f64> = d.iter().map(|z| -z.arg() / 2.0).collect();
    angles[3] = -angles[0] - angles[1] - angles[2];

    let cs: Vec<f64> = (0..3)
        .map(|i| ((angles[i] + angles[3]) / 2.0).rem_euclid(TWO_PI))
        .collect();
    let folded: Vec<f64> = cs
        .iter()
        .map(|&x| {
            let m = x.rem_euclid(std::f64::consts::PI / 2.0);
            m.min(std::f64::consts::PI / 2.0 - m)
        })
        .collect();
    let mut order: Vec<usize> = (0..3).collect();
    order.sort_by(|&i, &j| folded[i].partial_cmp(&folded[j]).unwrap());
    order.rotate_left(1);

    let p_orig = p.clone();
    let d_orig = angles.clone();
    for (i, &src) in order.iter().enumerate() {
        p.column_mut(i).assign(&p_orig.column(src));
        angles[i] = d_orig[src];
    }

    if determinant(&p).re < 0.0 {
        let mut last = p.column_mut(3);
        last.mapv_inplace(|x| -x);
    }
    (p, angles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DenseCircuit;
    use crate::predicates::is_unitary;
    use approx::assert_abs_diff_eq;

    fn random_unitary(n: usize, seed: u64) -> Array2<Complex64> {
        use crate::linalg::svd;
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

    fn assert_reconstructs_up_to_phase(synthesized: &Array2<Complex64>, target: &Array2<Complex64>) {
        assert!(is_unitary(synthesized, 1e-6));
        let mut phase = Complex64::new(1.0, 0.0);
        for (a, b) in synthesized.iter().zip(target.iter()) {
            if a.norm() > 1e-6 {
                phase = b / a;
                break;
            }
        }
        for (a, b) in synthesized.iter().zip(target.iter()) {
            let scaled = a * phase;
            assert_abs_diff_eq!(scaled.re, b.re, epsilon = 1e-5);
            assert_abs_diff_eq!(scaled.im, b.im, epsilon = 1e-5);
        }
    }

    #[test]
    fn decomposes_and_reconstructs_a_random_unitary() {
        let u = random_unitary(4, 101);
        let decomp = TwoQubitWeylDecomposition::new(&u, 0).unwrap();
        let local = ndarray::linalg::kron(&decomp.k1l, &decomp.k1r)
            .dot(&canonical_matrix(decomp.a, decomp.b, decomp.c))
            .dot(&ndarray::linalg::kron(&decomp.k2l, &decomp.k2r));
        let phase = Complex64::new(0.0, decomp.global_phase).exp();
        let reconstructed = local.mapv(|x| x * phase);
        for (a, b) in reconstructed.iter().zip(u.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-6);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn prepare_unitary_emits_a_synthesizing_circuit() {
        let u = random_unitary(4, 202);
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        prepare_unitary(&mut circuit, &u, &[0, 1], 0, &cfg).unwrap();
        let synthesized = circuit.get_unitary(2);
        assert_reconstructs_up_to_phase(&synthesized, &u);
    }

    #[test]
    fn identity_decomposes_to_a_trivial_circuit() {
        let u = Array2::<Complex64>::eye(4);
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        prepare_unitary(&mut circuit, &u, &[0, 1], 0, &cfg).unwrap();
        let synthesized = circuit.get_unitary(2);
        assert_reconstructs_up_to_phase(&synthesized, &u);
    }

    #[test]
    fn apply_unitary_up_to_diagonal_times_diagonal_reconstructs_input() {
        let u = random_unitary(4, 303);
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        let d = apply_unitary_up_to_diagonal(&mut circuit, &u, &[0, 1], 0, &cfg).unwrap();
        assert!(is_diagonal_within(&d, 1e-9));
        let partial = circuit.get_unitary(2);
        let reconstructed = partial.dot(&d);
        assert_reconstructs_up_to_phase(&reconstructed, &u);
    }

    fn is_diagonal_within(m: &Array2<Complex64>, tol: f64) -> bool {
        for i in 0..m.shape()[0] {
            for j in 0..m.shape()[1] {
                if i != j && m[[i, j]].norm() > tol {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn rejects_wrong_qubit_count() {
        let u = Array2::<Complex64>::eye(4);
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        let err = prepare_unitary(&mut circuit, &u, &[0], 0, &cfg).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidOperand { .. }));
    }

    #[test]
    fn rejects_wrong_shape() {
        let u = Array2::<Complex64>::eye(2);
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        let err = prepare_unitary(&mut circuit, &u, &[0, 1], 0, &cfg).unwrap_err();
        assert!(matches!(err, SynthesisError::ShapeMismatch { .. }));
    }
}
