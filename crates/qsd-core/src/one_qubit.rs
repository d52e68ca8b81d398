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

//! Closed-form ZYZ / U3 one-qubit decomposition.

use ndarray::Array2;
use num_complex::Complex64;

use crate::circuit::{Circuit, Gate};
use crate::config::{OneQubitBasis, QsdConfig};
use crate::error::{SynthesisError, SynthesisResult};

/// `apply_unitary` for a 2x2 unitary: emits the ZYZ or U3 closed form on
/// `qubit`, per `cfg.one_qubit_basis`.
///
/// Requires exactly one qubit index (`InvalidOperand`) and a 2x2 matrix
/// (`ShapeMismatch`).
pub fn apply_unitary<C: Circuit>(
    circuit: &mut C,
    unitary: &Array2<Complex64>,
    qubits: &[usize],
    cfg: &QsdConfig,
) -> SynthesisResult<()> {
    if qubits.len() != 1 {
        return Err(SynthesisError::InvalidOperand {
            reason: format!(
                "one-qubit decomposition requires exactly one qubit index, got {}",
                qubits.len()
            ),
        });
    }
    let (rows, cols) = (unitary.shape()[0], unitary.shape()[1]);
    if rows != 2 || cols != 2 {
        return Err(SynthesisError::ShapeMismatch {
            expected: "2x2".to_string(),
            rows,
            cols,
        });
    }

    let params = zyz_parameters(unitary);
    let qubit = qubits[0];
    match cfg.one_qubit_basis {
        OneQubitBasis::Zyz => {
            if params.lambda.abs() > cfg.eps_angle {
                circuit.append(Gate::Rz {
                    theta: params.lambda,
                    qubit,
                });
            }
            if params.theta.abs() > cfg.eps_angle {
                circuit.append(Gate::Ry {
                    theta: params.theta,
                    qubit,
                });
            }
            if params.phi.abs() > cfg.eps_angle {
                circuit.append(Gate::Rz {
                    theta: params.phi,
                    qubit,
                });
            }
            if params.alpha.abs() > cfg.eps_angle {
                circuit.append(Gate::GlobalPhase { alpha: params.alpha });
            }
        }
        OneQubitBasis::U3 => {
            circuit.append(Gate::U3 {
                theta: params.theta,
                phi: params.phi,
                lambda: params.lambda,
                qubit,
            });
            let alpha = params.alpha - (params.phi + params.lambda) / 2.0;
            if alpha.abs() > cfg.eps_angle {
                circuit.append(Gate::GlobalPhase { alpha });
            }
        }
    }
    Ok(())
}

/// The four ZYZ parameters `(theta, phi, lambda, alpha)` extracted from a
/// 2x2 unitary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZyzParameters {
    pub theta: f64,
    pub phi: f64,
    pub lambda: f64,
    pub alpha: f64,
}

/// Closed-form ZYZ parameter extraction, independent of
/// which basis the caller eventually emits gates in.
pub fn zyz_parameters(unitary: &Array2<Complex64>) -> ZyzParameters {
    let det = unitary[[0, 0]] * unitary[[1, 1]] - unitary[[0, 1]] * unitary[[1, 0]];
    let c = det.powf(-0.5);
    let alpha = -c.arg();
    let v = unitary.mapv(|x| x * c);

    let theta = 2.0 * v[[1, 0]].norm().atan2(v[[0, 0]].norm());
    let s = 2.0 * v[[1, 1]].arg();
    let d = 2.0 * v[[1, 0]].arg();
    let phi = (s + d) / 2.0;
    let lambda = (s - d) / 2.0;

    ZyzParameters {
        theta,
        phi,
        lambda,
        alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DenseCircuit;
    use crate::predicates::is_unitary;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn hadamard() -> Array2<Complex64> {
        let s = FRAC_1_SQRT_2;
        array![
            [Complex64::new(s, 0.0), Complex64::new(s, 0.0)],
            [Complex64::new(s, 0.0), Complex64::new(-s, 0.0)],
        ]
    }

    #[test]
    fn hadamard_zyz_angles_match_spec_scenario() {
        // Hadamard: (lambda, theta, phi) = (0, pi/2, pi) up to
        // equivalence.
        let params = zyz_parameters(&hadamard());
        assert_abs_diff_eq!(params.lambda.rem_euclid(2.0 * PI), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(params.theta, PI / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(params.phi.rem_euclid(2.0 * PI), PI, epsilon = 1e-9);
    }

    #[test]
    fn hadamard_u3_reconstructs_exactly_up_to_phase() {
        let cfg = QsdConfig {
            one_qubit_basis: OneQubitBasis::U3,
            ..QsdConfig::default()
        };
        let mut circuit = DenseCircuit::new();
        apply_unitary(&mut circuit, &hadamard(), &[0], &cfg).unwrap();
        let synthesized = circuit.get_unitary(1);
        assert_reconstructs_up_to_phase(&synthesized, &hadamard());
    }

    #[test]
    fn hadamard_zyz_reconstructs_exactly_up_to_phase() {
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        apply_unitary(&mut circuit, &hadamard(), &[0], &cfg).unwrap();
        let synthesized = circuit.get_unitary(1);
        assert_reconstructs_up_to_phase(&synthesized, &hadamard());
    }

    #[test]
    fn rejects_wrong_qubit_count() {
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        let err = apply_unitary(&mut circuit, &hadamard(), &[0, 1], &cfg).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidOperand { .. }));
    }

    #[test]
    fn rejects_wrong_shape() {
        let cfg = QsdConfig::default();
        let mut circuit = DenseCircuit::new();
        let identity3: Array2<Complex64> = Array2::eye(4);
        let err = apply_unitary(&mut circuit, &identity3, &[0], &cfg).unwrap_err();
        assert!(matches!(err, SynthesisError::ShapeMismatch { .. }));
    }

    fn assert_reconstructs_up_to_phase(synthesized: &Array2<Complex64>, target: &Array2<Complex64>) {
        assert!(is_unitary(synthesized, 1e-9));
        // Find the global phase from the first nonzero entry, then compare.
        let mut phase = Complex64::new(1.0, 0.0);
        for (a, b) in synthesized.iter().zip(target.iter()) {
            if a.norm() > 1e-6 {
                phase = b / a;
                break;
            }
        }
        for (a, b) in synthesized.iter().zip(target.iter()) {
            let scaled = a * phase;
            assert_abs_diff_eq!(scaled.re, b.re, epsilon = 1e-8);
            assert_abs_diff_eq!(scaled.im, b.im, epsilon = 1e-8);
        }
    }
}
