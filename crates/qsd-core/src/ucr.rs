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

//! The uniformly-controlled rotation (multiplexor) kernel: the
//! angle-tree transform and the CNOT/CZ-interleaved emission it feeds.

use crate::circuit::{Circuit, Gate};
use crate::config::QsdConfig;

/// Entangling basis a uniformly-controlled rotation is realized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entangler {
    /// Plain UCRY/UCRZ: CNOT between rotations.
    Cx,
    /// A.1 variant: CZ between rotations, with the final entangler omitted
    /// by the caller so it can be merged into the next block.
    Cz,
}

/// In-place half-butterfly angle transform.
///
/// `negate_second_half` mirrors the source's sign-convention flag, used
/// when the caller intends to merge a trailing entangler with an adjacent
/// block (the A.1 substitution in the central rotation of the QSD driver).
pub fn transform_angles(angles: &mut [f64], negate_second_half: bool) {
    let n = angles.len();
    debug_assert!(n.is_power_of_two());
    if n == 1 {
        return;
    }
    let half = n / 2;
    transform_angles(&mut angles[..half], false);
    transform_angles(&mut angles[half..], negate_second_half);
    for i in 0..half {
        let a = angles[i];
        let b = angles[half + i];
        angles[i] = (a + b) / 2.0;
        angles[half + i] = (a - b) / 2.0;
    }
}

/// Position of the least-significant zero bit of `value` (equivalently,
/// bits-until-trailing-zero), used to pick the control index for step `i`
/// of the UCR emission (`c(i)` for `value = i + 1`).
///
/// This is the standard binary-reflected Gray code bit-flip position
/// between consecutive indices `i` and `i + 1`: `value.trailing_zeros()`.
fn control_position(value: usize) -> u32 {
    value.trailing_zeros()
}

/// Emit the rotation/entangler-interleaved realization of a
/// uniformly-controlled Pauli rotation after [`transform_angles`] has
/// already been applied.
///
/// `rotate` builds the plain rotation gate for a given angle and the
/// target qubit (`Gate::Ry` for UCRY, `Gate::Rz` for UCRZ). The final
/// entangler (`i == angles.len() - 1`) is omitted when `omit_last` is set,
/// matching the convention that a caller intending to merge the trailing
/// entangler with the next block omits it here.
#[allow(clippy::too_many_arguments)]
pub fn emit_ucr<C: Circuit>(
    circuit: &mut C,
    angles: &[f64],
    controls: &[usize],
    target: usize,
    entangler: Entangler,
    omit_last: bool,
    rotate: impl Fn(f64, usize) -> Gate,
    cfg: &QsdConfig,
) {
    let k = controls.len();
    debug_assert_eq!(angles.len(), 1usize << k);
    let last = angles.len() - 1;
    for (i, &theta) in angles.iter().enumerate() {
        if theta.abs() > cfg.eps_angle {
            circuit.append(rotate(theta, target));
        }
        if i == last {
            if !omit_last {
                let control = controls[k - 1];
                circuit.append(make_entangler(entangler, control, target));
            }
            continue;
        }
        let c_index = control_position(i + 1) as usize;
        let control = controls[c_index];
        circuit.append(make_entangler(entangler, control, target));
    }
}

fn make_entangler(entangler: Entangler, control: usize, target: usize) -> Gate {
    match entangler {
        Entangler::Cx => Gate::Cx { control, target },
        Entangler::Cz => Gate::Cz { control, target },
    }
}
