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

// Static gate matrices, built as owned `Array2` constructors fit for the
// `Gate` wrapper in this crate.

use ndarray::{array, Array2};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

#[inline]
fn c64<T: Into<f64>, V: Into<f64>>(re: T, im: V) -> Complex64 {
    Complex64::new(re.into(), im.into())
}

pub fn rx_matrix(theta: f64) -> Array2<Complex64> {
    let half = theta / 2.;
    let cos = c64(half.cos(), 0);
    let isin = c64(0., -half.sin());
    array![[cos, isin], [isin, cos]]
}

pub fn ry_matrix(theta: f64) -> Array2<Complex64> {
    let half = theta / 2.;
    let cos = c64(half.cos(), 0);
    let sin = c64(half.sin(), 0);
    array![[cos, -sin], [sin, cos]]
}

pub fn rz_matrix(theta: f64) -> Array2<Complex64> {
    let ilam2 = c64(0., 0.5 * theta);
    array![
        [(-ilam2).exp(), Complex64::new(0., 0.)],
        [Complex64::new(0., 0.), ilam2.exp()]
    ]
}

pub fn global_phase_matrix(theta: f64) -> Array2<Complex64> {
    array![[c64(0., theta).exp()]]
}

pub fn phase_matrix(lam: f64) -> Array2<Complex64> {
    array![[Complex64::new(1., 0.), Complex64::new(0., 0.)], [Complex64::new(0., 0.), c64(0., lam).exp()]]
}

pub fn h_matrix() -> Array2<Complex64> {
    array![
        [c64(FRAC_1_SQRT_2, 0), c64(FRAC_1_SQRT_2, 0)],
        [c64(FRAC_1_SQRT_2, 0), c64(-FRAC_1_SQRT_2, 0)]
    ]
}

pub fn x_matrix() -> Array2<Complex64> {
    array![
        [Complex64::new(0., 0.), Complex64::new(1., 0.)],
        [Complex64::new(1., 0.), Complex64::new(0., 0.)]
    ]
}

pub fn y_matrix() -> Array2<Complex64> {
    array![
        [Complex64::new(0., 0.), Complex64::new(0., -1.)],
        [Complex64::new(0., 1.), Complex64::new(0., 0.)]
    ]
}

pub fn z_matrix() -> Array2<Complex64> {
    array![
        [Complex64::new(1., 0.), Complex64::new(0., 0.)],
        [Complex64::new(0., 0.), Complex64::new(-1., 0.)]
    ]
}

pub fn cx_matrix() -> Array2<Complex64> {
    let (z, o) = (Complex64::new(0., 0.), Complex64::new(1., 0.));
    array![[o, z, z, z], [z, z, z, o], [z, z, o, z], [z, o, z, z]]
}

pub fn cz_matrix() -> Array2<Complex64> {
    let (z, o) = (Complex64::new(0., 0.), Complex64::new(1., 0.));
    array![[o, z, z, z], [z, o, z, z], [z, z, o, z], [z, z, z, -o]]
}

pub fn swap_matrix() -> Array2<Complex64> {
    let (z, o) = (Complex64::new(0., 0.), Complex64::new(1., 0.));
    array![[o, z, z, z], [z, z, o, z], [z, o, z, z], [z, z, z, o]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unitary_matrix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rx_is_unitary_and_identity_at_zero() {
        assert!(is_unitary_matrix(&rx_matrix(0.7), 1e-12));
        let id = rx_matrix(0.0);
        assert_abs_diff_eq!(id[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[[0, 1]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn global_phase_is_unitary_and_tracks_theta() {
        let g = global_phase_matrix(0.0);
        assert_abs_diff_eq!(g[[0, 0]].re, 1.0, epsilon = 1e-12);
        let g = global_phase_matrix(std::f64::consts::FRAC_PI_2);
        assert!(is_unitary_matrix(&g, 1e-12));
        assert_abs_diff_eq!(g[[0, 0]].re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g[[0, 0]].im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn phase_is_unitary_and_identity_at_zero() {
        assert!(is_unitary_matrix(&phase_matrix(1.3), 1e-12));
        let p = phase_matrix(0.0);
        assert_abs_diff_eq!(p[[1, 1]].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn swap_is_unitary_and_self_inverse() {
        let s = swap_matrix();
        assert!(is_unitary_matrix(&s, 1e-12));
        let squared = s.dot(&s);
        let id = Array2::<Complex64>::eye(4);
        for (a, b) in squared.iter().zip(id.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }
}
