// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Uniform moment tensor parameterization.
//!
//! A moment tensor is described by six coordinates `(rho, v, w, kappa, sigma, h)`:
//! `rho` is the tensor norm, `(v, w)` place the eigenvalue triple on the
//! lune, and `(kappa, sigma, h)` orient the eigenframe as strike, slip and
//! cosine of dip. Drawing `v, w, kappa, sigma, h` uniformly samples moment
//! tensors uniformly in solid angle. Double couples are `v = w = 0`.
//!
//! Output tensors use the up-south-east convention and the ordering
//! `(Mrr, Mtt, Mpp, Mrt, Mrp, Mtp)`.

use std::f64::consts::{PI, SQRT_2};

use nalgebra::{Matrix3, Vector3};

/// Upper bound of the lune longitude coordinate `v`.
pub const V_MAX: f64 = 1.0 / 3.0;

/// Upper bound of the lune latitude coordinate `w`.
pub const W_MAX: f64 = 3.0 * PI / 8.0;

const BISECTION_STEPS: usize = 64;

/// Scalar seismic moment (N-m) for a moment magnitude.
pub fn to_m0(mw: f64) -> f64 {
    10f64.powf(1.5 * mw + 9.1)
}

/// Tensor norm `rho = sqrt(2) * M0` for a moment magnitude.
pub fn to_rho(mw: f64) -> f64 {
    SQRT_2 * to_m0(mw)
}

/// Lune longitude `gamma` (radians) from `v`.
pub fn to_gamma(v: f64) -> f64 {
    (3.0 * v).clamp(-1.0, 1.0).asin() / 3.0
}

fn u_of_beta(beta: f64) -> f64 {
    0.75 * beta - 0.5 * (2.0 * beta).sin() + (4.0 * beta).sin() / 16.0
}

/// Lune colatitude `beta` (radians) from `w`.
///
/// `u(beta)` is monotone on `[0, pi]` with `u' = 2 sin^4(beta)`, which
/// vanishes at the poles, so this inverts it by bisection rather than Newton.
pub fn to_beta(w: f64) -> f64 {
    let target = (W_MAX - w).clamp(0.0, 2.0 * W_MAX);
    let (mut lo, mut hi) = (0.0, PI);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if u_of_beta(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Unit-norm eigenvalue triple `lambda1 >= lambda2 >= lambda3` for a lune point.
pub fn lune_eigenvalues(gamma: f64, beta: f64) -> Vector3<f64> {
    let (sg, cg) = gamma.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let r3 = 3f64.sqrt();
    let r6 = 6f64.sqrt();
    Vector3::new(
        (r3 * cg * sb - sg * sb + SQRT_2 * cb) / r6,
        (2.0 * sg * sb + SQRT_2 * cb) / r6,
        (-r3 * cg * sb - sg * sb + SQRT_2 * cb) / r6,
    )
}

/// Eigenframe in north-east-down coordinates; columns are the T, B and P axes.
fn eigenframe(kappa: f64, theta: f64, sigma: f64) -> Matrix3<f64> {
    let (sk, ck) = kappa.sin_cos();
    let (st, ct) = theta.sin_cos();
    let (ss, cs) = sigma.sin_cos();

    // fault normal and slip vector
    let n = Vector3::new(-st * sk, st * ck, -ct);
    let d = Vector3::new(cs * ck + ct * ss * sk, cs * sk - ct * ss * ck, -ss * st);

    let t = (n + d) / SQRT_2;
    let p = (n - d) / SQRT_2;
    let b = n.cross(&d);
    Matrix3::from_columns(&[t, b, p])
}

/// Map uniform parameters to moment tensor components.
///
/// Angles `kappa` and `sigma` are in degrees; `h` is the cosine of dip.
/// Returns `(Mrr, Mtt, Mpp, Mrt, Mrp, Mtp)` in N-m when `rho` is in N-m.
pub fn to_mij(rho: f64, v: f64, w: f64, kappa: f64, sigma: f64, h: f64) -> [f64; 6] {
    let lambda = lune_eigenvalues(to_gamma(v), to_beta(w));
    let theta = h.clamp(-1.0, 1.0).acos();
    let u = eigenframe(kappa.to_radians(), theta, sigma.to_radians());

    let m = u * Matrix3::from_diagonal(&lambda) * u.transpose() * rho;

    // north-east-down -> up-south-east
    [
        m[(2, 2)],
        m[(0, 0)],
        m[(1, 1)],
        m[(0, 2)],
        -m[(1, 2)],
        -m[(0, 1)],
    ]
}

/// Map force parameters to force components `(Fr, Ft, Fp)`.
///
/// `phi` is the azimuth in degrees clockwise from north and `h` the cosine
/// of the angle from vertical up.
pub fn to_rtp(f0: f64, phi: f64, h: f64) -> [f64; 3] {
    let h = h.clamp(-1.0, 1.0);
    let horizontal = (1.0 - h * h).sqrt();
    let (sp, cp) = phi.to_radians().sin_cos();
    [f0 * h, -f0 * horizontal * cp, f0 * horizontal * sp]
}

/// `n` points regularly spaced inside the open interval `(x1, x2)`.
///
/// Cells have width `(x2 - x1) / n` and points sit at the cell centers, so
/// periodic axes such as strike never repeat an end point.
pub fn open_interval(x1: f64, x2: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let delta = (x2 - x1) / n as f64;
    (0..n).map(|i| x1 + delta * (i as f64 + 0.5)).collect()
}
