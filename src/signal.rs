// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Time-series kernels used by synthesis and misfit evaluation.

/// Add the valid-mode cross-correlation of `a` with `v` into `out`.
///
/// `out[k] += sum_n a[n + k] * v[n]` for `k` in `0..=a.len() - v.len()`.
/// `out` must have exactly `a.len() - v.len() + 1` entries.
pub fn correlate_valid_add(a: &[f64], v: &[f64], out: &mut [f64]) {
    debug_assert!(a.len() >= v.len());
    debug_assert_eq!(out.len(), a.len() - v.len() + 1);
    for (k, slot) in out.iter_mut().enumerate() {
        let window = &a[k..k + v.len()];
        *slot += window.iter().zip(v).map(|(x, y)| x * y).sum::<f64>();
    }
}

/// Valid-mode cross-correlation of `a` with `v`.
///
/// Returns an empty vector when `v` is longer than `a`.
pub fn correlate_valid(a: &[f64], v: &[f64]) -> Vec<f64> {
    if v.len() > a.len() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() - v.len() + 1];
    correlate_valid_add(a, v, &mut out);
    out
}

/// Index of the first maximum. Ties and an all-equal input resolve to the
/// lowest index; NaN entries never win. Returns 0 for an empty slice.
pub fn argmax(x: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in x.iter().enumerate().skip(1) {
        if value > x[best] || (x[best].is_nan() && !value.is_nan()) {
            best = i;
        }
    }
    best
}

/// Convolve `data` with `kernel`, keeping the centered `data.len()` samples.
///
/// Matches the "same" mode of a full discrete convolution: output sample `i`
/// is full-convolution sample `i + (kernel.len() - 1) / 2`.
pub fn convolve_same(data: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = data.len();
    let m = kernel.len();
    if n == 0 || m == 0 {
        return vec![0.0; n];
    }
    let offset = (m - 1) / 2;
    (0..n)
        .map(|i| {
            let k = i + offset;
            // full[k] = sum_j data[k - j] * kernel[j], for 0 <= k - j < n
            let j_lo = k.saturating_sub(n - 1);
            let j_hi = k.min(m - 1);
            (j_lo..=j_hi).map(|j| data[k - j] * kernel[j]).sum()
        })
        .collect()
}
