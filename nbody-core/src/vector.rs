// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Small 3-vector helpers and the Stumpff functions used by the universal
//! variable Kepler solver.
//!
//! Particle state is stored as flat `[f64]` slices in (x,y,z) triples
//! (§3 of the spec), not as arrays of a `Vec3` type — the force kernel's
//! inner loop needs contiguous doubles. The free functions here operate on
//! `[f64; 3]` only where a genuinely local, non-contiguous computation
//! (e.g. a single pairwise separation, a single Kepler drift) makes that
//! the natural unit.

/// Euclidean norm of a 3-vector.
#[inline]
pub fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

/// Dot product of two 3-vectors.
#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Componentwise difference `a - b`.
#[inline]
pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Componentwise sum `a + b`.
#[inline]
pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Scale a 3-vector by a scalar.
#[inline]
pub fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Read a contiguous (x,y,z) triple out of a flat `3N` array at particle
/// index `i`.
#[inline]
pub fn read3(flat: &[f64], i: usize) -> [f64; 3] {
    [flat[3 * i], flat[3 * i + 1], flat[3 * i + 2]]
}

/// Write a contiguous (x,y,z) triple into a flat `3N` array at particle
/// index `i`.
#[inline]
pub fn write3(flat: &mut [f64], i: usize, v: [f64; 3]) {
    flat[3 * i] = v[0];
    flat[3 * i + 1] = v[1];
    flat[3 * i + 2] = v[2];
}

/// Kahan-style compensated summation accumulator.
///
/// The force kernel and energy calculation both sum `O(N^2)` pairwise
/// terms; for large `N` naive summation loses precision that the spec's
/// energy-drift bounds (§8) can't absorb. `KahanSum` tracks a running
/// compensation term so the accumulated error stays at the rounding floor
/// regardless of how many terms are added.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// A fresh accumulator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the running total.
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// The current compensated total.
    pub fn value(&self) -> f64 {
        self.sum
    }
}

/// The four Stumpff functions `c0..c3`, evaluated at `z = alpha * chi^2`.
///
/// These give a single analytic form for the universal-variable Kepler
/// solution across elliptic (`z > 0`), parabolic (`z == 0`), and
/// hyperbolic (`z < 0`) orbits (see the GLOSSARY). They satisfy the
/// recursion `c_k(z) = 1/k! - z * c_{k+2}(z)`; `c2` and `c3` are computed
/// from their closed trigonometric/hyperbolic forms and `c0`/`c1` are
/// recovered from the recursion, which is numerically safer near `z = 0`
/// than evaluating `c0`/`c1` directly from their own series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stumpff {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
}

/// Series-vs-closed-form switchover radius for `c2`/`c3` near `z = 0`.
const STUMPFF_SERIES_THRESHOLD: f64 = 1e-6;

impl Stumpff {
    /// Evaluate all four Stumpff functions at `z`.
    pub fn eval(z: f64) -> Self {
        let (c2, c3) = if z.abs() < STUMPFF_SERIES_THRESHOLD {
            // Near z = 0 the closed forms below lose precision to
            // cancellation; fall back to the defining power series
            // c2(z) = sum_{k=0}^inf (-z)^k / (k+2)!, c3 analogous.
            let mut c2 = 0.0;
            let mut c3 = 0.0;
            let mut term2 = 0.5; // 1/2!
            let mut term3 = 1.0 / 6.0; // 1/3!
            let mut zk = 1.0;
            for k in 0..8 {
                c2 += zk * term2;
                c3 += zk * term3;
                zk *= -z;
                let kf = (k + 1) as f64;
                term2 /= (2.0 * kf + 1.0) * (2.0 * kf + 2.0);
                term3 /= (2.0 * kf + 2.0) * (2.0 * kf + 3.0);
            }
            (c2, c3)
        } else if z > 0.0 {
            let sz = z.sqrt();
            ((1.0 - sz.cos()) / z, (sz - sz.sin()) / (sz * z))
        } else {
            let sz = (-z).sqrt();
            ((1.0 - sz.cosh()) / z, (sz.sinh() - sz) / (sz * -z))
        };
        Stumpff {
            c0: 1.0 - z * c2,
            c1: 1.0 - z * c3,
            c2,
            c3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_and_dot_agree_on_unit_vectors() {
        assert!((norm([3.0, 4.0, 0.0]) - 5.0).abs() < 1e-14);
        assert_eq!(dot([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), 0.0);
    }

    #[test]
    fn read_write_round_trip() {
        let mut flat = vec![0.0; 9];
        write3(&mut flat, 1, [1.0, 2.0, 3.0]);
        assert_eq!(read3(&flat, 1), [1.0, 2.0, 3.0]);
        assert_eq!(flat, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn kahan_sum_matches_naive_for_short_runs() {
        let mut k = KahanSum::new();
        let mut naive = 0.0;
        for x in [0.1, 0.2, 0.3, 0.4] {
            k.add(x);
            naive += x;
        }
        assert!((k.value() - naive).abs() < 1e-12);
    }

    #[test]
    fn stumpff_at_zero_matches_known_values() {
        let s = Stumpff::eval(0.0);
        assert!((s.c0 - 1.0).abs() < 1e-14);
        assert!((s.c1 - 1.0).abs() < 1e-14);
        assert!((s.c2 - 0.5).abs() < 1e-14);
        assert!((s.c3 - 1.0 / 6.0).abs() < 1e-14);
    }

    #[test]
    fn stumpff_elliptic_matches_trig_identity() {
        // For z > 0, c0(z) = cos(sqrt(z)) and c1(z) = sin(sqrt(z))/sqrt(z).
        let z = 2.5;
        let s = Stumpff::eval(z);
        let sz = z.sqrt();
        assert!((s.c0 - sz.cos()).abs() < 1e-12);
        assert!((s.c1 - sz.sin() / sz).abs() < 1e-12);
    }

    #[test]
    fn stumpff_hyperbolic_matches_cosh_identity() {
        let z = -3.0;
        let s = Stumpff::eval(z);
        let sz = (-z).sqrt();
        assert!((s.c0 - sz.cosh()).abs() < 1e-12);
        assert!((s.c1 - sz.sinh() / sz).abs() < 1e-12);
    }

    #[test]
    fn stumpff_series_and_closed_form_agree_near_zero() {
        let z = 1e-5;
        let series = Stumpff::eval(z);
        // Evaluate the closed form directly (bypassing the series branch)
        // by nudging just past the threshold in both directions.
        let just_inside = Stumpff::eval(z * 0.5);
        assert!((series.c2 - just_inside.c2).abs() < 1e-9);
        assert!((series.c3 - just_inside.c3).abs() < 1e-9);
    }
}
