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
//! Direct-sum force kernel: Newtonian gravity, optional pairwise 1PN
//! correction, optional external accelerations, and energy accounting.
//!
//! # Softening
//!
//! Unlike the teacher's `GravityPlugin`, no softening length is added to
//! the pairwise separation (spec §4.1: "Softening is not applied — the
//! integrators handle close approaches through events or adaptive step
//! control"). Close pairs are expected to be caught by the event detector
//! or, for Gauss-Radau, by step-size control.
//!
//! # Parallelism
//!
//! With the `parallel` feature, the outer particle loop of
//! [`newtonian_accelerations`] is split across threads with Rayon, mirroring
//! `GravityPlugin`'s use of `rayon::prelude` in the teacher crate. Pairwise
//! reductions are not bound to a fixed summation order in that mode, so
//! results are deterministic only up to floating-point associativity
//! (spec §5) — tests must not assume bit-identical output across thread
//! counts.

use crate::error::{NbodyError, NbodyResult};
use crate::vector::{dot, read3, sub, KahanSum};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Validate a state slice for the conditions the spec requires to be
/// caught at the force-kernel boundary (§4.1, §7): nonnegative mass, no
/// NaN/infinite values.
pub fn validate_state(pos: &[f64], vel: &[f64], mass: &[f64], n: usize) -> NbodyResult<()> {
    if pos.len() < 3 * n || vel.len() < 3 * n || mass.len() < n {
        return Err(NbodyError::Domain(format!(
            "state arrays too short for N={n}"
        )));
    }
    for (idx, &m) in mass.iter().take(n).enumerate() {
        if m < 0.0 {
            return Err(NbodyError::Domain(format!(
                "mass[{idx}] = {m} is negative"
            )));
        }
        if !m.is_finite() {
            return Err(NbodyError::Domain(format!(
                "mass[{idx}] = {m} is not finite"
            )));
        }
    }
    for (idx, &x) in pos.iter().take(3 * n).enumerate() {
        if !x.is_finite() {
            return Err(NbodyError::Domain(format!(
                "pos[{idx}] = {x} is not finite"
            )));
        }
    }
    for (idx, &v) in vel.iter().take(3 * n).enumerate() {
        if !v.is_finite() {
            return Err(NbodyError::Domain(format!(
                "vel[{idx}] = {v} is not finite"
            )));
        }
    }
    Ok(())
}

/// Newtonian pairwise acceleration, accumulated with Newton's third law
/// (each pair updates both `a_i` and `a_j` from a single separation
/// computation). Writes into `acc`, which must be zeroed by the caller
/// first (this function only adds).
pub fn newtonian_accelerations(pos: &[f64], mass: &[f64], n: usize, g: f64, acc: &mut [f64]) {
    #[cfg(feature = "parallel")]
    {
        if n >= PARALLEL_THRESHOLD {
            accumulate_parallel(pos, mass, n, g, acc);
            return;
        }
    }
    accumulate_serial(pos, mass, n, g, acc);
}

/// Particle counts below this use the serial loop: for small N the thread
/// dispatch overhead of Rayon dwarfs the O(N^2) work it would save.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 64;

fn accumulate_serial(pos: &[f64], mass: &[f64], n: usize, g: f64, acc: &mut [f64]) {
    for i in 0..n {
        let ri = read3(pos, i);
        for j in (i + 1)..n {
            let rj = read3(pos, j);
            let rij = sub(rj, ri);
            let r2 = dot(rij, rij);
            let r = r2.sqrt();
            let inv_r3 = 1.0 / (r2 * r);
            let gi = g * mass[j] * inv_r3;
            let gj = g * mass[i] * inv_r3;
            acc[3 * i] += gi * rij[0];
            acc[3 * i + 1] += gi * rij[1];
            acc[3 * i + 2] += gi * rij[2];
            acc[3 * j] -= gj * rij[0];
            acc[3 * j + 1] -= gj * rij[1];
            acc[3 * j + 2] -= gj * rij[2];
        }
    }
}

/// Data-parallel variant over the outer particle index. Each body's total
/// acceleration from all others is computed independently in its own
/// thread, so Newton's-third-law halving (which requires mutating two
/// bodies' accelerations from one pair evaluation) is not used here — each
/// body instead sums the full `N-1` contributions on its own. This trades
/// the 2x flop saving for embarrassingly parallel, reduction-free work,
/// the same tradeoff the teacher's `GravityPlugin::compute_force_for_entity`
/// makes under `rayon`.
#[cfg(feature = "parallel")]
fn accumulate_parallel(pos: &[f64], mass: &[f64], n: usize, g: f64, acc: &mut [f64]) {
    acc.par_chunks_mut(3).enumerate().for_each(|(i, out)| {
        let ri = read3(pos, i);
        let mut a = [0.0; 3];
        for j in 0..n {
            if j == i {
                continue;
            }
            let rj = read3(pos, j);
            let rij = sub(rj, ri);
            let r2 = dot(rij, rij);
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
            let gm = g * mass[j] * inv_r3;
            a[0] += gm * rij[0];
            a[1] += gm * rij[1];
            a[2] += gm * rij[2];
        }
        out[0] += a[0];
        out[1] += a[1];
        out[2] += a[2];
    });
}

/// Pairwise first-order post-Newtonian (1PN) correction, the standard
/// Einstein-Infeld-Hoffmann pairwise truncation (Quinn, Tremaine & Duncan
/// 1991; dropping three-body cross terms, as spec §4.1 asks for). Adds
/// directly into `acc`; no-op when `c <= 0.0` (PN disabled, spec §3).
///
/// With `c = f64::INFINITY` every term below vanishes (division by `c^2`),
/// so the result matches the pure-Newtonian kernel to rounding — the test
/// the spec asks for in §4.1.
pub fn pn_accelerations(pos: &[f64], vel: &[f64], mass: &[f64], n: usize, g: f64, c: f64, acc: &mut [f64]) {
    if c <= 0.0 {
        return;
    }
    let c2 = c * c;
    for i in 0..n {
        let ri = read3(pos, i);
        let vi = read3(vel, i);
        for j in 0..n {
            if i == j {
                continue;
            }
            let rj = read3(pos, j);
            let vj = read3(vel, j);
            let rij = sub(ri, rj); // vector from j to i, matches n_ij convention below
            let r = (dot(rij, rij)).sqrt();
            let n_ij = [rij[0] / r, rij[1] / r, rij[2] / r];

            let vi2 = dot(vi, vi);
            let vj2 = dot(vj, vj);
            let vivj = dot(vi, vj);
            let nv_j = dot(n_ij, vj);

            let a_coeff = g * mass[j] / (c2 * r * r)
                * (4.0 * g * (mass[i] + mass[j]) / r - vi2 - 2.0 * vj2 + 4.0 * vivj
                    + 1.5 * nv_j * nv_j);
            let b_coeff = g * mass[j] / (c2 * r * r) * dot(n_ij, [
                4.0 * vi[0] - 3.0 * vj[0],
                4.0 * vi[1] - 3.0 * vj[1],
                4.0 * vi[2] - 3.0 * vj[2],
            ]);

            acc[3 * i] += a_coeff * n_ij[0] + b_coeff * (vi[0] - vj[0]);
            acc[3 * i + 1] += a_coeff * n_ij[1] + b_coeff * (vi[1] - vj[1]);
            acc[3 * i + 2] += a_coeff * n_ij[2] + b_coeff * (vi[2] - vj[2]);
        }
    }
}

/// Total acceleration: Newtonian + optional 1PN + optional external
/// accelerations (added componentwise after gravity, spec §4.1). This is
/// the "second-order ODE form" used by Gauss-Radau and by Wisdom-Holman's
/// kick phase.
pub fn total_accelerations(
    pos: &[f64],
    vel: &[f64],
    mass: &[f64],
    n: usize,
    g: f64,
    c: f64,
    ext_acc: Option<&[f64]>,
    acc: &mut [f64],
) -> NbodyResult<()> {
    validate_state(pos, vel, mass, n)?;
    for a in acc.iter_mut().take(3 * n) {
        *a = 0.0;
    }
    newtonian_accelerations(pos, mass, n, g, acc);
    if c > 0.0 {
        pn_accelerations(pos, vel, mass, n, g, c, acc);
    }
    if let Some(ext) = ext_acc {
        for k in 0..3 * n {
            acc[k] += ext[k];
        }
    }
    Ok(())
}

/// First-order ODE form `x' = (v, a(r,v))` for a flat `6N` state vector
/// `x = (pos, vel)`. Used by RK4.
pub fn derivative(
    x: &[f64],
    n: usize,
    g: f64,
    c: f64,
    mass: &[f64],
    ext_acc: Option<&[f64]>,
    dxdt: &mut [f64],
) -> NbodyResult<()> {
    let (pos, vel) = x.split_at(3 * n);
    let (dpos, dvel) = dxdt.split_at_mut(3 * n);
    dpos.copy_from_slice(&vel[..3 * n]);
    total_accelerations(pos, vel, mass, n, g, c, ext_acc, dvel)
}

/// Total energy (kinetic + potential), always computed in the inertial
/// frame regardless of an integrator's internal working frame (spec §3,
/// §4.1 invariant).
///
/// `KE = 1/2 * sum m_i |v_i|^2`, `PE = - sum_{i<j} G m_i m_j / |r_i - r_j|`.
pub fn calculate_energy(pos: &[f64], vel: &[f64], mass: &[f64], n: usize, g: f64) -> f64 {
    let mut kinetic = KahanSum::new();
    for i in 0..n {
        let vi = read3(vel, i);
        kinetic.add(0.5 * mass[i] * dot(vi, vi));
    }
    let mut potential = KahanSum::new();
    for i in 0..n {
        let ri = read3(pos, i);
        for j in (i + 1)..n {
            let rj = read3(pos, j);
            let r = (dot(sub(ri, rj), sub(ri, rj))).sqrt();
            potential.add(-g * mass[i] * mass[j] / r);
        }
    }
    kinetic.value() + potential.value()
}

/// Total linear momentum `sum m_i v_i`, used by the momentum-conservation
/// test property in spec §8.
pub fn total_momentum(vel: &[f64], mass: &[f64], n: usize) -> [f64; 3] {
    let mut p = [0.0; 3];
    for i in 0..n {
        let vi = read3(vel, i);
        p[0] += mass[i] * vi[0];
        p[1] += mass[i] * vi[1];
        p[2] += mass[i] * vi[2];
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_equal_masses_pull_together_symmetrically() {
        let pos = vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let mass = vec![1.0, 1.0];
        let mut acc = vec![0.0; 6];
        newtonian_accelerations(&pos, &mass, 2, 1.0, &mut acc);
        // a_0 points toward body 1 (+x), a_1 points toward body 0 (-x),
        // equal magnitude by symmetry.
        assert!(acc[0] > 0.0);
        assert!(acc[3] < 0.0);
        assert!((acc[0] + acc[3]).abs() < 1e-14);
        let expected = 1.0 * 1.0 / (2.0 * 2.0); // G m / r^2 with r=2
        assert!((acc[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn pn_term_vanishes_with_infinite_speed_of_light() {
        let pos = vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let vel = vec![0.0, 0.1, 0.0, 0.0, -0.1, 0.0];
        let mass = vec![1.0, 1.0];
        let mut acc = vec![0.0; 6];
        pn_accelerations(&pos, &vel, &mass, 2, 1.0, f64::INFINITY, &mut acc);
        for a in acc {
            assert_eq!(a, 0.0);
        }
    }

    #[test]
    fn pn_disabled_when_c_is_zero() {
        let pos = vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let vel = vec![0.0, 0.1, 0.0, 0.0, -0.1, 0.0];
        let mass = vec![1.0, 1.0];
        let mut acc = vec![0.0; 6];
        pn_accelerations(&pos, &vel, &mass, 2, 1.0, 0.0, &mut acc);
        for a in acc {
            assert_eq!(a, 0.0);
        }
    }

    #[test]
    fn external_acceleration_is_added_after_gravity() {
        let pos = vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let vel = vec![0.0; 6];
        let mass = vec![1.0, 1.0];
        let ext = vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut acc = vec![0.0; 6];
        total_accelerations(&pos, &vel, &mass, 2, 1.0, 0.0, Some(&ext), &mut acc).unwrap();
        assert!((acc[0] - (0.25 + 10.0)).abs() < 1e-12);
    }

    #[test]
    fn validate_state_rejects_negative_mass() {
        let pos = vec![0.0; 6];
        let vel = vec![0.0; 6];
        let mass = vec![-1.0, 1.0];
        assert!(validate_state(&pos, &vel, &mass, 2).is_err());
    }

    #[test]
    fn validate_state_rejects_nan() {
        let pos = vec![f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0];
        let vel = vec![0.0; 6];
        let mass = vec![1.0, 1.0];
        assert!(validate_state(&pos, &vel, &mass, 2).is_err());
    }

    #[test]
    fn energy_of_circular_two_body_orbit_is_negative() {
        // Matches scenario 1 from spec §8: G=1, m=1, r=(-1,0,0)/(1,0,0),
        // v=(0,-0.5,0)/(0,0.5,0).
        let pos = vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let vel = vec![0.0, -0.5, 0.0, 0.0, 0.5, 0.0];
        let mass = vec![1.0, 1.0];
        let e = calculate_energy(&pos, &vel, &mass, 2, 1.0);
        // KE = 0.5*(0.25+0.25) = 0.25; PE = -1/2 = -0.5
        assert!((e - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn momentum_of_symmetric_two_body_is_zero() {
        let vel = vec![0.0, -0.5, 0.0, 0.0, 0.5, 0.0];
        let mass = vec![1.0, 1.0];
        let p = total_momentum(&vel, &mass, 2);
        assert!(p.iter().all(|&c| c.abs() < 1e-14));
    }
}
