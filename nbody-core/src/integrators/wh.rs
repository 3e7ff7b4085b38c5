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
//! Wisdom-Holman symplectic (kick-drift-kick) integrator.
//!
//! Operator splitting for hierarchical planetary systems: a Keplerian part
//! (each body on an unperturbed orbit about the central mass, index 0) and
//! an interaction part (mutual gravity between the non-central bodies,
//! plus the linear-drift correction from the democratic-heliocentric
//! splitting). See Wisdom & Holman (1991) and Duncan, Levison & Lee (1998)
//! for the coordinate convention; spec §4.5 for the step structure.
//!
//! Requires body 0 to be the most massive ("central body is index 0, the
//! most massive is required"). Energy does not drift secularly with this
//! scheme even though each step is only second-order accurate (spec §8).
//!
//! # Scope
//!
//! `ext_acc` is not applied inside the Wisdom-Holman step: the source's
//! WH integrator operates purely on the Keplerian/interaction split and
//! spec §4.5 never mentions an external-acceleration term for it.
//! `set_additional_forces` is honored by RK4 and Gauss-Radau.

use crate::error::{NbodyError, NbodyResult, StepStatus};
use crate::events::scan_events;
use crate::state::NBodyState;
use crate::transforms::{barycenter, from_democratic_heliocentric, to_democratic_heliocentric};
use crate::vector::{add, dot, read3, scale, sub, write3, Stumpff};

use super::Integrator;

/// Relative convergence tolerance for the universal-variable Kepler solve
/// (spec §4.5): `|F(chi)| / (|chi| * sqrt(mu)) < tol`.
pub const KEPLER_TOL: f64 = 1e-12;
/// Maximum Newton-Raphson iterations before falling back to bisection.
pub const KEPLER_MAX_ITER: u32 = 30;

/// Configuration for the Wisdom-Holman integrator, following the teacher's
/// `PoolConfig` pattern of a `Default` plus validated `with_*` builders.
#[derive(Debug, Clone, Copy)]
pub struct WhConfig {
    /// Fixed step size.
    pub h: f64,
}

impl WhConfig {
    /// A configuration with the given fixed step.
    ///
    /// # Panics
    ///
    /// Panics if `h` is non-positive or non-finite.
    pub fn new(h: f64) -> Self {
        assert!(h > 0.0 && h.is_finite(), "WH step must be positive and finite");
        WhConfig { h }
    }
}

/// Wisdom-Holman integrator with a fixed kick-drift-kick step.
pub struct WisdomHolman {
    config: WhConfig,
}

impl WisdomHolman {
    /// Create a new Wisdom-Holman integrator with fixed step `h`.
    pub fn new(h: f64) -> Self {
        WisdomHolman {
            config: WhConfig::new(h),
        }
    }

    /// The fixed step size this integrator uses.
    pub fn step_size(&self) -> f64 {
        self.config.h
    }

    /// One full kick-drift-kick step of size `h`, advancing `q`/`p` in
    /// place. `mass[0]` is the central body's mass.
    fn kdk_step(&self, q: &mut [f64], p: &mut [f64], mass: &[f64], n: usize, g: f64, h: f64) -> NbodyResult<()> {
        let mut a_int = vec![0.0; 3 * n];

        interaction_accelerations(q, mass, n, g, &mut a_int);
        half_kick(p, &a_int, mass, n, h);

        linear_drift(q, p, mass, n, h);
        kepler_drift_all(q, p, mass, n, g, h)?;
        linear_drift(q, p, mass, n, h);

        interaction_accelerations(q, mass, n, g, &mut a_int);
        half_kick(p, &a_int, mass, n, h);
        Ok(())
    }
}

fn interaction_accelerations(q: &[f64], mass: &[f64], n: usize, g: f64, acc: &mut [f64]) {
    for a in acc.iter_mut().take(3 * n) {
        *a = 0.0;
    }
    for i in 1..n {
        let qi = read3(q, i);
        for j in (i + 1)..n {
            let qj = read3(q, j);
            let rij = sub(qj, qi);
            let r2 = dot(rij, rij);
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
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

fn half_kick(p: &mut [f64], a_int: &[f64], mass: &[f64], n: usize, h: f64) {
    for i in 1..n {
        p[3 * i] += 0.5 * h * mass[i] * a_int[3 * i];
        p[3 * i + 1] += 0.5 * h * mass[i] * a_int[3 * i + 1];
        p[3 * i + 2] += 0.5 * h * mass[i] * a_int[3 * i + 2];
    }
}

/// Linear drift from the barycentric-momentum correction: each non-central
/// body's position advances by `(h/2) * (sum_j p_j) / m_0` (spec §4.5 step
/// 2/4), where the sum runs over the other non-central bodies' canonical
/// momenta.
fn linear_drift(q: &mut [f64], p: &[f64], mass: &[f64], n: usize, h: f64) {
    let mut p_rest = [0.0; 3];
    for j in 1..n {
        p_rest = add(p_rest, read3(p, j));
    }
    let correction = scale(p_rest, (0.5 * h) / mass[0]);
    for i in 1..n {
        let qi = read3(q, i);
        write3(q, i, add(qi, correction));
    }
}

fn kepler_drift_all(q: &mut [f64], p: &mut [f64], mass: &[f64], n: usize, g: f64, h: f64) -> NbodyResult<()> {
    for i in 1..n {
        let mu = g * (mass[0] + mass[i]);
        let r0 = read3(q, i);
        let v0 = scale(read3(p, i), 1.0 / mass[i]);
        let (r1, v1) = kepler_drift(r0, v0, mu, h)?;
        write3(q, i, r1);
        write3(p, i, scale(v1, mass[i]));
    }
    Ok(())
}

/// Advance a single two-body Kepler orbit by time `h` using the
/// universal-variable formulation (Stumpff functions), uniform across
/// elliptic, parabolic, and hyperbolic regimes.
///
/// Initial guess `chi0 = h * sqrt(mu) / |r0|` (spec §4.5). Newton-Raphson
/// on the universal Kepler equation; on non-convergence within
/// `KEPLER_MAX_ITER` iterations, falls back to bisection on a bracketed
/// range of `chi`.
fn kepler_drift(r0: [f64; 3], v0: [f64; 3], mu: f64, dt: f64) -> NbodyResult<([f64; 3], [f64; 3])> {
    let r0n = dot(r0, r0).sqrt();
    let vr0 = dot(r0, v0) / r0n;
    let sqrt_mu = mu.sqrt();
    let alpha = 2.0 / r0n - dot(v0, v0) / mu;

    let f = |chi: f64| -> f64 {
        let z = alpha * chi * chi;
        let s = Stumpff::eval(z);
        (r0n * vr0 / sqrt_mu) * chi * chi * s.c2 + (1.0 - alpha * r0n) * chi * chi * chi * s.c3
            + r0n * chi
            - sqrt_mu * dt
    };
    let fprime = |chi: f64| -> f64 {
        let z = alpha * chi * chi;
        let s = Stumpff::eval(z);
        (r0n * vr0 / sqrt_mu) * chi * (1.0 - z * s.c3) + (1.0 - alpha * r0n) * chi * chi * s.c2 + r0n
    };

    let mut chi = sqrt_mu * dt / r0n;

    let mut converged = false;
    for _ in 0..KEPLER_MAX_ITER {
        let fx = f(chi);
        if fx.abs() / (chi.abs().max(1e-300) * sqrt_mu) < KEPLER_TOL {
            converged = true;
            break;
        }
        let fpx = fprime(chi);
        if fpx == 0.0 || !fpx.is_finite() {
            break;
        }
        let next = chi - fx / fpx;
        if !next.is_finite() {
            break;
        }
        chi = next;
    }

    if !converged && f(chi).abs() / (chi.abs().max(1e-300) * sqrt_mu) >= KEPLER_TOL {
        chi = bisect_chi(&f, chi, dt, sqrt_mu, r0n)?;
    }

    let z = alpha * chi * chi;
    let s = Stumpff::eval(z);
    let fg_f = 1.0 - (chi * chi / r0n) * s.c2;
    let fg_g = dt - (chi * chi * chi / sqrt_mu) * s.c3;

    let r1 = add(scale(r0, fg_f), scale(v0, fg_g));
    let r1n = dot(r1, r1).sqrt();

    let fdot = (sqrt_mu / (r1n * r0n)) * chi * (z * s.c3 - 1.0);
    let gdot = 1.0 - (chi * chi / r1n) * s.c2;

    let v1 = add(scale(r0, fdot), scale(v0, gdot));
    Ok((r1, v1))
}

/// Bisection fallback: expand a bracket around the last Newton iterate
/// until `f` changes sign, then bisect to the same relative tolerance
/// used for Newton-Raphson.
fn bisect_chi(
    f: &dyn Fn(f64) -> f64,
    chi_guess: f64,
    dt: f64,
    sqrt_mu: f64,
    r0n: f64,
) -> NbodyResult<f64> {
    let sign = if dt >= 0.0 { 1.0 } else { -1.0 };
    let mut lo = if chi_guess.abs() > 1e-12 { chi_guess * 0.5 } else { sign * 1e-6 };
    let mut hi = if chi_guess.abs() > 1e-12 { chi_guess * 2.0 } else { sign * 1e-3 };
    if sign < 0.0 {
        std::mem::swap(&mut lo, &mut hi);
    }

    let mut expand = 0;
    while f(lo).signum() == f(hi).signum() && expand < 60 {
        lo -= sign * (lo.abs() + 1.0);
        hi += sign * (hi.abs() + 1.0);
        expand += 1;
    }
    if f(lo).signum() == f(hi).signum() {
        return Err(NbodyError::Convergence {
            context: "kepler_drift (bisection bracket search)",
            iterations: expand,
        });
    }

    let mut mid = 0.5 * (lo + hi);
    for _ in 0..200 {
        mid = 0.5 * (lo + hi);
        let fm = f(mid);
        if fm.abs() / (mid.abs().max(1e-300) * sqrt_mu) < KEPLER_TOL || (hi - lo).abs() < 1e-15 * r0n.max(1.0) {
            return Ok(mid);
        }
        if fm.signum() == f(lo).signum() {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(mid)
}

impl Integrator for WisdomHolman {
    fn name(&self) -> &'static str {
        "wh"
    }

    fn integrate_to(&mut self, state: &mut NBodyState, t_end: f64) -> NbodyResult<StepStatus> {
        let n = state.n();
        assert!(n >= 1, "WH requires at least the central body");
        let h = self.config.h;
        let total = t_end - state.model_time();
        if total <= 0.0 {
            return Ok(StepStatus::Ok);
        }
        let n_steps = (total / h).ceil() as u64;

        let mass = state.mass().to_vec();
        let radius = state.radius().to_vec();
        let g = state.g();

        let mut t = state.model_time();
        for step_idx in 0..n_steps {
            let dt = if step_idx + 1 == n_steps { t_end - t } else { h };

            let pos = state.pos().to_vec();
            let vel = state.vel().to_vec();
            let (bary_pos, bary_vel) = barycenter(&pos, &vel, &mass, n);

            let mut q = vec![0.0; 3 * n];
            let mut p = vec![0.0; 3 * n];
            to_democratic_heliocentric(&pos, &vel, &mass, n, &mut q, &mut p);

            self.kdk_step(&mut q, &mut p, &mass, n, g, dt)?;

            let bary_pos_new = add(bary_pos, scale(bary_vel, dt));
            let mut new_pos = vec![0.0; 3 * n];
            let mut new_vel = vec![0.0; 3 * n];
            from_democratic_heliocentric(&q, &p, &mass, n, bary_pos_new, bary_vel, &mut new_pos, &mut new_vel);

            t += dt;
            let status = scan_events(
                &new_pos,
                &radius,
                n,
                t,
                state.ce_distance(),
                state.ce_buffer_mut(),
                state.col_buffer_mut(),
            );

            state.set_model_time(t);
            let (pos_mut, vel_mut) = state.pos_vel_mut();
            pos_mut.copy_from_slice(&new_pos);
            vel_mut.copy_from_slice(&new_vel);

            if status != StepStatus::Ok {
                return Ok(status);
            }
        }
        Ok(StepStatus::Ok)
    }
}
