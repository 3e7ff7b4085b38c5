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
//! Coordinate frame transforms between the inertial frame `nbody-core`
//! stores state in, and the frames the integrators need internally.
//!
//! Wisdom-Holman works in "democratic heliocentric" coordinates (Duncan,
//! Levison & Lee 1998): positions relative to the central body (index 0),
//! velocities relative to the system barycenter. Every other module only
//! ever sees the inertial frame (spec §3, §4.1 invariant: "energy and
//! momentum are always reported in the inertial frame"), so the transform
//! in and the transform back out both happen inside a single Wisdom-Holman
//! step (see `integrators::wh`) rather than persisting a second coordinate
//! system in `NBodyState`.

use crate::vector::{add, read3, scale, sub, write3};

/// Convert inertial `(pos, vel)` to democratic heliocentric `(q, p)`.
///
/// `q[0] = 0` (central body is the origin by definition); `q[i] = pos[i] -
/// pos[0]` for `i >= 1`. `p[0] = total system momentum` (so the central
/// body's "momentum" coordinate carries the barycentric drift);
/// `p[i] = mass[i] * (vel[i] - v_com)` for `i >= 1`, where `v_com` is the
/// barycentric velocity of the whole system.
///
/// `pos`/`vel`/`mass` are the flat inertial-frame arrays; `q`/`p` are
/// written in the same flat layout (`q`, `p` each `3N`; `p[0..3]` is the
/// system's total momentum vector, not a per-mass quantity, matching the
/// Duncan-Levison-Lee convention that body 0's canonical momentum is
/// `sum_i m_i v_i`).
pub fn to_democratic_heliocentric(
    pos: &[f64],
    vel: &[f64],
    mass: &[f64],
    n: usize,
    q: &mut [f64],
    p: &mut [f64],
) {
    let r0 = read3(pos, 0);
    let m_total: f64 = mass[..n].iter().sum();
    let mut p_total = [0.0; 3];
    for i in 0..n {
        let vi = read3(vel, i);
        p_total = add(p_total, scale(vi, mass[i]));
    }
    let v_com = scale(p_total, 1.0 / m_total);

    write3(q, 0, [0.0, 0.0, 0.0]);
    write3(p, 0, p_total);
    for i in 1..n {
        let ri = read3(pos, i);
        write3(q, i, sub(ri, r0));
        let vi = read3(vel, i);
        let pi = scale(sub(vi, v_com), mass[i]);
        write3(p, i, pi);
    }
}

/// Convert democratic heliocentric `(q, p)` back to inertial `(pos, vel)`.
///
/// This is the exact inverse of [`to_democratic_heliocentric`]: it
/// reconstructs the central body's inertial position and velocity from the
/// requirement that the system barycenter sits wherever the original
/// inertial frame placed it. Since only relative geometry is preserved
/// across the round trip (the barycenter's own position and velocity are
/// not stored in `q`/`p`), the caller supplies `bary_pos`/`bary_vel`: the
/// barycenter's position and velocity in the inertial frame, captured
/// before calling `to_democratic_heliocentric` and threaded through
/// unchanged for the duration of one integrator step (see `integrators::wh`,
/// which does not advance the barycenter — a free system's barycenter
/// moves uniformly and the kick-drift-kick map is taken in the frame
/// comoving with it).
pub fn from_democratic_heliocentric(
    q: &[f64],
    p: &[f64],
    mass: &[f64],
    n: usize,
    bary_pos: [f64; 3],
    bary_vel: [f64; 3],
    pos: &mut [f64],
    vel: &mut [f64],
) {
    let m_total: f64 = mass[..n].iter().sum();

    // Central body position: the mass-weighted mean of all positions must
    // equal bary_pos. pos[0] = r0, pos[i] = r0 + q[i] for i >= 1, so
    // bary_pos = (m0 r0 + sum_{i>=1} m_i (r0 + q_i)) / m_total
    //          = r0 + (sum_{i>=1} m_i q_i) / m_total.
    let mut weighted_q = [0.0; 3];
    for i in 1..n {
        let qi = read3(q, i);
        weighted_q = add(weighted_q, scale(qi, mass[i]));
    }
    let r0 = sub(bary_pos, scale(weighted_q, 1.0 / m_total));
    write3(pos, 0, r0);
    for i in 1..n {
        let qi = read3(q, i);
        write3(pos, i, add(r0, qi));
    }

    // Central body velocity: p[0] is the total system momentum, and
    // v_com = bary_vel by construction (the barycenter's velocity is
    // carried through unchanged). For i >= 1, v_i = p_i / m_i + v_com.
    // v0 follows from total momentum: m0 v0 + sum_{i>=1} m_i v_i = p_total,
    // i.e. v0 = (p_total - sum_{i>=1} p_i) / m0 - ... expanded below.
    let p_total = read3(p, 0);
    let mut sum_mv_rest = [0.0; 3];
    for i in 1..n {
        let pi = read3(p, i);
        let vi = add(scale(pi, 1.0 / mass[i]), bary_vel);
        write3(vel, i, vi);
        sum_mv_rest = add(sum_mv_rest, scale(vi, mass[i]));
    }
    let v0 = scale(sub(p_total, sum_mv_rest), 1.0 / mass[0]);
    write3(vel, 0, v0);
}

/// The system barycenter's position and velocity in the inertial frame.
pub fn barycenter(pos: &[f64], vel: &[f64], mass: &[f64], n: usize) -> ([f64; 3], [f64; 3]) {
    let m_total: f64 = mass[..n].iter().sum();
    let mut r = [0.0; 3];
    let mut v = [0.0; 3];
    for i in 0..n {
        let ri = read3(pos, i);
        let vi = read3(vel, i);
        r = add(r, scale(ri, mass[i]));
        v = add(v, scale(vi, mass[i]));
    }
    (scale(r, 1.0 / m_total), scale(v, 1.0 / m_total))
}

/// Plain heliocentric positions (relative to body 0), used by Wisdom-Holman's
/// Kepler-drift substep which advances each body's heliocentric orbit
/// independently. Velocities are not transformed here because the drift
/// substep consumes `q, p` directly; this helper exists for diagnostics and
/// tests that want heliocentric positions without the momentum bookkeeping.
pub fn to_heliocentric_positions(pos: &[f64], n: usize, out: &mut [f64]) {
    let r0 = read3(pos, 0);
    for i in 0..n {
        let ri = read3(pos, i);
        write3(out, i, sub(ri, r0));
    }
}
