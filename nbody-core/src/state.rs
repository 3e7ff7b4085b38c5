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
//! The particle ensemble and its lifecycle.
//!
//! `NBodyState` owns the flat, structure-of-arrays buffers (`pos`, `vel`,
//! `mass`, `radius`) plus the model-time clock, physical constants, and
//! event buffers. A fixed `n_max` is chosen once at [`NBodyState::initialize`]
//! and enforced on every later resize (spec §3, §7 `CapacityError`) — unlike
//! the teacher's `HashMapPool`, which grows its backing store on demand,
//! `n_max` here is a hard ceiling because the flat arrays back every
//! integrator's fixed-size scratch buffers (see `pool`).

use crate::error::{NbodyError, NbodyResult};
use crate::events::EventBuffer;
use crate::force::{calculate_energy, validate_state};
use crate::vector::{add, read3, scale, write3};

/// The Gaussian gravitational constant, `k^2` in AU^3 / day^2, the default
/// unit system the original source (ABIE) assumes when a caller does not
/// supply an explicit `g`.
pub const GAUSSIAN_G: f64 = 0.000295912208232213;

/// Default event-buffer capacity, matching the source's
/// `MAX_CE_EVENTS = MAX_COLLISION_EVENTS = 1`.
pub const DEFAULT_EVENT_CAPACITY: usize = 1;

/// The full state of an N-body ensemble: positions, velocities, masses,
/// radii, model time, and the physical constants and event buffers that
/// travel with it.
#[derive(Debug, Clone)]
pub struct NBodyState {
    pos: Vec<f64>,
    vel: Vec<f64>,
    mass: Vec<f64>,
    radius: Vec<f64>,
    ext_acc: Vec<f64>,
    n: usize,
    n_max: usize,
    t: f64,
    g: f64,
    c: f64,
    ce_distance: f64,
    ce_buffer: EventBuffer,
    col_buffer: EventBuffer,
}

impl NBodyState {
    /// Allocate a state for up to `n_max` particles (`initialize_code`,
    /// spec §6). `g` and `c` are the gravitational constant and speed of
    /// light in the caller's unit system; pass `c <= 0.0` to disable the
    /// 1PN correction.
    ///
    /// # Panics
    ///
    /// Panics if `n_max == 0`.
    pub fn initialize(n_max: usize, g: f64, c: f64) -> Self {
        assert!(n_max >= 1, "n_max must be >= 1");
        NBodyState {
            pos: vec![0.0; 3 * n_max],
            vel: vec![0.0; 3 * n_max],
            mass: vec![0.0; n_max],
            radius: vec![0.0; n_max],
            ext_acc: vec![0.0; 3 * n_max],
            n: 0,
            n_max,
            t: 0.0,
            g,
            c,
            ce_distance: 0.0,
            ce_buffer: EventBuffer::new(DEFAULT_EVENT_CAPACITY),
            col_buffer: EventBuffer::new(DEFAULT_EVENT_CAPACITY),
        }
    }

    /// Replace the active particle ensemble (`set_state`, spec §6). `pos`
    /// and `vel` must each hold `3 * n` values, `mass`/`radius` each `n`
    /// values. Resets the model clock to `t0`.
    pub fn set_state(
        &mut self,
        pos: &[f64],
        vel: &[f64],
        mass: &[f64],
        radius: &[f64],
        t0: f64,
    ) -> NbodyResult<()> {
        let n = mass.len();
        if n > self.n_max {
            return Err(NbodyError::Capacity {
                requested: n,
                max: self.n_max,
            });
        }
        if pos.len() != 3 * n || vel.len() != 3 * n || radius.len() != n {
            return Err(NbodyError::Domain(format!(
                "set_state: array lengths inconsistent with N={n}"
            )));
        }
        validate_state(pos, vel, mass, n)?;
        self.pos[..3 * n].copy_from_slice(pos);
        self.vel[..3 * n].copy_from_slice(vel);
        self.mass[..n].copy_from_slice(mass);
        self.radius[..n].copy_from_slice(radius);
        for a in self.ext_acc[..3 * n].iter_mut() {
            *a = 0.0;
        }
        self.n = n;
        self.t = t0;
        Ok(())
    }

    /// Current particle count.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The fixed ceiling on `N` chosen at [`NBodyState::initialize`].
    pub fn n_max(&self) -> usize {
        self.n_max
    }

    /// The gravitational constant this state was initialized with.
    pub fn g(&self) -> f64 {
        self.g
    }

    /// The speed of light this state was initialized with (`<= 0.0` means
    /// 1PN is disabled).
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Current model time (`get_model_time`, spec §6).
    pub fn model_time(&self) -> f64 {
        self.t
    }

    /// Advance the model clock. Integrators call this after a successful
    /// step; it does not itself move any particle.
    pub fn set_model_time(&mut self, t: f64) {
        self.t = t;
    }

    /// Read-only view of the flat position array, `3N` entries.
    pub fn pos(&self) -> &[f64] {
        &self.pos[..3 * self.n]
    }

    /// Read-only view of the flat velocity array, `3N` entries.
    pub fn vel(&self) -> &[f64] {
        &self.vel[..3 * self.n]
    }

    /// Read-only view of the mass array, `N` entries.
    pub fn mass(&self) -> &[f64] {
        &self.mass[..self.n]
    }

    /// Read-only view of the radius array, `N` entries.
    pub fn radius(&self) -> &[f64] {
        &self.radius[..self.n]
    }

    /// Read-only view of the external-acceleration array, `3N` entries.
    pub fn ext_acc(&self) -> &[f64] {
        &self.ext_acc[..3 * self.n]
    }

    /// Mutable access to position and velocity together, for integrators
    /// that advance both in place.
    pub fn pos_vel_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        let n3 = 3 * self.n;
        (&mut self.pos[..n3], &mut self.vel[..n3])
    }

    /// Copy out `(pos, vel, mass, radius)` as owned vectors (`get_state`,
    /// spec §6).
    pub fn get_state(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            self.pos[..3 * self.n].to_vec(),
            self.vel[..3 * self.n].to_vec(),
            self.mass[..self.n].to_vec(),
            self.radius[..self.n].to_vec(),
        )
    }

    /// Install per-particle external accelerations (`set_additional_forces`,
    /// spec §4.1, §6), held constant until the next call or the next
    /// `set_state`. `ext_acc` must hold `3N` values.
    pub fn set_additional_forces(&mut self, ext_acc: &[f64]) -> NbodyResult<()> {
        if ext_acc.len() != 3 * self.n {
            return Err(NbodyError::Domain(format!(
                "set_additional_forces: expected {} values, got {}",
                3 * self.n,
                ext_acc.len()
            )));
        }
        self.ext_acc[..3 * self.n].copy_from_slice(ext_acc);
        Ok(())
    }

    /// Close-encounter trigger distance; `<= 0.0` disables close-encounter
    /// detection (`set_close_encounter_distance`, spec §4.2, §6).
    pub fn ce_distance(&self) -> f64 {
        self.ce_distance
    }

    /// Set the close-encounter trigger distance.
    pub fn set_close_encounter_distance(&mut self, distance: f64) {
        self.ce_distance = distance;
    }

    /// Resize the close-encounter and collision event buffers
    /// (`set_max_ce_events`/`set_max_collision_events`, spec §6). Existing
    /// events are discarded, matching the source's behavior of
    /// reallocating the backing ctypes array.
    pub fn set_event_capacities(&mut self, ce_capacity: usize, collision_capacity: usize) {
        self.ce_buffer = EventBuffer::new(ce_capacity.max(1));
        self.col_buffer = EventBuffer::new(collision_capacity.max(1));
    }

    /// The close-encounter event buffer.
    pub fn ce_buffer(&self) -> &EventBuffer {
        &self.ce_buffer
    }

    /// Mutable access to the close-encounter event buffer, for the
    /// integrator's event scan and the driver's `reset_ce_buffer`.
    pub fn ce_buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.ce_buffer
    }

    /// The collision event buffer.
    pub fn col_buffer(&self) -> &EventBuffer {
        &self.col_buffer
    }

    /// Mutable access to the collision event buffer.
    pub fn col_buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.col_buffer
    }

    /// Total energy of the ensemble in its current inertial-frame state
    /// (`calculate_energy`, spec §4.1, §6, §8).
    pub fn calculate_energy(&self) -> f64 {
        calculate_energy(self.pos(), self.vel(), self.mass(), self.n, self.g)
    }

    /// Merge particle `j` into particle `i` (`i < j`), conserving mass and
    /// linear momentum; `j`'s slot is removed and the ensemble shrinks by
    /// one (spec §3, §4.4, ABIE's `Integrator.merge_particles`). The
    /// radius of the surviving particle is left unchanged — spec.md does
    /// not define a merge rule for radius, and ABIE's own merge does not
    /// touch it either (only mass, momentum, and position are updated).
    ///
    /// # Panics
    ///
    /// Panics if `i >= j` or `j >= N`.
    pub fn merge_particles(&mut self, i: usize, j: usize) {
        assert!(i < j, "merge_particles requires i < j");
        assert!(j < self.n, "merge_particles: j out of range");

        let mi = self.mass[i];
        let mj = self.mass[j];
        let m_total = mi + mj;

        let pi = read3(&self.pos, i);
        let pj = read3(&self.pos, j);
        let vi = read3(&self.vel, i);
        let vj = read3(&self.vel, j);

        // Conserve momentum: v_merged = (m_i v_i + m_j v_j) / m_total.
        let v_merged = scale(add(scale(vi, mi), scale(vj, mj)), 1.0 / m_total);
        // Position: mass-weighted center, consistent with conserving
        // momentum through the merge rather than snapping to either body.
        let p_merged = scale(add(scale(pi, mi), scale(pj, mj)), 1.0 / m_total);

        write3(&mut self.pos, i, p_merged);
        write3(&mut self.vel, i, v_merged);
        self.mass[i] = m_total;

        // Remove slot j by shifting the tail down by one particle.
        for k in j..self.n - 1 {
            let pk1 = read3(&self.pos, k + 1);
            let vk1 = read3(&self.vel, k + 1);
            write3(&mut self.pos, k, pk1);
            write3(&mut self.vel, k, vk1);
            self.mass[k] = self.mass[k + 1];
            self.radius[k] = self.radius[k + 1];
            let e = read3(&self.ext_acc, k + 1);
            write3(&mut self.ext_acc, k, e);
        }
        self.n -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_body() -> NBodyState {
        let mut s = NBodyState::initialize(8, 1.0, 0.0);
        s.set_state(
            &[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            &[0.0, -0.5, 0.0, 0.0, 0.5, 0.0],
            &[1.0, 1.0],
            &[0.01, 0.01],
            0.0,
        )
        .unwrap();
        s
    }

    #[test]
    fn set_state_rejects_n_over_capacity() {
        let mut s = NBodyState::initialize(1, 1.0, 0.0);
        let result = s.set_state(
            &[0.0; 6],
            &[0.0; 6],
            &[1.0, 1.0],
            &[0.1, 0.1],
            0.0,
        );
        assert!(matches!(result, Err(NbodyError::Capacity { requested: 2, max: 1 })));
    }

    #[test]
    fn get_state_round_trips_set_state() {
        let s = two_body();
        let (pos, vel, mass, radius) = s.get_state();
        assert_eq!(pos, vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(vel, vec![0.0, -0.5, 0.0, 0.0, 0.5, 0.0]);
        assert_eq!(mass, vec![1.0, 1.0]);
        assert_eq!(radius, vec![0.01, 0.01]);
    }

    #[test]
    fn energy_matches_force_module_calculation() {
        let s = two_body();
        let direct = calculate_energy(s.pos(), s.vel(), s.mass(), s.n(), s.g());
        assert_eq!(s.calculate_energy(), direct);
    }

    #[test]
    fn merge_conserves_mass_and_momentum() {
        let mut s = NBodyState::initialize(8, 1.0, 0.0);
        s.set_state(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 0.0, 0.0],
            &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0],
            &[2.0, 3.0, 10.0],
            &[0.1, 0.1, 0.1],
            0.0,
        )
        .unwrap();
        let p_before = crate::force::total_momentum(s.vel(), s.mass(), s.n());
        s.merge_particles(0, 1);
        assert_eq!(s.n(), 2);
        assert_eq!(s.mass()[0], 5.0);
        // surviving third body is now at index 1
        assert_eq!(s.mass()[1], 10.0);
        let p_after = crate::force::total_momentum(s.vel(), s.mass(), s.n());
        for k in 0..3 {
            assert!((p_before[k] - p_after[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn set_additional_forces_rejects_wrong_length() {
        let mut s = two_body();
        assert!(s.set_additional_forces(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn event_buffer_capacities_can_be_resized() {
        let mut s = two_body();
        s.set_event_capacities(4, 2);
        assert_eq!(s.ce_buffer().capacity(), 4);
        assert_eq!(s.col_buffer().capacity(), 2);
    }
}
