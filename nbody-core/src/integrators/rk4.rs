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
//! Classical Runge-Kutta 4th order (RK4) integrator.
//!
//! Fixed step `h` applied to the first-order form `x' = (v, a(r,v))` of the
//! equations of motion (spec §4.3). The final internal step is clipped so
//! `t` lands exactly on `t_end`.
//!
//! # Properties
//!
//! - Fourth-order accurate: global error `O(h^4)`.
//! - Not symplectic: energy drifts secularly, bounded by `O(h^4 * T)` over
//!   an integration of length `T` (spec §8).
//! - Four force evaluations per step, no step-size control, no
//!   rejection logic.

use crate::error::{NbodyError, NbodyResult, StepStatus};
use crate::events::scan_events;
use crate::force::derivative;
use crate::pool::VecPool;
use crate::state::NBodyState;

use super::Integrator;

/// Fixed-step RK4 integrator.
pub struct Rk4 {
    h: f64,
    pool: VecPool,
}

impl Rk4 {
    /// Create a new RK4 integrator with fixed step `h`.
    ///
    /// # Panics
    ///
    /// Panics if `h` is non-positive, NaN, or infinite.
    pub fn new(h: f64) -> Self {
        assert!(h > 0.0 && h.is_finite(), "RK4 step must be positive and finite");
        Rk4 {
            h,
            pool: VecPool::new(),
        }
    }

    /// The fixed step size this integrator uses.
    pub fn step_size(&self) -> f64 {
        self.h
    }

    /// Advance the flat `6N` state vector `x = (pos, vel)` by one RK4
    /// step of size `dt`, writing the result into `x_next`.
    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        x: &[f64],
        n: usize,
        g: f64,
        c: f64,
        mass: &[f64],
        ext_acc: Option<&[f64]>,
        dt: f64,
        x_next: &mut [f64],
    ) -> NbodyResult<()> {
        let len = 6 * n;
        let mut k1 = self.pool.acquire(len);
        let mut k2 = self.pool.acquire(len);
        let mut k3 = self.pool.acquire(len);
        let mut k4 = self.pool.acquire(len);
        let mut tmp = self.pool.acquire(len);

        derivative(x, n, g, c, mass, ext_acc, &mut k1)?;

        for i in 0..len {
            tmp[i] = x[i] + 0.5 * dt * k1[i];
        }
        derivative(&tmp, n, g, c, mass, ext_acc, &mut k2)?;

        for i in 0..len {
            tmp[i] = x[i] + 0.5 * dt * k2[i];
        }
        derivative(&tmp, n, g, c, mass, ext_acc, &mut k3)?;

        for i in 0..len {
            tmp[i] = x[i] + dt * k3[i];
        }
        derivative(&tmp, n, g, c, mass, ext_acc, &mut k4)?;

        for i in 0..len {
            x_next[i] = x[i] + (dt / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        Ok(())
    }
}

impl Integrator for Rk4 {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn integrate_to(&mut self, state: &mut NBodyState, t_end: f64) -> NbodyResult<StepStatus> {
        let n = state.n();
        let total = t_end - state.model_time();
        if total <= 0.0 {
            return Ok(StepStatus::Ok);
        }
        let n_steps = (total / self.h).ceil() as u64;

        let mass = state.mass().to_vec();
        let radius = state.radius().to_vec();
        let ext_acc = state.ext_acc().to_vec();
        let ext_acc_opt = if ext_acc.iter().any(|&a| a != 0.0) {
            Some(ext_acc.as_slice())
        } else {
            None
        };
        let g = state.g();
        let c = state.c();

        let mut x = vec![0.0; 6 * n];
        x[..3 * n].copy_from_slice(state.pos());
        x[3 * n..].copy_from_slice(state.vel());
        let mut x_next = vec![0.0; 6 * n];

        let mut t = state.model_time();
        for step_idx in 0..n_steps {
            let dt = if step_idx + 1 == n_steps {
                t_end - t
            } else {
                self.h
            };
            self.step(&x, n, g, c, &mass, ext_acc_opt, dt, &mut x_next)
                .map_err(|e| match e {
                    NbodyError::Domain(msg) => NbodyError::Domain(msg),
                    other => other,
                })?;
            x.copy_from_slice(&x_next);
            t += dt;

            let (pos, vel) = x.split_at(3 * n);
            let status = scan_events(
                pos,
                &radius,
                n,
                t,
                state.ce_distance(),
                state.ce_buffer_mut(),
                state.col_buffer_mut(),
            );

            state.set_model_time(t);
            let (pos_mut, vel_mut) = state.pos_vel_mut();
            pos_mut.copy_from_slice(pos);
            vel_mut.copy_from_slice(vel);

            if status != StepStatus::Ok {
                return Ok(status);
            }
        }
        Ok(StepStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular_two_body() -> NBodyState {
        let mut s = NBodyState::initialize(2, 1.0, 0.0);
        s.set_state(
            &[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            &[0.0, -0.5, 0.0, 0.0, 0.5, 0.0],
            &[1.0, 1.0],
            &[0.0, 0.0],
            0.0,
        )
        .unwrap();
        s
    }

    #[test]
    fn one_period_returns_near_initial_position() {
        let mut s = circular_two_body();
        let mut rk4 = Rk4::new(0.001);
        let period = 2.0 * std::f64::consts::PI;
        let status = rk4.integrate_to(&mut s, period).unwrap();
        assert_eq!(status, StepStatus::Ok);
        let pos = s.pos();
        assert!((pos[0] - (-1.0)).abs() < 1e-3);
        assert!((pos[3] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lands_exactly_on_t_end() {
        let mut s = circular_two_body();
        let mut rk4 = Rk4::new(0.3);
        rk4.integrate_to(&mut s, 1.0).unwrap();
        assert!((s.model_time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn momentum_conserved_over_short_integration() {
        let mut s = circular_two_body();
        let p0 = crate::force::total_momentum(s.vel(), s.mass(), s.n());
        let mut rk4 = Rk4::new(0.01);
        rk4.integrate_to(&mut s, 1.0).unwrap();
        let p1 = crate::force::total_momentum(s.vel(), s.mass(), s.n());
        for k in 0..3 {
            assert!((p0[k] - p1[k]).abs() < 1e-10);
        }
    }

    #[test]
    fn no_op_when_already_at_t_end() {
        let mut s = circular_two_body();
        let mut rk4 = Rk4::new(0.1);
        let status = rk4.integrate_to(&mut s, 0.0).unwrap();
        assert_eq!(status, StepStatus::Ok);
        assert_eq!(s.model_time(), 0.0);
    }
}
