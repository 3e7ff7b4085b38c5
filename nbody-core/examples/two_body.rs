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
//! Two-body circular orbit, run with each of the three integrators, to
//! compare energy drift and position error after one orbital period.
//!
//! This is the literal scenario from `SPEC_FULL.md`'s testable properties:
//! `N=2, G=1, m=1 each, r=(-1,0,0)/(1,0,0), v=(0,-0.5,0)/(0,0.5,0)`, period
//! `2*pi`.
//!
//! # Running
//!
//! ```bash
//! cargo run --example two_body --release
//! ```

use nbody_core::integrators::{Gr15, Integrator, Rk4, WisdomHolman};
use nbody_core::state::NBodyState;

fn two_body() -> NBodyState {
    let mut state = NBodyState::initialize(2, 1.0, 0.0);
    state
        .set_state(
            &[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            &[0.0, -0.5, 0.0, 0.0, 0.5, 0.0],
            &[1.0, 1.0],
            &[0.0, 0.0],
            0.0,
        )
        .unwrap();
    state
}

fn report(name: &str, state: &NBodyState, e0: f64) {
    let e1 = state.calculate_energy();
    let pos = state.pos();
    let err0 = ((pos[0] - (-1.0)).powi(2) + pos[1].powi(2) + pos[2].powi(2)).sqrt();
    let err1 = ((pos[3] - 1.0).powi(2) + pos[4].powi(2) + pos[5].powi(2)).sqrt();
    println!(
        "{name:8} t={:.6} |dE/E0|={:.3e} pos_error=({:.3e}, {:.3e})",
        state.model_time(),
        ((e1 - e0) / e0).abs(),
        err0,
        err1,
    );
}

fn main() {
    let period = std::f64::consts::TAU;

    let mut rk4_state = two_body();
    let e0 = rk4_state.calculate_energy();
    let mut rk4 = Rk4::new(1e-3);
    rk4.integrate_to(&mut rk4_state, period).unwrap();
    report("rk4", &rk4_state, e0);

    let mut gr15_state = two_body();
    let mut gr15 = Gr15::with_defaults();
    gr15.integrate_to(&mut gr15_state, period).unwrap();
    report("gr15", &gr15_state, e0);

    // Equal masses stress Wisdom-Holman outside its intended regime (it
    // assumes one dominant central body); included for comparison anyway.
    let mut wh_state = two_body();
    let mut wh = WisdomHolman::new(1e-2);
    wh.integrate_to(&mut wh_state, period).unwrap();
    report("wh", &wh_state, e0);
}
