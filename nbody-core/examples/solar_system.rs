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
//! Solar System N-Body Simulation Example
//!
//! Integrates the Sun and the eight planets (approximate circular,
//! coplanar orbits — this is a demonstration of the integrator, not an
//! ephemeris) with the Wisdom-Holman integrator over a user-chosen number
//! of years, reporting energy drift.
//!
//! # Units
//!
//! AU / day / solar mass, using the Gaussian gravitational constant
//! (`nbody_core::state::GAUSSIAN_G`) the way the original ABIE driver
//! defaults to (see `SPEC_FULL.md`'s "Units default" supplement).
//!
//! # Running
//!
//! ```bash
//! cargo run --example solar_system --release
//! cargo run --example solar_system --release -- --years 1000 --timestep 1.0
//! ```

use nbody_core::integrators::{Integrator, WisdomHolman};
use nbody_core::state::{NBodyState, GAUSSIAN_G};

/// One Julian year in days.
const YEAR: f64 = 365.25;

struct Planet {
    name: &'static str,
    /// Semi-major axis, AU.
    a: f64,
    /// Mass relative to the Sun.
    mass_solar: f64,
}

const PLANETS: [Planet; 8] = [
    Planet { name: "Mercury", a: 0.387, mass_solar: 1.660e-7 },
    Planet { name: "Venus", a: 0.723, mass_solar: 2.448e-6 },
    Planet { name: "Earth", a: 1.000, mass_solar: 3.003e-6 },
    Planet { name: "Mars", a: 1.524, mass_solar: 3.227e-7 },
    Planet { name: "Jupiter", a: 5.203, mass_solar: 9.545e-4 },
    Planet { name: "Saturn", a: 9.537, mass_solar: 2.858e-4 },
    Planet { name: "Uranus", a: 19.191, mass_solar: 4.366e-5 },
    Planet { name: "Neptune", a: 30.069, mass_solar: 5.151e-5 },
];

fn build_solar_system() -> NBodyState {
    let n = PLANETS.len() + 1;
    let mut state = NBodyState::initialize(n, GAUSSIAN_G, 0.0);

    let mut pos = vec![0.0; 3 * n];
    let mut vel = vec![0.0; 3 * n];
    let mut mass = vec![0.0; n];
    let radius = vec![0.0; n];

    mass[0] = 1.0; // Sun, in solar masses

    for (i, p) in PLANETS.iter().enumerate() {
        let idx = i + 1;
        mass[idx] = p.mass_solar;
        // Circular orbit in the xy-plane.
        let mu = GAUSSIAN_G * (mass[0] + mass[idx]);
        let v_circ = (mu / p.a).sqrt();
        pos[3 * idx] = p.a;
        vel[3 * idx + 1] = v_circ;
    }

    state.set_state(&pos, &vel, &mass, &radius, 0.0).unwrap();
    state
}

fn main() {
    let mut years = 1000.0;
    let mut timestep = 1.0;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--years" => years = args.next().and_then(|v| v.parse().ok()).unwrap_or(years),
            "--timestep" => timestep = args.next().and_then(|v| v.parse().ok()).unwrap_or(timestep),
            _ => eprintln!("unrecognized argument: {arg}"),
        }
    }

    let mut state = build_solar_system();
    let e0 = state.calculate_energy();

    println!("Integrating Sun + {} planets for {} years (h = {} day)", PLANETS.len(), years, timestep);

    let mut wh = WisdomHolman::new(timestep);
    let t_end = years * YEAR;
    match wh.integrate_to(&mut state, t_end) {
        Ok(status) => println!("integration finished at t={:.3} days, status={:?}", state.model_time(), status),
        Err(e) => {
            eprintln!("integration failed: {e}");
            std::process::exit(1);
        }
    }

    let e1 = state.calculate_energy();
    let drift = ((e1 - e0) / e0).abs();
    println!("E0 = {e0:.6e}, E1 = {e1:.6e}, |dE/E0| = {drift:.3e}");

    for (i, p) in PLANETS.iter().enumerate() {
        let idx = i + 1;
        let r = (state.pos()[3 * idx].powi(2) + state.pos()[3 * idx + 1].powi(2) + state.pos()[3 * idx + 2].powi(2))
            .sqrt();
        println!("  {:8} r = {:8.4} AU (started at {:.4})", p.name, r, p.a);
    }
}
