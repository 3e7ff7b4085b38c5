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
//! # nbody-core
//!
//! The numerical core of a long-term solar-system and few-body
//! gravitational integrator: direct-sum Newtonian gravity (with an
//! optional pairwise 1PN correction and user-supplied external
//! accelerations), three production integrators (RK4, Gauss-Radau 15,
//! Wisdom-Holman), the coordinate transforms the symplectic scheme needs,
//! and close-encounter/collision event detection.
//!
//! ## What this crate is not
//!
//! Output persistence, plotting, CLI wiring, and configuration loading are
//! all left to a surrounding driver. This crate exposes a state
//! setter/getter, one `integrate_to` call per integrator, and event
//! buffers; it does not write files or parse configuration.
//!
//! ## Example
//!
//! ```rust
//! use nbody_core::state::NBodyState;
//! use nbody_core::integrators::{Integrator, Rk4};
//!
//! // G=1, two equal unit masses on a circular orbit of period 2*pi.
//! let mut state = NBodyState::initialize(2, 1.0, 0.0);
//! state.set_state(
//!     &[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
//!     &[0.0, -0.5, 0.0, 0.0, 0.5, 0.0],
//!     &[1.0, 1.0],
//!     &[0.0, 0.0],
//!     0.0,
//! ).unwrap();
//!
//! let mut rk4 = Rk4::new(1e-3);
//! rk4.integrate_to(&mut state, std::f64::consts::TAU).unwrap();
//! ```

#![warn(missing_docs)]

/// Small 3-vector helpers and the Stumpff functions.
pub mod vector;

/// Error taxonomy and step-result types.
pub mod error;

/// Close-encounter/collision event buffers and the pairwise scan.
pub mod events;

/// Direct-sum force kernel: Newtonian gravity, optional 1PN, energy.
pub mod force;

/// The particle ensemble and its lifecycle.
pub mod state;

/// Coordinate transforms between the inertial and democratic-heliocentric
/// frames.
pub mod transforms;

/// RK4, Gauss-Radau 15, and Wisdom-Holman integrators.
pub mod integrators;

/// Memory pooling for integrator scratch buffers.
pub mod pool;

pub use error::{NbodyError, NbodyResult, StepStatus};
pub use events::Event;
pub use state::NBodyState;
