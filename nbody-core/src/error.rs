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
//! Error taxonomy and step-result types.
//!
//! Matches the classification in the spec's Error Handling Design: fatal
//! conditions (`DomainError`, `ConvergenceFailure`, `CapacityError` on `N`)
//! are returned as `Err(NbodyError)`; normal-flow conditions
//! (`CloseEncounterEvent`, `CollisionEvent`) are `Ok(StepStatus::..)`.
//! Event-buffer overflow is the one `CapacityError` case the spec marks
//! non-fatal and is not an error at all here (see `events::EventBuffer`).

use crate::events::Event;
use std::fmt;

/// Fatal error conditions raised by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum NbodyError {
    /// Bad input detected at a force-kernel or `set_state` boundary:
    /// negative mass, non-positive separation, NaN/infinite state.
    Domain(String),
    /// A Kepler or Gauss-Radau iteration failed to meet its convergence
    /// tolerance within the iteration cap. Carries the calling context and
    /// the iteration count reached.
    Convergence {
        context: &'static str,
        iterations: u32,
    },
    /// `N` exceeds the capacity fixed at `initialize_code`. Unlike event
    /// buffer overflow, capacity on `N` is fatal per the spec.
    Capacity { requested: usize, max: usize },
}

impl fmt::Display for NbodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NbodyError::Domain(msg) => write!(f, "domain error: {msg}"),
            NbodyError::Convergence {
                context,
                iterations,
            } => write!(
                f,
                "convergence failure in {context} after {iterations} iterations"
            ),
            NbodyError::Capacity { requested, max } => write!(
                f,
                "capacity error: requested N={requested} exceeds N_MAX={max}"
            ),
        }
    }
}

impl std::error::Error for NbodyError {}

/// Result of advancing an integrator towards `t_end`.
///
/// Mirrors the source's `{0, 1, 2}` return codes from `integrator_gr`/
/// `integrator_rk`/`integrator_wh` (§6), but as a typed enum carrying the
/// triggering event rather than a bare status code plus a side-channel
/// buffer read.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Integration reached `t_end` without a close encounter or collision.
    Ok,
    /// A close-encounter event fired; normal flow, not an error. The
    /// driver decides policy (§7).
    CloseEncounter(Event),
    /// A collision event fired; normal flow, not an error. Takes priority
    /// over a close encounter detected in the same step.
    Collision(Event),
}

impl StepStatus {
    /// The source's integer status code for this result (`{0, 1, 2}`),
    /// kept for parity with the external-interface table in the spec.
    pub fn code(&self) -> i32 {
        match self {
            StepStatus::Ok => 0,
            StepStatus::CloseEncounter(_) => 1,
            StepStatus::Collision(_) => 2,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type NbodyResult<T> = Result<T, NbodyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_codes_match_spec_table() {
        let ev = Event {
            time: 1.0,
            i: 0,
            j: 1,
            separation: 0.1,
        };
        assert_eq!(StepStatus::Ok.code(), 0);
        assert_eq!(StepStatus::CloseEncounter(ev).code(), 1);
        assert_eq!(StepStatus::Collision(ev).code(), 2);
    }

    #[test]
    fn domain_error_displays_message() {
        let err = NbodyError::Domain("negative mass".to_string());
        assert!(err.to_string().contains("negative mass"));
    }
}
