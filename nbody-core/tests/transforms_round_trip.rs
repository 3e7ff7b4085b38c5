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
//! Round-trip property from `SPEC_FULL.md` §8: inertial ->
//! democratic-heliocentric -> inertial returns the original state to
//! <= 1e-14 relative, for a several-body configuration.

use nbody_core::transforms::{barycenter, from_democratic_heliocentric, to_democratic_heliocentric};

#[test]
fn four_body_round_trip_within_tolerance() {
    let pos = vec![
        0.01, -0.02, 0.005, // body 0 (central)
        1.0, 0.0, 0.0, // body 1
        0.0, 5.2, 0.1, // body 2
        -3.0, -3.0, 0.2, // body 3
    ];
    let vel = vec![
        0.0001, 0.0002, -0.00005, 0.0, 1.0, 0.0, -0.43, 0.0, 0.0, 0.0, -0.3, 0.01,
    ];
    let mass = vec![1.0, 3e-6, 9.5e-4, 4.3e-5];
    let n = 4;

    let (bary_pos, bary_vel) = barycenter(&pos, &vel, &mass, n);

    let mut q = vec![0.0; 3 * n];
    let mut p = vec![0.0; 3 * n];
    to_democratic_heliocentric(&pos, &vel, &mass, n, &mut q, &mut p);

    let mut pos2 = vec![0.0; 3 * n];
    let mut vel2 = vec![0.0; 3 * n];
    from_democratic_heliocentric(&q, &p, &mass, n, bary_pos, bary_vel, &mut pos2, &mut vel2);

    for k in 0..3 * n {
        let scale = pos[k].abs().max(1.0);
        assert!((pos[k] - pos2[k]).abs() / scale < 1e-14, "pos[{k}]");
        let vscale = vel[k].abs().max(1.0);
        assert!((vel[k] - vel2[k]).abs() / vscale < 1e-14, "vel[{k}]");
    }
}
