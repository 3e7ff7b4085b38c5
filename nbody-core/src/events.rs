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
//! Close-encounter and collision event buffers, and the pairwise scan that
//! feeds them.
//!
//! Buffers are fixed-capacity and "last-event-wins": once full, every new
//! write replaces the newest slot rather than the oldest, so the most
//! recently detected event is always readable at the end of the buffer.
//! This matches how the original ABIE driver consumes them
//! (`col_buf[-1, :]` in `clibabie.py::integrator_gr`) — the ctypes layer
//! never iterates the whole buffer, it only ever reads the last row.

use crate::error::StepStatus;

/// A single close-encounter or collision record: `(time, i, j, separation)`.
///
/// Indices satisfy `0 <= i < j < N` (spec §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: f64,
    pub i: usize,
    pub j: usize,
    pub separation: f64,
}

impl Event {
    /// Format as the wire/disk line format from spec §6:
    /// `<time> <i> <j> <distance>\n`.
    pub fn to_line(&self) -> String {
        format!("{} {} {} {}\n", self.time, self.i, self.j, self.separation)
    }
}

/// A fixed-capacity, last-event-wins event ring.
///
/// `capacity` must be `>= 1` (spec §3: `MAX_CE >= 1`). Overflow past
/// capacity is non-fatal per §7: the newest event silently overwrites the
/// last slot and `overflow_count` increments.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    capacity: usize,
    events: Vec<Event>,
    overflow_count: usize,
}

impl EventBuffer {
    /// Create a new buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "event buffer capacity must be >= 1");
        EventBuffer {
            capacity,
            events: Vec::with_capacity(capacity),
            overflow_count: 0,
        }
    }

    /// Append an event, overwriting the newest slot if the buffer is full.
    pub fn push(&mut self, event: Event) {
        if self.events.len() < self.capacity {
            self.events.push(event);
        } else {
            self.overflow_count += 1;
            *self.events.last_mut().expect("capacity >= 1") = event;
        }
    }

    /// The most recently written event, if any (`col_buf[-1]` in the
    /// source's ctypes layer).
    pub fn latest(&self) -> Option<Event> {
        self.events.last().copied()
    }

    /// All recorded events, in write order (oldest first).
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of writes that overwrote an existing slot because the
    /// buffer was full.
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    /// The buffer's fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all recorded events and the overflow counter
    /// (`reset_ce_buffer` / `reset_collision_buffer`).
    pub fn reset(&mut self) {
        self.events.clear();
        self.overflow_count = 0;
    }
}

/// Scan all unordered pairs `(i, j)` for collisions and close encounters.
///
/// Collision (`d <= radius_i + radius_j`) takes priority over a close
/// encounter (`d <= ce_distance`, when `ce_distance > 0`) detected in the
/// same step (spec §4.2): the full pair set is scanned first, and a
/// collision on *any* pair wins even if a different, lower-indexed pair
/// is merely a close encounter. Only the first qualifying pair of each
/// kind is recorded, matching the source's single-slot buffer semantics.
///
/// `pos` is the inertial-frame flat `3N` position array.
#[allow(clippy::too_many_arguments)]
pub fn scan_events(
    pos: &[f64],
    radius: &[f64],
    n: usize,
    t: f64,
    ce_distance: f64,
    ce_buf: &mut EventBuffer,
    col_buf: &mut EventBuffer,
) -> StepStatus {
    let mut collision: Option<Event> = None;
    let mut close_encounter: Option<Event> = None;

    for i in 0..n {
        for j in (i + 1)..n {
            let d = crate::vector::norm(crate::vector::sub(
                crate::vector::read3(pos, i),
                crate::vector::read3(pos, j),
            ));
            if collision.is_none() && d <= radius[i] + radius[j] {
                collision = Some(Event {
                    time: t,
                    i,
                    j,
                    separation: d,
                });
            } else if close_encounter.is_none() && ce_distance > 0.0 && d <= ce_distance {
                close_encounter = Some(Event {
                    time: t,
                    i,
                    j,
                    separation: d,
                });
            }
        }
    }

    if let Some(ev) = collision {
        col_buf.push(ev);
        return StepStatus::Collision(ev);
    }
    if let Some(ev) = close_encounter {
        ce_buf.push(ev);
        return StepStatus::CloseEncounter(ev);
    }
    StepStatus::Ok
}
