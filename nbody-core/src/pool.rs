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
//! Memory pooling for reducing allocation churn in the integrators.
//!
//! Gauss-Radau in particular allocates several `3N`-length scratch buffers
//! per step (predicted positions/velocities, per-node accelerations, `b`
//! and `g` coefficient arrays). `VecPool` lets integrators borrow and
//! return these rather than allocating fresh `Vec<f64>`s every step.

use std::sync::{Arc, Mutex};

/// Configuration for buffer pool behavior.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Initial capacity (in `f64` elements) for each buffer in the pool.
    pub initial_capacity: usize,
    /// Maximum number of buffers to keep in the pool.
    pub max_pool_size: usize,
    /// Growth factor when a borrowed buffer needs more capacity than it
    /// currently has (e.g. `2.0` for doubling).
    pub growth_factor: f64,
    /// Whether to log when the pool allocates a new buffer.
    pub log_resize_events: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            initial_capacity: 64,
            max_pool_size: 8,
            growth_factor: 2.0,
            log_resize_events: false,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with custom settings.
    pub fn new(initial_capacity: usize, max_pool_size: usize) -> Self {
        PoolConfig {
            initial_capacity,
            max_pool_size,
            growth_factor: 2.0,
            log_resize_events: false,
        }
    }

    /// Enable logging for allocation events.
    pub fn with_logging(mut self) -> Self {
        self.log_resize_events = true;
        self
    }

    /// Set the growth factor for buffer capacity expansion.
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        assert!(factor >= 1.0, "Growth factor must be >= 1.0");
        self.growth_factor = factor;
        self
    }
}

/// Statistics for monitoring pool performance.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of times a buffer was successfully borrowed from the pool.
    pub hits: usize,
    /// Number of times a new buffer had to be allocated.
    pub misses: usize,
    /// Current number of buffers sitting in the pool.
    pub pool_size: usize,
    /// Peak number of buffers ever held in the pool at once.
    pub peak_size: usize,
}

impl PoolStats {
    /// Calculate the hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// A thread-safe pool of `Vec<f64>` scratch buffers, each zero-filled to a
/// requested length on acquire.
pub struct VecPool {
    pool: Arc<Mutex<Vec<Vec<f64>>>>,
    config: PoolConfig,
    stats: Arc<Mutex<PoolStats>>,
}

impl VecPool {
    /// Create a new pool with default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a new pool with custom configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        VecPool {
            pool: Arc::new(Mutex::new(Vec::new())),
            config,
            stats: Arc::new(Mutex::new(PoolStats::default())),
        }
    }

    /// Borrow a zero-filled buffer of exactly `len` elements.
    ///
    /// If the pool has a spare buffer, it is resized (and zeroed) to `len`
    /// in place; otherwise a new one is allocated with capacity at least
    /// `max(len, initial_capacity)`. The buffer is returned to the pool
    /// when the guard is dropped.
    pub fn acquire(&self, len: usize) -> VecGuard {
        let (mut buffer, was_hit, pool_len) = {
            let mut pool = self.pool.lock().unwrap();
            let was_hit = !pool.is_empty();
            let buf = pool.pop().unwrap_or_else(|| {
                Vec::with_capacity(len.max(self.config.initial_capacity))
            });
            let plen = pool.len();
            (buf, was_hit, plen)
        };
        buffer.clear();
        buffer.resize(len, 0.0);

        {
            let mut stats = self.stats.lock().unwrap();
            if was_hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
                if self.config.log_resize_events {
                    eprintln!(
                        "VecPool: allocating new buffer (hit rate: {:.1}%)",
                        stats.hit_rate()
                    );
                }
            }
            stats.pool_size = pool_len;
        }

        VecGuard {
            buffer: Some(buffer),
            pool: Arc::clone(&self.pool),
            stats: Arc::clone(&self.stats),
            max_pool_size: self.config.max_pool_size,
        }
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().unwrap().clone()
    }

    /// Drop every buffer currently sitting in the pool.
    pub fn clear(&self) {
        {
            let mut pool = self.pool.lock().unwrap();
            pool.clear();
        }
        {
            let mut stats = self.stats.lock().unwrap();
            stats.pool_size = 0;
        }
    }

    /// Number of buffers currently sitting in the pool.
    pub fn len(&self) -> usize {
        self.pool.lock().unwrap().len()
    }

    /// Whether the pool currently holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.pool.lock().unwrap().is_empty()
    }
}

impl Default for VecPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VecPool {
    fn clone(&self) -> Self {
        VecPool {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// RAII guard for a pooled `Vec<f64>`. Returns the buffer to the pool when
/// dropped, unless the pool is already at `max_pool_size`.
pub struct VecGuard {
    buffer: Option<Vec<f64>>,
    pool: Arc<Mutex<Vec<Vec<f64>>>>,
    stats: Arc<Mutex<PoolStats>>,
    max_pool_size: usize,
}

impl std::ops::Deref for VecGuard {
    type Target = Vec<f64>;

    fn deref(&self) -> &Self::Target {
        self.buffer.as_ref().unwrap()
    }
}

impl std::ops::DerefMut for VecGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_mut().unwrap()
    }
}

impl Drop for VecGuard {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            let mut pool = self.pool.lock().unwrap();
            if pool.len() < self.max_pool_size {
                pool.push(buffer);
                let mut stats = self.stats.lock().unwrap();
                stats.pool_size = pool.len();
                if stats.pool_size > stats.peak_size {
                    stats.peak_size = stats.pool_size;
                }
            }
            // If the pool is already full, the buffer is simply dropped.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.max_pool_size, 8);
        assert_eq!(config.growth_factor, 2.0);
        assert!(!config.log_resize_events);
    }

    #[test]
    fn pool_config_custom() {
        let config = PoolConfig::new(128, 16).with_growth_factor(1.5).with_logging();
        assert_eq!(config.initial_capacity, 128);
        assert_eq!(config.max_pool_size, 16);
        assert_eq!(config.growth_factor, 1.5);
        assert!(config.log_resize_events);
    }

    #[test]
    fn acquire_returns_zeroed_buffer_of_requested_length() {
        let pool = VecPool::new();
        let guard = pool.acquire(9);
        assert_eq!(guard.len(), 9);
        assert!(guard.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn buffer_is_reused_and_rezeroed() {
        let pool = VecPool::new();
        {
            let mut guard = pool.acquire(4);
            guard[0] = 42.0;
        }
        assert_eq!(pool.len(), 1);
        {
            let guard = pool.acquire(4);
            assert!(guard.iter().all(|&x| x == 0.0));
        }
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn reused_buffer_can_grow_to_a_longer_request() {
        let pool = VecPool::new();
        {
            let _g = pool.acquire(4);
        }
        let guard = pool.acquire(100);
        assert_eq!(guard.len(), 100);
    }

    #[test]
    fn pool_respects_max_pool_size() {
        let config = PoolConfig::new(32, 2);
        let pool = VecPool::with_config(config);
        {
            let _g1 = pool.acquire(8);
            let _g2 = pool.acquire(8);
            let _g3 = pool.acquire(8);
        }
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn clear_empties_the_pool() {
        let pool = VecPool::new();
        {
            let _g1 = pool.acquire(8);
            let _g2 = pool.acquire(8);
        }
        assert_eq!(pool.len(), 2);
        pool.clear();
        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn guard_deref_mut_allows_in_place_edits() {
        let pool = VecPool::new();
        let mut guard = pool.acquire(3);
        guard[1] = 7.0;
        assert_eq!(guard[1], 7.0);
    }

    #[test]
    fn concurrent_acquire_from_multiple_threads() {
        use std::thread;
        let pool = VecPool::new();
        let pool_clone = pool.clone();
        let handle = thread::spawn(move || {
            let mut guard = pool_clone.acquire(5);
            guard[0] = 1.0;
        });
        let mut guard = pool.acquire(5);
        guard[0] = 2.0;
        drop(guard);
        handle.join().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.misses, 2);
    }
}
