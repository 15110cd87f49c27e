//! Cache Instrumentation Module
//!
//! Tracks hit/miss counts and latencies for the fetch path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

// == Cache Metrics ==
/// Snapshot of the counters plus derived values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that went upstream
    pub misses: u64,
    /// hits + misses
    pub total_requests: u64,
    /// Mean latency of a hit, milliseconds
    pub avg_hit_ms: f64,
    /// Mean latency of a miss (full round trip), milliseconds
    pub avg_miss_ms: f64,
    /// hits / total_requests, 0.0 with no requests
    pub hit_rate: f64,
    /// avg_miss_ms / avg_hit_ms, 0.0 until both are known
    pub speedup_factor: f64,
    /// When counting started (construction or last reset)
    pub session_start: DateTime<Utc>,
    /// Whole seconds since `session_start`
    pub session_secs: i64,
}

#[derive(Debug)]
struct Counters {
    hits: u64,
    misses: u64,
    hit_time_total_ms: f64,
    miss_time_total_ms: f64,
    session_start: DateTime<Utc>,
}

impl Counters {
    fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            hit_time_total_ms: 0.0,
            miss_time_total_ms: 0.0,
            session_start: Utc::now(),
        }
    }

    fn snapshot(&self) -> CacheMetrics {
        let total_requests = self.hits + self.misses;
        let avg_hit_ms = average(self.hit_time_total_ms, self.hits);
        let avg_miss_ms = average(self.miss_time_total_ms, self.misses);
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / total_requests as f64
        };
        let speedup_factor = if avg_hit_ms > 0.0 && avg_miss_ms > 0.0 {
            avg_miss_ms / avg_hit_ms
        } else {
            0.0
        };

        CacheMetrics {
            hits: self.hits,
            misses: self.misses,
            total_requests,
            avg_hit_ms,
            avg_miss_ms,
            hit_rate,
            speedup_factor,
            session_start: self.session_start,
            session_secs: (Utc::now() - self.session_start).num_seconds(),
        }
    }
}

fn average(total: f64, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        total / samples as f64
    }
}

// == Instrumentation ==
/// Hit/miss recorder shared by every fetch.
///
/// Recording is O(1): running totals are kept and averages derived on
/// snapshot. When disabled every `record_*` call is a no-op.
#[derive(Debug)]
pub struct Instrumentation {
    enabled: AtomicBool,
    counters: Mutex<Counters>,
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Instrumentation {
    // == Constructor ==
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            counters: Mutex::new(Counters::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
        info!("Cache instrumentation enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    // == Record Hit ==
    pub fn record_hit(&self, identifier: &str, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let ms = elapsed.as_secs_f64() * 1000.0;
        {
            let mut counters = self.lock();
            counters.hits += 1;
            counters.hit_time_total_ms += ms;
        }
        debug!(identifier, elapsed_ms = ms, "cache hit");
    }

    // == Record Miss ==
    pub fn record_miss(&self, identifier: &str, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let ms = elapsed.as_secs_f64() * 1000.0;
        {
            let mut counters = self.lock();
            counters.misses += 1;
            counters.miss_time_total_ms += ms;
        }
        debug!(identifier, elapsed_ms = ms, "cache miss");
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> CacheMetrics {
        self.lock().snapshot()
    }

    // == Reset ==
    /// Clears counters and samples. The cache store is untouched.
    pub fn reset(&self) {
        *self.lock() = Counters::new();
        if self.is_enabled() {
            info!("Cache metrics reset");
        }
    }

    // == Report ==
    /// Logs a performance report. Silent while disabled.
    pub fn report(&self) {
        if !self.is_enabled() {
            return;
        }
        let m = self.snapshot();
        info!(
            "Cache performance: session {}s | requests {} | hits {} | misses {} | hit rate {:.1}%",
            m.session_secs,
            m.total_requests,
            m.hits,
            m.misses,
            m.hit_rate * 100.0
        );
        info!(
            "Cache latency: avg hit {:.2}ms | avg miss {:.2}ms",
            m.avg_hit_ms, m.avg_miss_ms
        );
        if m.speedup_factor > 0.0 {
            info!("Cache speedup: {:.1}x faster on hits", m.speedup_factor);
        }
    }

    // Counters hold plain numbers, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
