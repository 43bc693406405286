//! Process-wide request telemetry.
//!
//! Every request reports its lifecycle to a [`Telemetry`] implementation:
//!
//! ```text
//! on_start(route, path) -> [on_cache_hit | on_validator_match] -> on_error(route, path) | on_success()
//! ```
//!
//! [`CounterSet`] keeps lock-free scalar counters and per-key counters behind
//! a read-mostly lock: the write lock is only taken the first time a key is
//! seen, every later increment is an atomic add under the read lock.
//! [`NoopTelemetry`] discards everything.
//!
//! Readers take a [`TelemetrySnapshot`] and compute ratios and hot lists from
//! it. Snapshots may lag a few increments behind but never observe a
//! partial increment, and derived ratios never exceed 100%.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default length of the hot lists.
pub const DEFAULT_TOP_N: usize = 30;

/// Sink for request lifecycle events.
pub trait Telemetry: Send + Sync {
    fn on_start(&self, route: &str, path: &str);
    fn on_cache_hit(&self);
    fn on_validator_match(&self);
    fn on_error(&self, route: &str, path: &str);
    fn on_success(&self);
    fn snapshot(&self) -> TelemetrySnapshot;
}

/// Point-in-time copy of the counters.
///
/// Keyed counts are listed in the order their keys were first seen.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub request: u64,
    pub hit_cache: u64,
    pub etag: u64,
    pub error: u64,
    pub routes: Vec<(String, u64)>,
    pub paths: Vec<(String, u64)>,
    pub error_routes: Vec<(String, u64)>,
    pub error_paths: Vec<(String, u64)>,
    pub started_at: DateTime<Utc>,
    pub uptime: Duration,
}

impl TelemetrySnapshot {
    fn ratio(part: u64, whole: u64) -> f64 {
        if whole == 0 {
            0.0
        } else {
            (part as f64 / whole as f64).min(1.0)
        }
    }

    /// Share of requests answered from the response cache.
    pub fn hit_ratio(&self) -> f64 {
        Self::ratio(self.hit_cache, self.request)
    }

    /// Share of requests answered with 304 Not Modified.
    pub fn validator_ratio(&self) -> f64 {
        Self::ratio(self.etag, self.request)
    }

    /// Share of requests that did not fail. 0 before the first request.
    pub fn health_ratio(&self) -> f64 {
        if self.request == 0 {
            0.0
        } else {
            1.0 - Self::ratio(self.error, self.request)
        }
    }

    pub fn requests_per_minute(&self) -> f64 {
        let minutes = self.uptime.as_millis() as f64 / 60_000.0;
        if minutes <= 0.0 {
            0.0
        } else {
            self.request as f64 / minutes
        }
    }

    pub fn hot_routes(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.routes, n)
    }

    pub fn hot_paths(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.paths, n)
    }

    pub fn hot_error_routes(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.error_routes, n)
    }

    pub fn hot_error_paths(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.error_paths, n)
    }
}

/// The `n` entries with the largest counts.
///
/// `counts` must be in first-seen order; equal counts keep that order.
pub fn top_n(counts: &[(String, u64)], n: usize) -> Vec<(String, u64)> {
    counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(n)
        .cloned()
        .collect()
}

#[derive(Debug)]
struct Slot {
    seq: u64,
    count: AtomicU64,
}

/// Counters keyed by route template or concrete path.
#[derive(Debug, Default)]
struct KeyedCounts {
    slots: RwLock<HashMap<String, Slot>>,
}

impl KeyedCounts {
    fn incr(&self, key: &str) {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get(key) {
                slot.count.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let seq = slots.len() as u64;
        slots
            .entry(key.to_string())
            .or_insert_with(|| Slot {
                seq,
                count: AtomicU64::new(0),
            })
            .count
            .fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Vec<(String, u64)> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots
            .iter()
            .map(|(key, slot)| (slot.seq, key.clone(), slot.count.load(Ordering::SeqCst)))
            .sorted_by_key(|(seq, _, _)| *seq)
            .map(|(_, key, count)| (key, count))
            .collect()
    }
}

/// In-memory [`Telemetry`] shared by every request of the process.
#[derive(Debug)]
pub struct CounterSet {
    request: AtomicU64,
    hit_cache: AtomicU64,
    etag: AtomicU64,
    error: AtomicU64,
    routes: KeyedCounts,
    paths: KeyedCounts,
    error_routes: KeyedCounts,
    error_paths: KeyedCounts,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl CounterSet {
    pub fn new() -> Self {
        Self {
            request: AtomicU64::new(0),
            hit_cache: AtomicU64::new(0),
            etag: AtomicU64::new(0),
            error: AtomicU64::new(0),
            routes: KeyedCounts::default(),
            paths: KeyedCounts::default(),
            error_routes: KeyedCounts::default(),
            error_paths: KeyedCounts::default(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

impl Default for CounterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for CounterSet {
    fn on_start(&self, route: &str, path: &str) {
        self.request.fetch_add(1, Ordering::SeqCst);
        self.routes.incr(route);
        self.paths.incr(path);
    }

    fn on_cache_hit(&self) {
        self.hit_cache.fetch_add(1, Ordering::SeqCst);
    }

    fn on_validator_match(&self) {
        self.etag.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, route: &str, path: &str) {
        self.error.fetch_add(1, Ordering::SeqCst);
        self.error_routes.incr(route);
        self.error_paths.incr(path);
        debug!(route, path, "Recorded request error");
    }

    fn on_success(&self) {}

    fn snapshot(&self) -> TelemetrySnapshot {
        // Sub-counters are read before `request`: each of them is only ever
        // incremented after the request's own `request` increment.
        let hit_cache = self.hit_cache.load(Ordering::SeqCst);
        let etag = self.etag.load(Ordering::SeqCst);
        let error = self.error.load(Ordering::SeqCst);
        let error_routes = self.error_routes.snapshot();
        let error_paths = self.error_paths.snapshot();
        let request = self.request.load(Ordering::SeqCst);

        TelemetrySnapshot {
            request,
            hit_cache,
            etag,
            error,
            routes: self.routes.snapshot(),
            paths: self.paths.snapshot(),
            error_routes,
            error_paths,
            started_at: self.started_at,
            uptime: self.started.elapsed(),
        }
    }
}

/// [`Telemetry`] that records nothing.
#[derive(Debug)]
pub struct NoopTelemetry {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for NoopTelemetry {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

impl Telemetry for NoopTelemetry {
    fn on_start(&self, _route: &str, _path: &str) {}
    fn on_cache_hit(&self) {}
    fn on_validator_match(&self) {}
    fn on_error(&self, _route: &str, _path: &str) {}
    fn on_success(&self) {}

    fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            request: 0,
            hit_cache: 0,
            etag: 0,
            error: 0,
            routes: Vec::new(),
            paths: Vec::new(),
            error_routes: Vec::new(),
            error_paths: Vec::new(),
            started_at: self.started_at,
            uptime: self.started.elapsed(),
        }
    }
}
