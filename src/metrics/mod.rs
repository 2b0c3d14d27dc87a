//! Metrics collection module
//!
//! Tracks searches and per-endpoint fetch outcomes (primary download,
//! backup avatar, import endpoints).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Response times kept per endpoint
const RESPONSE_TIME_WINDOW: usize = 100;

/// Metrics collector shared by the pipeline components
pub struct Metrics {
    /// Total searches issued to the catalog
    total_searches: AtomicU64,
    /// Endpoint response times (rolling window in ms)
    response_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Endpoint error counts
    errors: RwLock<HashMap<String, u64>>,
    /// Endpoint success counts
    successes: RwLock<HashMap<String, u64>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            response_times: RwLock::new(HashMap::new()),
            errors: RwLock::new(HashMap::new()),
            successes: RwLock::new(HashMap::new()),
        }
    }

    /// Increment total search count
    pub fn inc_search(&self) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful call and how long it took
    pub fn record_success(&self, endpoint: &str, elapsed: Duration) {
        {
            let mut successes = self.successes.write().unwrap();
            *successes.entry(endpoint.to_string()).or_insert(0) += 1;
        }

        let mut times = self.response_times.write().unwrap();
        let entry = times.entry(endpoint.to_string()).or_default();
        if entry.len() >= RESPONSE_TIME_WINDOW {
            entry.remove(0);
        }
        entry.push(elapsed.as_millis() as u64);
    }

    /// Record a failed call
    pub fn record_error(&self, endpoint: &str) {
        let mut errors = self.errors.write().unwrap();
        *errors.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    /// Get total searches
    pub fn total_searches(&self) -> u64 {
        self.total_searches.load(Ordering::Relaxed)
    }

    pub fn successes(&self, endpoint: &str) -> u64 {
        *self.successes.read().unwrap().get(endpoint).unwrap_or(&0)
    }

    pub fn errors(&self, endpoint: &str) -> u64 {
        *self.errors.read().unwrap().get(endpoint).unwrap_or(&0)
    }

    /// Get average response time for an endpoint
    pub fn avg_response_time(&self, endpoint: &str) -> Option<u64> {
        let times = self.response_times.read().unwrap();
        times.get(endpoint).and_then(|t| {
            if t.is_empty() {
                None
            } else {
                Some(t.iter().sum::<u64>() / t.len() as u64)
            }
        })
    }

    /// Get reliability percentage for an endpoint
    pub fn reliability(&self, endpoint: &str) -> f64 {
        let error_count = self.errors(endpoint);
        let success_count = self.successes(endpoint);

        let total = error_count + success_count;
        if total == 0 {
            100.0
        } else {
            (success_count as f64 / total as f64) * 100.0
        }
    }

    /// Statistics for every endpoint seen so far
    pub fn endpoint_stats(&self) -> HashMap<String, EndpointStats> {
        let mut names: Vec<String> = self.successes.read().unwrap().keys().cloned().collect();
        names.extend(self.errors.read().unwrap().keys().cloned());
        names.sort();
        names.dedup();

        names
            .into_iter()
            .map(|name| {
                let stats = EndpointStats {
                    successes: self.successes(&name),
                    errors: self.errors(&name),
                    avg_response_time: self.avg_response_time(&name),
                    reliability: self.reliability(&name),
                };
                (name, stats)
            })
            .collect()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single endpoint
#[derive(Debug, Clone)]
pub struct EndpointStats {
    pub successes: u64,
    pub errors: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}
