//! Trailing-edge debouncing of search triggers

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Coalesces bursts of triggers: only the last trigger in a burst fires.
pub struct Debouncer {
    interval: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: AtomicU64::new(0),
        }
    }

    /// Register a trigger and wait out the quiet period.
    ///
    /// Resolves to `true` if no later trigger arrived in the meantime.
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.interval).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}
