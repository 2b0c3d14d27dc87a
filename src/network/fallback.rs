//! Ordered fallback across equivalent endpoints
//!
//! A chain holds labelled requests that are tried one after another until
//! one answers with a 2xx status. Transport errors and non-success statuses
//! both count as a failed attempt.

use super::client::HttpClient;
use super::types::{Request, Response};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// One failed attempt in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub label: &'static str,
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.reason)
    }
}

/// The attempt that succeeded, with the failures that preceded it
#[derive(Debug)]
pub struct FallbackSuccess {
    pub label: &'static str,
    pub response: Response,
    pub elapsed: Duration,
    pub failures: Vec<AttemptFailure>,
}

/// Ordered list of labelled requests
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    attempts: Vec<(&'static str, Request)>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt to the chain
    pub fn then(mut self, label: &'static str, request: Request) -> Self {
        self.attempts.push((label, request));
        self
    }

    /// Run attempts in order, stopping at the first success
    pub async fn run(self, client: &HttpClient) -> Result<FallbackSuccess, Vec<AttemptFailure>> {
        let mut failures = Vec::with_capacity(self.attempts.len());

        for (label, request) in self.attempts {
            let url = request.url.clone();
            let start = Instant::now();
            let reason = match client.execute(request).await {
                Ok(response) if response.is_success() => {
                    return Ok(FallbackSuccess {
                        label,
                        response,
                        elapsed: start.elapsed(),
                        failures,
                    });
                }
                Ok(response) => format!("HTTP {}", response.status),
                Err(e) => e.to_string(),
            };

            debug!("Attempt {} ({}) failed: {}", label, url, reason);
            failures.push(AttemptFailure { label, reason });
        }

        Err(failures)
    }
}
