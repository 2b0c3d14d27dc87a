//! HTTP networking module
//!
//! Provides the HTTP client, request/response values and the ordered
//! fallback helper used for primary/backup endpoints.

mod client;
mod fallback;
mod headers;
mod types;

pub use client::HttpClient;
pub use fallback::{AttemptFailure, FallbackChain, FallbackSuccess};
pub use headers::{HeaderProvider, StaticHeaders};
pub use types::{HttpMethod, Request, Response};
