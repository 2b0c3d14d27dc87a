//! Catalog module
//!
//! Search endpoint client, raw node and display entity models, and the
//! batched image enricher.

mod client;
mod enricher;
mod models;

pub use client::CatalogSearchClient;
pub use enricher::{EnrichedBatch, EntityEnricher, AVATAR_ENDPOINT, DOWNLOAD_ENDPOINT};
pub use models::*;
