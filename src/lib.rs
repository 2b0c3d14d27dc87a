//! card-search: search, preview and import character cards
//!
//! Turns user filters into catalog queries, pages through the results,
//! enriches every result with its image in bounded concurrent batches and
//! imports a chosen card into the host application.

pub mod catalog;
pub mod config;
pub mod error;
pub mod import;
pub mod metrics;
pub mod network;
pub mod query;
pub mod search;

pub use catalog::{CatalogNode, DisplayEntity};
pub use config::Settings;
pub use error::CatalogError;
pub use import::{FileIngestor, ImportClient};
pub use query::{SearchRequest, SortKey};
pub use search::{SearchOutcome, SearchSession};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
