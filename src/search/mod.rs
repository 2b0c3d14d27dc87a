//! Search orchestration module
//!
//! Drives query building, the catalog search and batched enrichment,
//! and owns pagination and the single-search-in-flight guard.

mod debounce;
mod models;
mod pagination;
mod session;

pub use debounce::Debouncer;
pub use models::*;
pub use pagination::{
    PaginationController, PaginationState, Phase, SearchMode, SkipReason,
};
pub use session::SearchSession;
