//! Search outcome and progress models

use super::pagination::SkipReason;
use crate::catalog::DisplayEntity;

/// What happened to a search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The page was fetched and enriched
    Completed {
        page: u32,
        /// Nodes returned by the catalog
        nodes: usize,
        /// Entities added to the session's results
        added: usize,
        /// Nodes dropped because their image could not be fetched
        failures: usize,
    },
    /// Refused by the pagination guard, no request was made
    Skipped(SkipReason),
    /// A later trigger arrived during the debounce interval
    Superseded,
}

impl SearchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Delivered to the presentation layer after every enrichment batch
#[derive(Debug)]
pub struct SearchProgress<'a> {
    pub page: u32,
    /// Zero-based batch number within this page
    pub batch: usize,
    pub total_batches: usize,
    /// The session's whole result set, previous pages included
    pub entities: &'a [DisplayEntity],
}

impl SearchProgress<'_> {
    pub fn is_last(&self) -> bool {
        self.batch + 1 == self.total_batches
    }
}
