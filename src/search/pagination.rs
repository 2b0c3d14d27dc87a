//! Pagination state machine
//!
//! ```text
//! Idle ──begin(fresh|append)──▶ Loading ──finish(n ≥ findCount)──▶ Idle
//!                                  │
//!                                  └──finish(n < findCount)──▶ Exhausted
//! Exhausted ──begin(fresh)──▶ Loading
//! ```
//!
//! `begin` while loading is refused; so is an append once exhausted.

use serde::Serialize;

/// Whether a search replaces or extends the current results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchMode {
    Fresh,
    Append,
}

/// Coarse state derived from [`PaginationState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Loading,
    Exhausted,
}

/// Why a search request was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Another search is still running
    InFlight,
    /// The last page came back short; only a fresh search continues
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current_page: u32,
    pub has_more_results: bool,
    pub is_loading: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_more_results: true,
            is_loading: false,
        }
    }
}

impl PaginationState {
    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if !self.has_more_results {
            Phase::Exhausted
        } else {
            Phase::Idle
        }
    }
}

#[derive(Debug, Default)]
pub struct PaginationController {
    state: PaginationState,
    /// State to restore if the running search fails
    rollback: PaginationState,
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Enter `Loading` and return the page to request
    pub fn begin(&mut self, mode: SearchMode) -> Result<u32, SkipReason> {
        if self.state.is_loading {
            return Err(SkipReason::InFlight);
        }

        match mode {
            SearchMode::Fresh => {
                self.rollback = self.state;
                self.state = PaginationState {
                    is_loading: true,
                    ..PaginationState::default()
                };
            }
            SearchMode::Append => {
                if !self.state.has_more_results {
                    return Err(SkipReason::Exhausted);
                }
                self.rollback = self.state;
                self.state.current_page += 1;
                self.state.is_loading = true;
            }
        }

        Ok(self.state.current_page)
    }

    /// Leave `Loading` after a page of `count` results
    pub fn finish(&mut self, count: usize, find_count: u32) {
        self.state.is_loading = false;
        if count == 0 || count < find_count as usize {
            self.state.has_more_results = false;
        }
    }

    /// Leave `Loading` after a failed search. The state from before
    /// `begin` comes back, so it keeps matching the results still shown.
    pub fn fail(&mut self) {
        if self.state.is_loading {
            self.state = PaginationState {
                is_loading: false,
                ..self.rollback
            };
        }
    }

    /// Back to the initial state, unless a search is running
    pub fn reset(&mut self) -> bool {
        if self.state.is_loading {
            return false;
        }
        self.state = PaginationState::default();
        self.rollback = PaginationState::default();
        true
    }
}
