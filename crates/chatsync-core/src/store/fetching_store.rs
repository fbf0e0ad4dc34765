use crate::models::Narrow;
use serde::Serialize;
use std::collections::HashMap;

/// In-flight fetch state of one narrow.
///
/// `Unfetched` is distinct from `Fetching { older: false, newer: false }`:
/// the latter means at least one fetch has started and all have finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Unfetched,
    Fetching { older: bool, newer: bool },
}

impl FetchStatus {
    pub fn is_fetching_older(&self) -> bool {
        matches!(self, FetchStatus::Fetching { older: true, .. })
    }

    pub fn is_fetching_newer(&self) -> bool {
        matches!(self, FetchStatus::Fetching { newer: true, .. })
    }
}

/// Sub-store tracking which directions of each narrow have a fetch in flight.
/// Search narrows are never tracked.
pub struct FetchingStore {
    statuses: HashMap<String, FetchStatus>,
}

impl FetchingStore {
    pub fn new() -> Self {
        Self {
            statuses: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
    }

    // ===== Getters =====

    pub fn status(&self, narrow: &Narrow) -> FetchStatus {
        self.statuses.get(&narrow.key()).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    // ===== Event Handlers =====

    pub fn fetch_start(&mut self, narrow: &Narrow, num_before: u32, num_after: u32) {
        if narrow.is_search() {
            return;
        }
        let status = self.statuses.entry(narrow.key()).or_default();
        let (older, newer) = match *status {
            FetchStatus::Unfetched => (false, false),
            FetchStatus::Fetching { older, newer } => (older, newer),
        };
        *status = FetchStatus::Fetching {
            older: older || num_before > 0,
            newer: newer || num_after > 0,
        };
    }

    pub fn fetch_complete(&mut self, narrow: &Narrow, num_before: u32, num_after: u32) {
        if narrow.is_search() {
            return;
        }
        let status = self.statuses.entry(narrow.key()).or_default();
        let (older, newer) = match *status {
            FetchStatus::Unfetched => (false, false),
            FetchStatus::Fetching { older, newer } => (older, newer),
        };
        *status = FetchStatus::Fetching {
            older: older && num_before == 0,
            newer: newer && num_after == 0,
        };
    }

    pub fn fetch_error(&mut self, narrow: &Narrow) {
        self.statuses.remove(&narrow.key());
    }
}
