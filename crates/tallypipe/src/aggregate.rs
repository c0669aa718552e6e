//! Aggregate Table: per-key running totals with a descending ranked view.

use crate::invariants::debug_assert_ranked_descending;
use crate::sync::{lock, Mutex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// When the ranked view is rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankPolicy {
    /// Re-sort on every fold: O(k log k) per event, view always current.
    Eager,
    /// Mark the view stale on fold and sort once when it is read.
    #[default]
    Lazy,
}

impl FromStr for RankPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!("unknown rank policy {other:?} (expected eager or lazy)")),
        }
    }
}

impl fmt::Display for RankPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => f.write_str("eager"),
            Self::Lazy => f.write_str("lazy"),
        }
    }
}

/// Shared `key -> total` table folded into by every consumer.
///
/// A single mutex covers the lookup, the update and (under
/// [`RankPolicy::Eager`]) the re-sort, so each fold is atomic with respect
/// to every other. Ties in the ranked view keep first-seen key order.
pub struct AggregateTable {
    state: Mutex<TableState>,
    policy: RankPolicy,
}

struct TableState {
    /// `(key, total)` in first-seen order.
    entries: Vec<(i64, i64)>,
    /// Key to position in `entries`.
    index: HashMap<i64, usize>,
    ranked: Vec<(i64, i64)>,
    stale: bool,
    folds: u64,
}

impl TableState {
    fn rerank(&mut self) {
        self.ranked.clone_from(&self.entries);
        // Stable sort, so equal totals stay in first-seen order.
        self.ranked.sort_by(|a, b| b.1.cmp(&a.1));
        debug_assert_ranked_descending!(self.ranked);
        self.stale = false;
    }
}

impl AggregateTable {
    pub fn new(policy: RankPolicy) -> Self {
        Self {
            state: Mutex::new(TableState {
                entries: Vec::new(),
                index: HashMap::new(),
                ranked: Vec::new(),
                stale: false,
                folds: 0,
            }),
            policy,
        }
    }

    /// Adds `delta` to `key`'s total (inserting it if new) and updates the
    /// ranked view according to the table's policy.
    pub fn add_and_rank(&self, key: i64, delta: i64) {
        let mut state = lock(&self.state);
        let existing = state.index.get(&key).copied();
        match existing {
            Some(pos) => {
                let total = &mut state.entries[pos].1;
                *total = total.saturating_add(delta);
            }
            None => {
                let pos = state.entries.len();
                state.entries.push((key, delta));
                state.index.insert(key, pos);
            }
        }
        state.folds += 1;

        match self.policy {
            RankPolicy::Eager => state.rerank(),
            RankPolicy::Lazy => state.stale = true,
        }
    }

    /// The full ranked view, descending by total.
    pub fn ranked(&self) -> Vec<(i64, i64)> {
        let mut state = lock(&self.state);
        if state.stale {
            state.rerank();
        }
        state.ranked.clone()
    }

    /// The `n` highest totals.
    pub fn top(&self, n: usize) -> Vec<(i64, i64)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Consumes the table, returning its ranked view without cloning.
    pub fn into_ranked(self) -> Vec<(i64, i64)> {
        let mut state = self
            .state
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.stale {
            state.rerank();
        }
        state.ranked
    }

    pub fn total(&self, key: i64) -> Option<i64> {
        let state = lock(&self.state);
        state.index.get(&key).map(|&pos| state.entries[pos].1)
    }

    /// Snapshot of every key's total.
    pub fn totals(&self) -> HashMap<i64, i64> {
        lock(&self.state).entries.iter().copied().collect()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `add_and_rank` calls so far.
    pub fn folds(&self) -> u64 {
        lock(&self.state).folds
    }
}

impl Default for AggregateTable {
    fn default() -> Self {
        Self::new(RankPolicy::default())
    }
}
