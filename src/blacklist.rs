// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fabricator registry.
//!
//! Keys in here are hotkeys, not uids: uids get reassigned when a peer
//! deregisters, hotkeys do not. Membership removal happens only through
//! [`BlacklistSet::reconcile`] against the live population.

use rustc_hash::FxHashSet;

use crate::claim::PeerIdentity;

/// Set of hotkeys barred from scoring and querying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlacklistSet {
    keys: FxHashSet<String>,
}

impl BlacklistSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the set from persisted keys.
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, hotkey: &str) -> bool {
        self.keys.contains(hotkey)
    }

    /// Adds a hotkey. Returns true only on the first insertion; callers use
    /// that to trigger an immediate state save without re-saving on repeats.
    pub fn insert(&mut self, hotkey: impl Into<String>) -> bool {
        self.keys.insert(hotkey.into())
    }

    /// Drops entries whose hotkey no longer appears in the population.
    /// Returns how many were removed.
    pub fn reconcile(&mut self, population: &[PeerIdentity]) -> usize {
        let live: FxHashSet<&str> = population.iter().map(|p| p.hotkey.as_str()).collect();
        let before = self.keys.len();
        self.keys.retain(|k| live.contains(k.as_str()));
        before - self.keys.len()
    }

    /// Sorted copy for persistence. Sorting keeps snapshots byte-stable
    /// across runs.
    pub fn snapshot_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }
}
