// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Score ledger rules: recompute from stored work, decay for silence.

use rustc_hash::FxHashMap;

use crate::state::ValidatorState;

/// Base score for a peer with accepted work in the window, and the
/// starting score for a freshly adopted population.
pub const SCORE_FLOOR: f64 = 1.0;

/// Default EMA retention for peers that did not answer this round.
pub const DECAY_ALPHA: f64 = 0.9;

impl ValidatorState {
    /// Refreshes scores from accepted-record counts within the trailing
    /// window.
    ///
    /// `counts` maps uid to the number of records the store accepted from
    /// that peer inside the window. A uid with counts scores floor + count.
    /// A uid absent from `counts` contributed nothing in the window and
    /// keeps its current score, so the per-round decay stays visible: a
    /// peer that went quiet fades gradually instead of snapping back to
    /// the floor. Blacklisted peers are forced to 0.0 regardless of
    /// counts: records they landed before detection earn nothing.
    pub fn recompute_scores(&mut self, counts: &FxHashMap<u16, u64>) {
        for uid in 0..self.peers.len() {
            let hotkey = self.peers[uid].hotkey.as_str();
            if self.blacklist.contains(hotkey) {
                self.scores[uid] = 0.0;
            } else if let Some(&count) = counts.get(&(uid as u16)) {
                self.scores[uid] = SCORE_FLOOR + count as f64;
            }
        }
        debug_assert_eq!(self.scores.len(), self.peers.len());
    }

    /// Exponential decay toward zero for the given uids.
    ///
    /// Applied each round to peers that were not queried or did not answer,
    /// so standing is earned continuously rather than held forever.
    /// Out-of-range uids are ignored.
    pub fn decay_scores(&mut self, uids: &[u16], alpha: f64) {
        for &uid in uids {
            if let Some(score) = self.scores.get_mut(uid as usize) {
                *score *= alpha;
            }
        }
    }
}
