// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Validator state: the one mutable structure every component works on.
//!
//! A single round loop owns this struct and passes it by reference into the
//! engine calls. There is no interior mutability and no locking; ordering
//! inside a round is the concurrency model.

use crate::blacklist::BlacklistSet;
use crate::claim::PeerIdentity;
use crate::score::SCORE_FLOOR;

/// Everything the validator accumulates across rounds.
///
/// Invariant: `scores.len() == peers.len()` after every public method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorState {
    /// Population snapshot from the last chain sync, uid-ordered.
    pub peers: Vec<PeerIdentity>,
    /// Trust scores, index-aligned with `peers`.
    pub scores: Vec<f64>,
    /// Hotkeys barred for fabrication.
    pub blacklist: BlacklistSet,
    /// Rounds completed since genesis of this validator's state file.
    pub round: u64,
    /// Partition cursor: which window of the population the next round asks.
    pub target_group: usize,
    /// Block height of the last successful weight commit.
    pub last_commit_block: u64,
}

/// What a population sync changed, for the round log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Indices whose hotkey changed while the population size held.
    pub replaced: usize,
    /// Blacklist entries dropped because their hotkey left the population.
    pub unblacklisted: usize,
    /// Whole score vector was reset because the population shrank.
    pub reset: bool,
}

impl ValidatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from persisted parts, repairing length mismatches
    /// instead of failing: the score vector is resized to the hotkey list,
    /// missing entries default to zero.
    pub fn restore(
        hotkeys: Vec<String>,
        mut scores: Vec<f64>,
        blacklist: Vec<String>,
        round: u64,
        target_group: usize,
        last_commit_block: u64,
    ) -> Self {
        scores.resize(hotkeys.len(), 0.0);
        let peers = hotkeys
            .into_iter()
            .enumerate()
            .map(|(uid, hotkey)| PeerIdentity { uid: uid as u16, hotkey })
            .collect();
        Self {
            peers,
            scores,
            blacklist: BlacklistSet::from_keys(blacklist),
            round,
            target_group,
            last_commit_block,
        }
    }

    pub fn population(&self) -> usize {
        self.peers.len()
    }

    pub fn hotkey_of(&self, uid: u16) -> Option<&str> {
        self.peers.get(uid as usize).map(|p| p.hotkey.as_str())
    }

    pub fn is_blacklisted_uid(&self, uid: u16) -> bool {
        match self.hotkey_of(uid) {
            Some(hotkey) => self.blacklist.contains(hotkey),
            None => false,
        }
    }

    /// Blacklists the peer at `uid`. Returns true on first insertion so the
    /// caller can persist immediately.
    pub fn blacklist_uid(&mut self, uid: u16) -> bool {
        match self.hotkey_of(uid).map(str::to_owned) {
            Some(hotkey) => self.blacklist.insert(hotkey),
            None => false,
        }
    }

    /// Reconciles local state against a fresh population snapshot.
    ///
    /// Rules, applied in order:
    /// - first sync (no prior population): everyone starts at the floor,
    ///   there is no history to distinguish peers yet;
    /// - same index, different hotkey: that slot's score resets to 0.0
    ///   (the uid was re-registered by a new peer with no track record);
    /// - population grew: surviving scores keep their value, new slots
    ///   start at 0.0 and earn their way up;
    /// - population shrank: the whole score vector resets to floor
    ///   defaults. Shrink means uids were compacted and index alignment
    ///   is gone.
    ///
    /// The blacklist is then reconciled so departed hotkeys drop out.
    ///
    /// `incoming` must be uid-ordered and gapless: every peer's uid equals
    /// its index. Boundary code validates snapshots before they get here.
    pub fn sync_population(&mut self, incoming: Vec<PeerIdentity>) -> SyncReport {
        debug_assert!(
            incoming.iter().enumerate().all(|(i, p)| p.uid as usize == i),
            "peer snapshot must be uid-ordered and gapless"
        );
        let mut report = SyncReport::default();
        let old_len = self.peers.len();
        let new_len = incoming.len();

        if old_len == 0 {
            self.scores = vec![SCORE_FLOOR; new_len];
        } else if new_len < old_len {
            self.scores = vec![SCORE_FLOOR; new_len];
            report.reset = true;
        } else {
            // Common prefix keeps its scores unless the hotkey changed.
            for (i, peer) in incoming.iter().enumerate().take(old_len) {
                if self.peers[i].hotkey != peer.hotkey {
                    self.scores[i] = 0.0;
                    report.replaced += 1;
                }
            }
            self.scores.resize(new_len, 0.0);
        }

        self.peers = incoming;
        report.unblacklisted = self.blacklist.reconcile(&self.peers);
        debug_assert_eq!(self.scores.len(), self.peers.len());
        report
    }

    pub fn record_commit(&mut self, block: u64) {
        self.last_commit_block = block;
    }
}
