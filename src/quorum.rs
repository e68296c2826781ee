// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Corroboration tally over one round's claims.
//!
//! Agreement is the cheap filter: a hash reported by most responders needs
//! no external lookup. Only the minority remainder is worth the price of a
//! ledger query.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::claim::MinerClaim;
use crate::state::ValidatorState;

/// Fraction of responders that must report a hash for it to pass without
/// external verification.
pub const CORROBORATION_THRESHOLD: f64 = 0.8;

/// Below this many responders the ratio is meaningless and everything is
/// treated as disputed.
pub const MIN_RESPONDERS: usize = 5;

/// Hard cap on external verifications per round. Overflow hashes are
/// dropped; peers that keep reporting them re-enter the next tally.
pub const MAX_DISPUTED_PER_ROUND: usize = 5000;

/// Per-hash distinct-reporter counts for one round. Never persisted.
#[derive(Debug, Default)]
pub struct QuorumTally {
    counts: FxHashMap<String, usize>,
    /// First-seen order, so splits are deterministic under the cap.
    order: Vec<String>,
    /// Peers whose response entered the tally.
    pub responders: usize,
    /// Claim rows skipped by ingestion validation.
    pub malformed: usize,
    /// Whole responses skipped for an out-of-population reporter uid.
    pub ignored_reporters: usize,
}

/// The tally's output: what skips verification and what goes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuorumSplit {
    pub corroborated: Vec<String>,
    pub disputed: Vec<String>,
    /// Disputed hashes dropped by [`MAX_DISPUTED_PER_ROUND`].
    pub deferred: usize,
}

impl QuorumTally {
    /// Tallies distinct-reporter counts across all responses.
    ///
    /// Blacklisted reporters are skipped entirely: their claims do not
    /// count and they do not inflate the responder denominator. A peer
    /// reporting the same hash twice counts once.
    pub fn collect(claims: &[MinerClaim], state: &ValidatorState) -> Self {
        let mut tally = Self::default();
        for response in claims {
            if response.miner_uid as usize >= state.population() {
                tally.ignored_reporters += 1;
                continue;
            }
            if state.is_blacklisted_uid(response.miner_uid) {
                continue;
            }
            tally.responders += 1;

            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for tx in &response.transactions {
                if tx.validate().is_err() {
                    tally.malformed += 1;
                    continue;
                }
                if !seen.insert(tx.transaction_hash.as_str()) {
                    continue;
                }
                match tally.counts.get_mut(&tx.transaction_hash) {
                    Some(count) => *count += 1,
                    None => {
                        tally.counts.insert(tx.transaction_hash.clone(), 1);
                        tally.order.push(tx.transaction_hash.clone());
                    }
                }
            }
        }
        tally
    }

    pub fn count_of(&self, hash: &str) -> usize {
        self.counts.get(hash).copied().unwrap_or(0)
    }

    pub fn distinct_hashes(&self) -> usize {
        self.order.len()
    }

    /// Splits every tallied hash into corroborated and disputed.
    ///
    /// Corroborated requires both the ratio and the responder floor:
    /// `count >= CORROBORATION_THRESHOLD * responders` and
    /// `responders >= MIN_RESPONDERS`. With too few responders a single
    /// fabricator colluding with itself would clear any ratio.
    pub fn split(&self) -> QuorumSplit {
        let mut split = QuorumSplit::default();
        let quorum_possible = self.responders >= MIN_RESPONDERS;
        let needed = CORROBORATION_THRESHOLD * self.responders as f64;

        for hash in &self.order {
            let count = self.counts[hash];
            if quorum_possible && count as f64 >= needed {
                split.corroborated.push(hash.clone());
            } else if split.disputed.len() < MAX_DISPUTED_PER_ROUND {
                split.disputed.push(hash.clone());
            } else {
                split.deferred += 1;
            }
        }
        split
    }
}
