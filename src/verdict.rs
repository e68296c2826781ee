// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Outcome types for verification and weight commits.
//!
//! Three-way outcomes instead of booleans: the distance between "the ledger
//! said no" and "the ledger did not answer" is the distance between a
//! justified blacklist and a wrongful one.

use serde::{Deserialize, Serialize};

/// Result of checking one disputed claim against the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    /// The ledger holds the transaction and the claimed sender is one of
    /// its participants.
    Confirmed,
    /// The ledger answered positively and the claim does not hold up:
    /// no such transaction, or the claimed sender is not a participant.
    Fabricated,
    /// The ledger could not be consulted. Never a basis for blacklisting.
    Inconclusive(String),
}

impl VerificationOutcome {
    pub fn is_fabricated(&self) -> bool {
        matches!(self, VerificationOutcome::Fabricated)
    }
}

/// Gate decision computed before touching the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitDecision {
    /// All preconditions hold; the caller may attempt the chain commit.
    Ready,
    /// Not enough blocks have passed since the last committed update.
    RateLimited { blocks_to_wait: u64 },
    /// The validator's own stake is below the committable minimum.
    InsufficientStake { stake: f64 },
}

/// Final result of a commit attempt, gate refusals included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommitResult {
    Committed { block: u64 },
    RateLimited { blocks_to_wait: u64 },
    InsufficientStake { stake: f64 },
    Failed(String),
}

/// What one round did, for logs and the status surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Claims written to the record store this round.
    pub accepted: usize,
    /// Hashes that fell below quorum and went to verification.
    pub disputed: usize,
    /// Peers newly blacklisted this round.
    pub blacklisted: usize,
}
