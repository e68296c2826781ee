// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Weight normalization and the commit gate.

use crate::verdict::CommitDecision;

/// Minimum own-stake below which the chain would reject the commit anyway.
pub const MIN_COMMIT_STAKE: f64 = 1.0;

/// Scales scores so they sum to 1.0.
///
/// A non-positive sum returns the input unchanged: an all-zero vector stays
/// all-zero instead of becoming NaN, and the chain simply receives no
/// preference.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let sum: f64 = scores.iter().sum();
    if sum <= 0.0 {
        return scores.to_vec();
    }
    scores.iter().map(|s| s / sum).collect()
}

/// Decides whether a commit attempt is allowed to reach the chain.
///
/// The rate limit is strict: `blocks_since_update` must exceed the window,
/// equality still waits. Both refusals are ordinary outcomes, not errors.
pub fn commit_gate(stake: f64, blocks_since_update: u64, rate_limit: u64) -> CommitDecision {
    if stake < MIN_COMMIT_STAKE {
        return CommitDecision::InsufficientStake { stake };
    }
    if blocks_since_update <= rate_limit {
        return CommitDecision::RateLimited {
            blocks_to_wait: rate_limit - blocks_since_update,
        };
    }
    CommitDecision::Ready
}
