// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

/// Rejection reasons for claims that fail ingestion validation.
///
/// A malformed claim is skipped, never trusted: it does not enter the
/// quorum tally and it is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// Transaction hash field is empty.
    #[error("claim has an empty transaction hash")]
    MissingHash,
    /// Sender address field is empty.
    #[error("claim has an empty sender address")]
    MissingSender,
    /// Category field is empty.
    #[error("claim has an empty category")]
    MissingCategory,
    /// Reporter uid lies outside the current population.
    #[error("claim reporter uid {0} is outside the population")]
    UnknownReporter(u16),
}

pub type ClaimResult<T> = core::result::Result<T, ClaimError>;
