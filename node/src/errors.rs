// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Daemon error taxonomy.
//!
//! Every variant is an operational failure the round loop survives. Chain
//! and ledger failures become typed outcomes (a failed commit, an
//! inconclusive verification); store and snapshot failures are logged and
//! the round moves on. Nothing here aborts the process after startup.

use thiserror::Error;

/// Chain gateway failures: the transport to peers and to weight commits.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("chain transport: {0}")]
    Transport(String),
    #[error("chain gateway rejected request: {0}")]
    Rejected(String),
    #[error("chain response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        ChainError::Transport(e.to_string())
    }
}

/// Ledger lookup failures. All of these classify a verification as
/// inconclusive, never as fabricated.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger transport: {0}")]
    Transport(String),
    #[error("ledger lookup timed out")]
    Timeout,
    #[error("ledger response could not be decoded: {0}")]
    Decode(String),
    #[error("ledger rpc error: {0}")]
    Rpc(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LedgerError::Timeout
        } else {
            LedgerError::Transport(e.to_string())
        }
    }
}

/// Wallet intake failures. An unreachable intake service idles the round.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("intake transport: {0}")]
    Transport(String),
    #[error("intake rejected request: {0}")]
    Rejected(String),
    #[error("intake response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for IntakeError {
    fn from(e: reqwest::Error) -> Self {
        IntakeError::Transport(e.to_string())
    }
}

/// Record store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record store: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Snapshot file failures. Corruption variants trigger quarantine, not
/// propagation.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot too short to hold a frame")]
    Truncated,
    #[error("snapshot magic mismatch")]
    BadMagic,
    #[error("snapshot format version {0} is not readable")]
    BadVersion(u32),
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
    #[error("snapshot body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Corrupt-content errors quarantine the file; io errors do not.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, SnapshotError::Io(_))
    }
}

/// Umbrella error for daemon plumbing that does not map to an outcome.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
