// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Claim types submitted by miner peers, plus ingestion validation.

use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, ClaimResult};

/// A peer's position in the population paired with its stable identity key.
///
/// The uid is an index into the score vector; the hotkey survives uid reuse
/// and is what the blacklist tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    pub uid: u16,
    pub hotkey: String,
}

impl PeerIdentity {
    pub fn new(uid: u16, hotkey: impl Into<String>) -> Self {
        Self {
            uid,
            hotkey: hotkey.into(),
        }
    }
}

/// One transaction reported by a miner for the scanned wallet.
///
/// Every field is required on the wire. The amount stays a string until the
/// record store coerces it; a peer sending garbage there loses the value,
/// not the whole claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionClaim {
    pub scan_id: String,
    pub miner_uid: u16,
    pub scan_date: String,
    pub sender: String,
    pub receiver: String,
    pub transaction_hash: String,
    pub transaction_date: String,
    pub amount: String,
    pub token_symbol: String,
    pub category: String,
    pub token_address: String,
}

impl TransactionClaim {
    /// Checks the fields consensus depends on. Empty hash, sender or
    /// category makes a claim unusable for tallying and verification.
    pub fn validate(&self) -> ClaimResult<()> {
        if self.transaction_hash.trim().is_empty() {
            return Err(ClaimError::MissingHash);
        }
        if self.sender.trim().is_empty() {
            return Err(ClaimError::MissingSender);
        }
        if self.category.trim().is_empty() {
            return Err(ClaimError::MissingCategory);
        }
        Ok(())
    }

    /// Parsed amount, `0.0` when the peer sent a non-numeric string.
    pub fn amount_value(&self) -> f64 {
        self.amount.trim().parse::<f64>().unwrap_or(0.0)
    }
}

/// A single peer's full report for one round: every transaction it says it
/// found for the wallet under scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerClaim {
    pub wallet_address: String,
    pub miner_uid: u16,
    pub transactions: Vec<TransactionClaim>,
}

impl MinerClaim {
    pub fn new(wallet_address: impl Into<String>, miner_uid: u16) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            miner_uid,
            transactions: Vec::new(),
        }
    }
}
