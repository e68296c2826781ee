// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Record store: accepted claim rows on SQLite.
//!
//! Rows are the ground truth the score recompute reads. Deduplication is
//! per reporter and hash: the same peer re-reporting a transaction updates
//! its row instead of farming a second count.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use rustc_hash::FxHashMap;

use veriscore::claim::{PeerIdentity, TransactionClaim};

use crate::errors::StoreError;

/// A peer claiming more rows than this in one round is skipped outright.
/// No honest wallet scan produces batches that size.
pub const MAX_CLAIMS_PER_PEER: usize = 300;

pub trait RecordStore: Send + Sync {
    /// Writes one peer's accepted claims. Returns rows written; an
    /// oversized batch writes nothing.
    fn insert_claims(
        &self,
        wallet: &str,
        reporter: &PeerIdentity,
        claims: &[TransactionClaim],
        stored_at: i64,
    ) -> Result<usize, StoreError>;

    /// Rows per uid stored at or after `since_unix`.
    fn count_claims_since(&self, since_unix: i64) -> Result<FxHashMap<u16, u64>, StoreError>;
}

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_transactions (
                scan_id TEXT,
                miner_uid INTEGER,
                miner_hotkey TEXT,
                wallet_address TEXT,
                scan_date TEXT,
                sender TEXT,
                receiver TEXT,
                transaction_hash TEXT,
                transaction_date TEXT,
                amount REAL,
                token_symbol TEXT,
                category TEXT,
                token_address TEXT,
                stored_at INTEGER,
                PRIMARY KEY (miner_hotkey, transaction_hash)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wallet_tx_stored_at ON wallet_transactions(stored_at)",
            [],
        )?;
        Ok(Self { path })
    }

    // One connection per call; the struct stays Send + Sync without
    // holding a connection across await points in the caller.
    fn conn(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }
}

impl RecordStore for SqliteStore {
    fn insert_claims(
        &self,
        wallet: &str,
        reporter: &PeerIdentity,
        claims: &[TransactionClaim],
        stored_at: i64,
    ) -> Result<usize, StoreError> {
        if claims.len() > MAX_CLAIMS_PER_PEER {
            tracing::warn!(
                uid = reporter.uid,
                count = claims.len(),
                "peer batch exceeds per-round cap, skipping insertion"
            );
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        for claim in claims {
            written += tx.execute(
                "INSERT OR REPLACE INTO wallet_transactions (
                    scan_id, miner_uid, miner_hotkey, wallet_address, scan_date,
                    sender, receiver, transaction_hash, transaction_date,
                    amount, token_symbol, category, token_address, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    claim.scan_id,
                    reporter.uid,
                    reporter.hotkey,
                    wallet,
                    claim.scan_date,
                    claim.sender,
                    claim.receiver,
                    claim.transaction_hash,
                    claim.transaction_date,
                    claim.amount_value(),
                    claim.token_symbol,
                    claim.category,
                    claim.token_address,
                    stored_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(written)
    }

    fn count_claims_since(&self, since_unix: i64) -> Result<FxHashMap<u16, u64>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT miner_uid, COUNT(*) FROM wallet_transactions
             WHERE stored_at >= ?1 GROUP BY miner_uid",
        )?;
        let rows = stmt.query_map(params![since_unix], |row| {
            Ok((row.get::<_, i64>(0)? as u16, row.get::<_, i64>(1)? as u64))
        })?;
        let mut counts = FxHashMap::default();
        for row in rows {
            let (uid, count) = row?;
            counts.insert(uid, count);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn claim(hash: &str) -> TransactionClaim {
        TransactionClaim {
            scan_id: "scan-1".into(),
            miner_uid: 3,
            scan_date: "2025-06-01T00:00:00Z".into(),
            sender: "0xaaa".into(),
            receiver: "0xbbb".into(),
            transaction_hash: hash.into(),
            transaction_date: "2025-06-01T00:00:00Z".into(),
            amount: "2.5".into(),
            token_symbol: "USDC".into(),
            category: "token".into(),
            token_address: "0xccc".into(),
        }
    }

    #[test]
    fn test_insert_and_window_count() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("records.db")).unwrap();
        let reporter = PeerIdentity::new(3, "hk3");

        let n = store
            .insert_claims("0xwallet", &reporter, &[claim("h1"), claim("h2")], 1_000)
            .unwrap();
        assert_eq!(n, 2);

        let counts = store.count_claims_since(500).unwrap();
        assert_eq!(counts.get(&3), Some(&2));
        // Window excludes older rows.
        let counts = store.count_claims_since(2_000).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_rereport_updates_instead_of_duplicating() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("records.db")).unwrap();
        let reporter = PeerIdentity::new(1, "hk1");

        store
            .insert_claims("0xwallet", &reporter, &[claim("h1")], 1_000)
            .unwrap();
        store
            .insert_claims("0xwallet", &reporter, &[claim("h1")], 2_000)
            .unwrap();

        let counts = store.count_claims_since(0).unwrap();
        assert_eq!(counts.get(&1), Some(&1), "same reporter and hash is one row");

        // A different reporter with the same hash is its own row.
        let other = PeerIdentity::new(2, "hk2");
        store
            .insert_claims("0xwallet", &other, &[claim("h1")], 2_000)
            .unwrap();
        let counts = store.count_claims_since(0).unwrap();
        assert_eq!(counts.get(&2), Some(&1));
    }

    #[test]
    fn test_oversized_batch_is_skipped() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("records.db")).unwrap();
        let reporter = PeerIdentity::new(0, "hk0");

        let claims: Vec<_> = (0..MAX_CLAIMS_PER_PEER + 1)
            .map(|i| claim(&format!("h{i}")))
            .collect();
        let n = store
            .insert_claims("0xwallet", &reporter, &claims, 1_000)
            .unwrap();
        assert_eq!(n, 0);
        assert!(store.count_claims_since(0).unwrap().is_empty());
    }
}
