// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Validator state snapshots.
//!
//! Frame layout: `[MAGIC][VERSION][BODY_LEN][BODY_JSON][CRC32]`, crc over
//! everything before the trailer. The body is JSON so older snapshots keep
//! loading when fields are added: unknown fields are ignored, missing ones
//! default.
//!
//! Writes go to a `.tmp` sibling and rename into place; the previous file
//! rotates to `.prev`. A file that fails any integrity check is renamed
//! aside with a timestamp, never deleted, and the validator starts from
//! defaults.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use veriscore::state::ValidatorState;

use crate::errors::SnapshotError;

const MAGIC: u32 = 0x56455253; // VERS
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PersistedState {
    #[serde(default)]
    pub round: u64,
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub hotkeys: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub last_commit_block: u64,
    #[serde(default)]
    pub target_group: usize,
    #[serde(default)]
    pub saved_at: u64,
}

impl PersistedState {
    pub fn from_state(state: &ValidatorState) -> Self {
        Self {
            round: state.round,
            scores: state.scores.clone(),
            hotkeys: state.peers.iter().map(|p| p.hotkey.clone()).collect(),
            blacklist: state.blacklist.snapshot_keys(),
            last_commit_block: state.last_commit_block,
            target_group: state.target_group,
            saved_at: unix_now(),
        }
    }

    pub fn into_state(self) -> ValidatorState {
        ValidatorState::restore(
            self.hotkeys,
            self.scores,
            self.blacklist,
            self.round,
            self.target_group,
            self.last_commit_block,
        )
    }
}

pub struct SnapshotManager;

impl SnapshotManager {
    /// Saves atomically. Returns bytes written.
    pub fn save(path: &Path, state: &ValidatorState) -> Result<u64, SnapshotError> {
        let tmp_path = path.with_extension("tmp");
        let body = serde_json::to_vec(&PersistedState::from_state(state))?;
        let body_len = body.len() as u32;
        let written = 16 + body.len() as u64;

        {
            let mut file = File::create(&tmp_path)?;
            let mut hasher = Hasher::new();

            let mut write_chunk = |data: &[u8]| -> std::io::Result<()> {
                file.write_all(data)?;
                hasher.update(data);
                Ok(())
            };

            // [MAGIC][VER][BODY_LEN][BODY]
            write_chunk(&MAGIC.to_le_bytes())?;
            write_chunk(&SCHEMA_VERSION.to_le_bytes())?;
            write_chunk(&body_len.to_le_bytes())?;
            write_chunk(&body)?;

            // [CRC]
            let checksum = hasher.finalize();
            file.write_all(&checksum.to_le_bytes())?;
            file.sync_all()?;
        }

        // Keep one previous version
        if path.exists() {
            let prev_path = path.with_extension("bin.prev");
            let _ = std::fs::rename(path, prev_path);
        }
        std::fs::rename(&tmp_path, path)?;

        metrics::gauge!("veriscore_snapshot_size_bytes", written as f64);
        Ok(written)
    }

    /// Loads state, starting from defaults when the file is missing and
    /// quarantining it when it fails integrity checks. Only plain io
    /// failures propagate.
    pub fn load(path: &Path) -> Result<ValidatorState, SnapshotError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no snapshot found, starting fresh");
            return Ok(ValidatorState::new());
        }
        let buffer = std::fs::read(path)?;
        match Self::parse(&buffer) {
            Ok(persisted) => Ok(persisted.into_state()),
            Err(e) if e.is_corruption() => {
                let aside = Self::quarantine(path)?;
                tracing::warn!(
                    path = %path.display(),
                    aside = %aside.display(),
                    error = %e,
                    "snapshot failed integrity checks, moved aside, starting fresh"
                );
                Ok(ValidatorState::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn parse(buffer: &[u8]) -> Result<PersistedState, SnapshotError> {
        if buffer.len() < 16 {
            return Err(SnapshotError::Truncated);
        }

        // Check trailer first: a bad crc makes every other field suspect.
        let split_idx = buffer.len() - 4;
        let (content, trailer) = buffer.split_at(split_idx);
        let stored_crc = u32::from_le_bytes(trailer.try_into().unwrap());

        let mut hasher = Hasher::new();
        hasher.update(content);
        if hasher.finalize() != stored_crc {
            return Err(SnapshotError::ChecksumMismatch);
        }

        let magic = u32::from_le_bytes(content[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let version = u32::from_le_bytes(content[4..8].try_into().unwrap());
        if version != SCHEMA_VERSION {
            return Err(SnapshotError::BadVersion(version));
        }

        let body_len = u32::from_le_bytes(content[8..12].try_into().unwrap()) as usize;
        if content.len() - 12 != body_len {
            return Err(SnapshotError::Truncated);
        }

        Ok(serde_json::from_slice(&content[12..])?)
    }

    /// Renames a corrupt file to a timestamped sibling and returns the new
    /// path. The bytes survive for offline inspection.
    fn quarantine(path: &Path) -> Result<PathBuf, SnapshotError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let aside = path.with_file_name(format!("{}.{}.corrupt", name, unix_now_millis()));
        std::fs::rename(path, &aside)?;
        Ok(aside)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn unix_now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
