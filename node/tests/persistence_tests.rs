// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs;

use tempfile::tempdir;

use veriscore::state::ValidatorState;
use veriscore_node::persistence::SnapshotManager;

fn sample_state() -> ValidatorState {
    ValidatorState::restore(
        vec!["hk0".into(), "hk1".into(), "hk2".into()],
        vec![2.0, 0.5, 7.25],
        vec!["hk1".into()],
        41,
        2,
        12_345,
    )
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("validator_state.bin");

    let state = sample_state();
    SnapshotManager::save(&path, &state).expect("save failed");
    assert!(path.exists());

    let loaded = SnapshotManager::load(&path).expect("load failed");
    assert_eq!(loaded.round, 41);
    assert_eq!(loaded.target_group, 2);
    assert_eq!(loaded.last_commit_block, 12_345);
    assert_eq!(loaded.scores, vec![2.0, 0.5, 7.25]);
    assert_eq!(loaded.population(), 3);
    assert!(loaded.is_blacklisted_uid(1));
    assert!(!loaded.is_blacklisted_uid(0));
}

#[test]
fn test_missing_file_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never_written.bin");

    let loaded = SnapshotManager::load(&path).expect("load failed");
    assert_eq!(loaded.round, 0);
    assert_eq!(loaded.population(), 0);
    assert!(!path.exists(), "load must not create the file");
}

#[test]
fn test_second_save_rotates_previous() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("validator_state.bin");

    SnapshotManager::save(&path, &sample_state()).unwrap();
    let mut newer = sample_state();
    newer.round = 42;
    SnapshotManager::save(&path, &newer).unwrap();

    assert!(path.with_extension("bin.prev").exists());
    let loaded = SnapshotManager::load(&path).unwrap();
    assert_eq!(loaded.round, 42);
}

#[test]
fn test_corrupt_snapshot_is_quarantined_not_deleted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("validator_state.bin");
    SnapshotManager::save(&path, &sample_state()).unwrap();

    // Flip one byte of the checksum trailer.
    let mut data = fs::read(&path).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xFF;
    fs::write(&path, &data).unwrap();

    let loaded = SnapshotManager::load(&path).expect("load failed");
    assert_eq!(loaded.round, 0, "corrupt snapshot yields defaults");
    assert!(!path.exists(), "corrupt file moved out of the way");

    let quarantined: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".corrupt"))
        .collect();
    assert_eq!(quarantined.len(), 1, "the bytes survive for inspection");
    let kept = fs::read(quarantined[0].path()).unwrap();
    assert_eq!(kept, data, "quarantined file is byte-identical to the corrupt one");
}

#[test]
fn test_truncated_snapshot_is_quarantined() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("validator_state.bin");
    SnapshotManager::save(&path, &sample_state()).unwrap();

    let mut data = fs::read(&path).unwrap();
    data.truncate(data.len() / 2);
    fs::write(&path, &data).unwrap();

    let loaded = SnapshotManager::load(&path).expect("load failed");
    assert_eq!(loaded.round, 0);
    assert!(!path.exists());
}

#[test]
fn test_unknown_and_missing_body_fields_default() {
    use crc32fast::Hasher;

    let dir = tempdir().unwrap();
    let path = dir.path().join("validator_state.bin");

    // A body from some other schema generation: one known field, one
    // unknown, several missing.
    let body = br#"{"round":9,"future_field":[1,2,3]}"#;
    let mut content = Vec::new();
    content.extend_from_slice(&0x56455253u32.to_le_bytes());
    content.extend_from_slice(&1u32.to_le_bytes());
    content.extend_from_slice(&(body.len() as u32).to_le_bytes());
    content.extend_from_slice(body);
    let mut hasher = Hasher::new();
    hasher.update(&content);
    let crc = hasher.finalize();
    content.extend_from_slice(&crc.to_le_bytes());
    fs::write(&path, &content).unwrap();

    let loaded = SnapshotManager::load(&path).expect("load failed");
    assert_eq!(loaded.round, 9);
    assert_eq!(loaded.population(), 0);
    assert_eq!(loaded.last_commit_block, 0);
    assert!(path.exists(), "a readable snapshot is not quarantined");
}
