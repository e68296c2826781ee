// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! veriscore: the claim-consensus and peer-scoring engine.
//!
//! Deterministic, synchronous, no I/O. The node crate owns every socket,
//! file and clock; this crate owns every rule: windowed peer selection,
//! quorum tallying, blacklist membership, score recompute and decay, weight
//! normalization and the commit gate.

pub mod blacklist;
pub mod claim;
pub mod error;
pub mod partition;
pub mod quorum;
pub mod score;
pub mod state;
pub mod verdict;
pub mod weights;
