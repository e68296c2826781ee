// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Round loop driver.
//!
//! One task owns the validator state and walks it through the round
//! sequence: sync, intake, partition, query, decay, tally, verify, store,
//! commit. Ordering inside the round is the whole concurrency story; the
//! only parallelism is the bounded ledger lookup fan-out, and its results
//! are applied strictly after the tally is complete.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Semaphore;

use veriscore::claim::{MinerClaim, PeerIdentity, TransactionClaim};
use veriscore::partition::select_window;
use veriscore::quorum::QuorumTally;
use veriscore::state::ValidatorState;
use veriscore::verdict::{CommitDecision, CommitResult, RoundSummary, VerificationOutcome};
use veriscore::weights::{commit_gate, normalize};

use crate::chain::ChainClient;
use crate::config::NodeConfig;
use crate::intake::WalletIntake;
use crate::ledger::{classify, LedgerService};
use crate::persistence::SnapshotManager;
use crate::server::{SharedStatus, StatusSnapshot};
use crate::store::RecordStore;

/// One verification unit: a disputed hash under one claimed sender, with
/// everyone who made exactly that claim. Two peers claiming the same hash
/// with different senders are two units; each peer answers only for its
/// own claim.
struct DisputedClaim {
    hash: String,
    sender: String,
    reporters: Vec<u16>,
}

pub struct Validator {
    cfg: NodeConfig,
    state: ValidatorState,
    /// Reachability per uid from the last population sync.
    reachable: Vec<bool>,
    last_responders: usize,
    last_summary: RoundSummary,
    chain: Arc<dyn ChainClient>,
    ledger: Arc<dyn LedgerService>,
    intake: Arc<dyn WalletIntake>,
    store: Arc<dyn RecordStore>,
    status: SharedStatus,
}

impl Validator {
    pub fn new(
        cfg: NodeConfig,
        state: ValidatorState,
        chain: Arc<dyn ChainClient>,
        ledger: Arc<dyn LedgerService>,
        intake: Arc<dyn WalletIntake>,
        store: Arc<dyn RecordStore>,
        status: SharedStatus,
    ) -> Self {
        Self {
            cfg,
            state,
            reachable: Vec::new(),
            last_responders: 0,
            last_summary: RoundSummary::default(),
            chain,
            ledger,
            intake,
            store,
            status,
        }
    }

    pub fn state(&self) -> &ValidatorState {
        &self.state
    }

    /// Drives rounds until the process dies. Every failure inside a round
    /// degrades to a logged, typed outcome; nothing here aborts.
    pub async fn run_forever(&mut self) {
        loop {
            if self.needs_sync() {
                self.sync_population().await;
                self.persist_snapshot();
            }

            let wallet = match self.intake.next_wallet().await {
                Ok(Some(w)) => Some(w),
                Ok(None) => {
                    tracing::debug!("intake queue empty, idling");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "wallet intake failed, idling");
                    None
                }
            };

            let idle = match wallet {
                Some(wallet) if self.state.population() > 0 => {
                    let summary = self.run_round(&wallet).await;
                    tracing::info!(
                        round = self.state.round,
                        accepted = summary.accepted,
                        disputed = summary.disputed,
                        blacklisted = summary.blacklisted,
                        responders = self.last_responders,
                        "round complete"
                    );
                    self.last_responders == 0
                }
                _ => {
                    self.publish_status().await;
                    true
                }
            };

            // The gate makes refused attempts cheap, so try every pass.
            let _ = self.maybe_commit_weights().await;

            let pause = if idle { self.cfg.idle_sleep } else { self.cfg.round_sleep };
            tokio::time::sleep(pause).await;
        }
    }

    fn needs_sync(&self) -> bool {
        self.state.round % self.cfg.sync_every == 0
            || self.state.population() == 0
            // Reachability is unknown for a population restored from disk.
            || self.reachable.len() != self.state.population()
    }

    /// Refreshes the population snapshot from the chain and reconciles
    /// local state against it. Failures and malformed snapshots keep the
    /// previous one.
    pub async fn sync_population(&mut self) {
        match self.chain.peer_population().await {
            Ok(mut peers) => {
                peers.sort_by_key(|p| p.uid);
                // Scores, weights and the blacklist all address peers by
                // position; a gapped or duplicated uid would point every
                // one of them at the wrong peer.
                if peers.iter().enumerate().any(|(i, p)| p.uid as usize != i) {
                    tracing::warn!(
                        population = peers.len(),
                        "population snapshot uids are not contiguous from zero, keeping previous snapshot"
                    );
                    return;
                }
                self.reachable = peers.iter().map(|p| p.reachable).collect();
                let identities: Vec<PeerIdentity> = peers.iter().map(|p| p.identity()).collect();
                let report = self.state.sync_population(identities);
                if report.replaced > 0 || report.unblacklisted > 0 || report.reset {
                    tracing::info!(
                        population = self.state.population(),
                        replaced = report.replaced,
                        unblacklisted = report.unblacklisted,
                        reset = report.reset,
                        "population synced with changes"
                    );
                } else {
                    tracing::debug!(population = self.state.population(), "population synced");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "population sync failed, keeping previous snapshot");
            }
        }
    }

    fn eligible_uids(&self, window: &[u16]) -> Vec<u16> {
        window
            .iter()
            .copied()
            .filter(|&uid| {
                uid != self.cfg.own_uid
                    && self.reachable.get(uid as usize).copied().unwrap_or(false)
                    && !self.state.is_blacklisted_uid(uid)
            })
            .collect()
    }

    /// Runs one scan round for `wallet`.
    ///
    /// Sequence: partition the population, query the window, decay peers
    /// that stayed silent, tally, verify the disputed remainder, store
    /// accepted rows. A newly detected fabricator is blacklisted before
    /// insertion, so nothing it sent this round lands in the store.
    pub async fn run_round(&mut self, wallet: &str) -> RoundSummary {
        let started = Instant::now();
        self.state.round += 1;
        self.last_responders = 0;

        let window = select_window(
            self.state.population(),
            self.cfg.max_batch,
            self.state.target_group,
        );
        self.state.target_group = window.next_group;
        let batch = self.eligible_uids(&window.uids);
        if batch.is_empty() {
            tracing::debug!(
                round = self.state.round,
                window = window.uids.len(),
                "no eligible peers in this window"
            );
            return self.finish_round(RoundSummary::default(), started).await;
        }

        let responses = match self
            .chain
            .query_peers(&batch, wallet, self.cfg.query_timeout)
            .await
        {
            Ok(responses) => responses,
            Err(e) => {
                // A transport failure must not touch anyone's standing.
                tracing::warn!(error = %e, "peer query failed, round abandoned");
                return self.finish_round(RoundSummary::default(), started).await;
            }
        };

        // Asked-and-silent and not-asked alike decay; answering is the only
        // way to hold a score up.
        let answered: FxHashSet<u16> = responses.iter().map(|r| r.miner_uid).collect();
        let silent: Vec<u16> = (0..self.state.population() as u16)
            .filter(|uid| !answered.contains(uid))
            .collect();
        self.state.decay_scores(&silent, self.cfg.decay_alpha);

        let tally = QuorumTally::collect(&responses, &self.state);
        self.last_responders = tally.responders;
        if tally.malformed > 0 || tally.ignored_reporters > 0 {
            tracing::debug!(
                malformed = tally.malformed,
                ignored_reporters = tally.ignored_reporters,
                "skipped invalid claim rows"
            );
        }
        let split = tally.split();
        if split.deferred > 0 {
            tracing::warn!(deferred = split.deferred, "disputed hashes over the round cap");
        }
        metrics::counter!("veriscore_claims_disputed_total", split.disputed.len() as u64);

        let (confirmed_pairs, newly_blacklisted) =
            self.verify_disputed(&responses, &split.disputed).await;

        let corroborated: FxHashSet<&str> =
            split.corroborated.iter().map(String::as_str).collect();
        let confirmed: FxHashSet<(&str, &str)> = confirmed_pairs
            .iter()
            .map(|(hash, sender)| (hash.as_str(), sender.as_str()))
            .collect();
        let accepted_rows = self.store_accepted(wallet, &responses, &corroborated, &confirmed);
        metrics::counter!("veriscore_claims_accepted_total", accepted_rows as u64);

        let summary = RoundSummary {
            accepted: accepted_rows,
            disputed: split.disputed.len(),
            blacklisted: newly_blacklisted,
        };
        self.finish_round(summary, started).await
    }

    /// Looks every disputed (hash, sender) claim up on the ledger, bounded
    /// by the configured concurrency. Returns the confirmed pairs and how
    /// many peers were newly blacklisted.
    ///
    /// Units are keyed by the pair, never by the hash alone, so a verdict
    /// reaches exactly the peers who made that claim regardless of the
    /// order responses arrived in.
    async fn verify_disputed(
        &mut self,
        responses: &[MinerClaim],
        disputed: &[String],
    ) -> (Vec<(String, String)>, usize) {
        if disputed.is_empty() {
            return (Vec::new(), 0);
        }
        let disputed_set: FxHashSet<&str> = disputed.iter().map(String::as_str).collect();

        let mut to_verify: FxHashMap<(String, String), Vec<u16>> = FxHashMap::default();
        for response in responses {
            let uid = response.miner_uid;
            if uid as usize >= self.state.population() || self.state.is_blacklisted_uid(uid) {
                continue;
            }
            for tx in &response.transactions {
                if tx.validate().is_err() {
                    continue;
                }
                if !disputed_set.contains(tx.transaction_hash.as_str()) {
                    continue;
                }
                let reporters = to_verify
                    .entry((tx.transaction_hash.clone(), tx.sender.clone()))
                    .or_default();
                if !reporters.contains(&uid) {
                    reporters.push(uid);
                }
            }
        }
        let units: Vec<DisputedClaim> = to_verify
            .into_iter()
            .map(|((hash, sender), reporters)| DisputedClaim {
                hash,
                sender,
                reporters,
            })
            .collect();

        let sem = Semaphore::new(self.cfg.verify_concurrency);
        let ledger = &self.ledger;
        let lookups = units.iter().map(|unit| {
            let sem = &sem;
            async move {
                let _permit = sem.acquire().await.ok();
                let outcome =
                    classify(&unit.sender, ledger.lookup_transaction(&unit.hash).await);
                (unit, outcome)
            }
        });
        let outcomes = futures::future::join_all(lookups).await;

        let mut confirmed = Vec::new();
        let mut newly_blacklisted = 0usize;
        for (unit, outcome) in outcomes {
            let (hash, sender) = (unit.hash.as_str(), unit.sender.as_str());
            match outcome {
                VerificationOutcome::Confirmed => {
                    metrics::counter!("veriscore_verifications_total", 1, "outcome" => "confirmed");
                    confirmed.push((unit.hash.clone(), unit.sender.clone()));
                }
                VerificationOutcome::Fabricated => {
                    metrics::counter!("veriscore_verifications_total", 1, "outcome" => "fabricated");
                    for &uid in &unit.reporters {
                        if self.state.blacklist_uid(uid) {
                            newly_blacklisted += 1;
                            tracing::warn!(uid, hash, sender, "peer blacklisted for fabricated claim");
                            // Persist at once: a fabricator must stay barred
                            // across a crash.
                            self.persist_snapshot();
                        }
                    }
                }
                VerificationOutcome::Inconclusive(reason) => {
                    metrics::counter!("veriscore_verifications_total", 1, "outcome" => "inconclusive");
                    tracing::debug!(hash, sender, reason, "verification inconclusive, dropped this round");
                }
            }
        }
        (confirmed, newly_blacklisted)
    }

    /// Writes accepted rows per reporter. A corroborated hash lands for
    /// every reporter; a disputed row lands only where the reporter's own
    /// (hash, sender) pair was confirmed. Blacklist checks run against the
    /// post-verification state, so a peer caught this round stores nothing.
    fn store_accepted(
        &self,
        wallet: &str,
        responses: &[MinerClaim],
        corroborated: &FxHashSet<&str>,
        confirmed: &FxHashSet<(&str, &str)>,
    ) -> usize {
        if corroborated.is_empty() && confirmed.is_empty() {
            return 0;
        }
        let stored_at = now_unix();
        let mut total = 0usize;
        for response in responses {
            let uid = response.miner_uid;
            if uid as usize >= self.state.population() || self.state.is_blacklisted_uid(uid) {
                continue;
            }
            let Some(identity) = self.state.peers.get(uid as usize).cloned() else {
                continue;
            };
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            let rows: Vec<TransactionClaim> = response
                .transactions
                .iter()
                .filter(|tx| {
                    tx.validate().is_ok()
                        && (corroborated.contains(tx.transaction_hash.as_str())
                            || confirmed
                                .contains(&(tx.transaction_hash.as_str(), tx.sender.as_str())))
                        && seen.insert(tx.transaction_hash.as_str())
                })
                .cloned()
                .collect();
            if rows.is_empty() {
                continue;
            }
            match self.store.insert_claims(wallet, &identity, &rows, stored_at) {
                Ok(n) => total += n,
                Err(e) => {
                    tracing::warn!(uid, error = %e, "record store insert failed, continuing");
                }
            }
        }
        total
    }

    async fn finish_round(&mut self, summary: RoundSummary, started: Instant) -> RoundSummary {
        metrics::counter!("veriscore_rounds_total", 1);
        metrics::histogram!(
            "veriscore_round_duration_seconds",
            started.elapsed().as_secs_f64()
        );
        metrics::gauge!("veriscore_blacklist_size", self.state.blacklist.len() as f64);
        self.last_summary = summary.clone();
        self.publish_status().await;
        summary
    }

    /// Attempts a weight commit if the gate allows it.
    ///
    /// Reads stake and rate limit first; refusals return without any
    /// commit call. When the gate opens, scores are recomputed from the
    /// store's trailing window, normalized and committed.
    pub async fn maybe_commit_weights(&mut self) -> CommitResult {
        let stake = match self.chain.stake_of(self.cfg.own_uid).await {
            Ok(stake) => stake,
            Err(e) => {
                tracing::warn!(error = %e, "stake lookup failed");
                return CommitResult::Failed(e.to_string());
            }
        };
        let blocks = match self.chain.blocks_since_update(self.cfg.own_uid).await {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit lookup failed");
                return CommitResult::Failed(e.to_string());
            }
        };
        let window = match self.chain.rate_limit_window().await {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit lookup failed");
                return CommitResult::Failed(e.to_string());
            }
        };

        match commit_gate(stake, blocks, window) {
            CommitDecision::InsufficientStake { stake } => {
                tracing::warn!(stake, "own stake below committable minimum");
                return CommitResult::InsufficientStake { stake };
            }
            CommitDecision::RateLimited { blocks_to_wait } => {
                tracing::debug!(blocks_to_wait, "weight commit rate limited");
                return CommitResult::RateLimited { blocks_to_wait };
            }
            CommitDecision::Ready => {}
        }
        if self.state.peers.is_empty() {
            return CommitResult::Failed("no population to weight".to_string());
        }

        let since = now_unix() - self.cfg.score_window.as_secs() as i64;
        let counts = match self.store.count_claims_since(since) {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(error = %e, "window count query failed, commit skipped");
                return CommitResult::Failed(e.to_string());
            }
        };
        self.state.recompute_scores(&counts);
        let weights = normalize(&self.state.scores);
        let pairs: Vec<(u16, f64)> = self
            .state
            .peers
            .iter()
            .map(|p| (p.uid, weights[p.uid as usize]))
            .collect();

        match self.chain.commit_weights(&pairs, self.cfg.commit_timeout).await {
            Ok(block) => {
                self.state.record_commit(block);
                metrics::counter!("veriscore_weight_commits_total", 1);
                tracing::info!(block, "weights committed");
                self.persist_snapshot();
                self.publish_status().await;
                CommitResult::Committed { block }
            }
            Err(e) => {
                tracing::warn!(error = %e, "weight commit failed");
                CommitResult::Failed(e.to_string())
            }
        }
    }

    /// Saves validator state to disk. Failures are logged, never fatal:
    /// losing a snapshot is recoverable, killing the loop is not.
    pub fn persist_snapshot(&self) {
        if let Err(e) = SnapshotManager::save(&self.cfg.state_path, &self.state) {
            tracing::warn!(error = %e, "state snapshot failed");
        }
    }

    async fn publish_status(&self) {
        let mut status = self.status.write().await;
        *status = StatusSnapshot {
            round: self.state.round,
            peers: self.state.population(),
            blacklisted: self.state.blacklist.len(),
            last_commit_block: self.state.last_commit_block,
            last_summary: self.last_summary.clone(),
        };
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
