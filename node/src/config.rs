// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Hard upper bound on the query window, whatever the environment says.
pub const MAX_BATCH_CEILING: usize = 256;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Status/metrics listener.
    pub bind_addr: SocketAddr,
    /// Chain gateway base URL. The gateway holds the wallet key; this
    /// process never signs anything.
    pub chain_url: String,
    /// Ledger JSON-RPC base URL, access key included if the provider
    /// wants one in the path.
    pub ledger_url: String,
    /// Wallet intake service base URL.
    pub intake_url: String,
    /// Bearer token for the intake service, if it requires one.
    pub intake_token: Option<String>,
    /// SQLite database holding accepted transaction records.
    pub db_path: PathBuf,
    /// Snapshot file for validator state.
    pub state_path: PathBuf,
    /// This validator's own uid on the chain.
    pub own_uid: u16,
    /// Peers asked per round.
    pub max_batch: usize,
    /// EMA retention for silent peers.
    pub decay_alpha: f64,
    /// Trailing window for score recompute.
    pub score_window: Duration,
    /// Per-peer claim query timeout.
    pub query_timeout: Duration,
    /// Per-attempt ledger lookup timeout.
    pub ledger_timeout: Duration,
    /// Ledger lookup attempts before giving up as inconclusive.
    pub ledger_retries: u32,
    /// Fixed delay between ledger attempts.
    pub ledger_retry_delay: Duration,
    /// Concurrent ledger lookups.
    pub verify_concurrency: usize,
    /// Wall-clock budget for one weight commit.
    pub commit_timeout: Duration,
    /// Pause after a normal round.
    pub round_sleep: Duration,
    /// Pause after an idle or empty round.
    pub idle_sleep: Duration,
    /// Population sync and state save cadence, in rounds.
    pub sync_every: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            chain_url: "http://127.0.0.1:9944".to_string(),
            ledger_url: "http://127.0.0.1:8545".to_string(),
            intake_url: "http://127.0.0.1:8020".to_string(),
            intake_token: None,
            db_path: PathBuf::from("veriscore.db"),
            state_path: PathBuf::from("validator_state.bin"),
            own_uid: 0,
            max_batch: 32,
            decay_alpha: 0.9,
            score_window: Duration::from_secs(12 * 60 * 60),
            query_timeout: Duration::from_secs(12),
            ledger_timeout: Duration::from_secs(10),
            ledger_retries: 3,
            ledger_retry_delay: Duration::from_secs(1),
            verify_concurrency: 8,
            commit_timeout: Duration::from_secs(120),
            round_sleep: Duration::from_secs(90),
            idle_sleep: Duration::from_secs(30),
            sync_every: 5,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `VERISCORE_*` environment variables.
    /// Unparseable values fall back to the default rather than aborting.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.bind_addr = env_parse("VERISCORE_BIND_ADDR", cfg.bind_addr);
        cfg.chain_url = env_string("VERISCORE_CHAIN_URL", cfg.chain_url);
        cfg.ledger_url = env_string("VERISCORE_LEDGER_URL", cfg.ledger_url);
        cfg.intake_url = env_string("VERISCORE_INTAKE_URL", cfg.intake_url);
        cfg.intake_token = std::env::var("VERISCORE_INTAKE_TOKEN").ok().filter(|t| !t.is_empty());
        cfg.db_path = PathBuf::from(env_string(
            "VERISCORE_DB_PATH",
            cfg.db_path.to_string_lossy().into_owned(),
        ));
        cfg.state_path = PathBuf::from(env_string(
            "VERISCORE_STATE_PATH",
            cfg.state_path.to_string_lossy().into_owned(),
        ));
        cfg.own_uid = env_parse("VERISCORE_UID", cfg.own_uid);
        cfg.max_batch = env_parse("VERISCORE_MAX_BATCH", cfg.max_batch).min(MAX_BATCH_CEILING);
        cfg.decay_alpha = env_parse("VERISCORE_DECAY_ALPHA", cfg.decay_alpha).clamp(0.0, 1.0);
        cfg.score_window = secs_from_env("VERISCORE_SCORE_WINDOW_SECS", cfg.score_window);
        cfg.query_timeout = secs_from_env("VERISCORE_QUERY_TIMEOUT_SECS", cfg.query_timeout);
        cfg.ledger_timeout = secs_from_env("VERISCORE_LEDGER_TIMEOUT_SECS", cfg.ledger_timeout);
        cfg.ledger_retries = env_parse("VERISCORE_LEDGER_RETRIES", cfg.ledger_retries);
        cfg.ledger_retry_delay =
            secs_from_env("VERISCORE_LEDGER_RETRY_DELAY_SECS", cfg.ledger_retry_delay);
        cfg.verify_concurrency = env_parse("VERISCORE_VERIFY_CONCURRENCY", cfg.verify_concurrency).max(1);
        cfg.commit_timeout = secs_from_env("VERISCORE_COMMIT_TIMEOUT_SECS", cfg.commit_timeout);
        cfg.round_sleep = secs_from_env("VERISCORE_ROUND_SLEEP_SECS", cfg.round_sleep);
        cfg.idle_sleep = secs_from_env("VERISCORE_IDLE_SLEEP_SECS", cfg.idle_sleep);
        cfg.sync_every = env_parse("VERISCORE_SYNC_EVERY", cfg.sync_every).max(1);
        cfg
    }
}

fn env_string(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default,
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn secs_from_env(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
