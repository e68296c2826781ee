// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::RwLock;

use veriscore_node::chain::GatewayChainClient;
use veriscore_node::config::NodeConfig;
use veriscore_node::intake::HttpIntake;
use veriscore_node::ledger::JsonRpcLedger;
use veriscore_node::persistence::SnapshotManager;
use veriscore_node::runner::Validator;
use veriscore_node::server::{build_router, SharedStatus, StatusSnapshot};
use veriscore_node::store::SqliteStore;
use veriscore_node::telemetry;

#[tokio::main]
async fn main() {
    telemetry::init_telemetry();

    let cfg = NodeConfig::from_env();
    tracing::info!("Initializing veriscore node with config: {:?}", cfg);

    // Corrupt snapshots are quarantined inside load; only real io failures
    // land here, and a validator without its state directory cannot run.
    let state = match SnapshotManager::load(&cfg.state_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to read state snapshot");
            panic!("failed to read state snapshot");
        }
    };
    tracing::info!(
        round = state.round,
        peers = state.population(),
        blacklisted = state.blacklist.len(),
        "validator state loaded"
    );

    let store = match SqliteStore::open(&cfg.db_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to open record store");
            panic!("failed to open record store");
        }
    };

    let chain = GatewayChainClient::new(cfg.chain_url.clone());
    let ledger = JsonRpcLedger::new(
        cfg.ledger_url.clone(),
        cfg.ledger_timeout,
        cfg.ledger_retries,
        cfg.ledger_retry_delay,
    );
    let intake = HttpIntake::new(cfg.intake_url.clone(), cfg.intake_token.clone());

    let status: SharedStatus = Arc::new(RwLock::new(StatusSnapshot::default()));
    let app = build_router(status.clone());
    let addr = cfg.bind_addr;
    tracing::info!("Status surface listening on {}", addr);
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut validator = Validator::new(
        cfg,
        state,
        Arc::new(chain),
        Arc::new(ledger),
        Arc::new(intake),
        Arc::new(store),
        status,
    );
    validator.run_forever().await;
}
