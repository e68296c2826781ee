// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Observability surface. Read-only by design: the round loop is the only
//! writer of validator state, these routes serve copies it publishes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::RwLock;

use veriscore::verdict::RoundSummary;

use crate::telemetry;

/// Snapshot of round progress, refreshed by the runner after every round.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub round: u64,
    pub peers: usize,
    pub blacklisted: usize,
    pub last_commit_block: u64,
    pub last_summary: RoundSummary,
}

pub type SharedStatus = Arc<RwLock<StatusSnapshot>>;

#[derive(Clone)]
struct AppState {
    status: SharedStatus,
    started: Instant,
}

#[derive(Serialize)]
struct StatusBody {
    #[serde(flatten)]
    snapshot: StatusSnapshot,
    uptime_secs: u64,
}

pub fn build_router(status: SharedStatus) -> Router {
    let state = AppState {
        status,
        started: Instant::now(),
    };
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusBody> {
    let snapshot = state.status.read().await.clone();
    Json(StatusBody {
        snapshot,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> String {
    telemetry::get_metrics()
}
