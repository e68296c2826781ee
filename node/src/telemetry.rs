// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "veriscore_node=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Store handle for /metrics endpoint
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("veriscore_rounds_total", "Rounds completed since process start");
    metrics::describe_counter!("veriscore_claims_accepted_total", "Claim rows written to the record store");
    metrics::describe_counter!("veriscore_claims_disputed_total", "Hashes sent to external verification");
    metrics::describe_counter!(
        "veriscore_verifications_total",
        "External verification results, labeled by outcome"
    );
    metrics::describe_counter!("veriscore_weight_commits_total", "Successful weight commits");
    metrics::describe_gauge!("veriscore_blacklist_size", "Hotkeys currently blacklisted");
    metrics::describe_gauge!("veriscore_snapshot_size_bytes", "Size of the last saved snapshot in bytes");
    metrics::describe_histogram!("veriscore_round_duration_seconds", "Wall time of one full round");

    // Ensure at least one metric exists on startup
    metrics::gauge!("veriscore_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
