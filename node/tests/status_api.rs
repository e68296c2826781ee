// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tokio::sync::RwLock;
use tower::ServiceExt; // for oneshot

use veriscore::verdict::RoundSummary;
use veriscore_node::server::{build_router, SharedStatus, StatusSnapshot};

fn status_fixture() -> SharedStatus {
    Arc::new(RwLock::new(StatusSnapshot {
        round: 7,
        peers: 12,
        blacklisted: 2,
        last_commit_block: 4_200,
        last_summary: RoundSummary {
            accepted: 31,
            disputed: 4,
            blacklisted: 1,
        },
    }))
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(status_fixture());

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_status_reports_published_snapshot() {
    let app = build_router(status_fixture());

    let req = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["round"], 7);
    assert_eq!(parsed["peers"], 12);
    assert_eq!(parsed["blacklisted"], 2);
    assert_eq!(parsed["last_commit_block"], 4_200);
    assert_eq!(parsed["last_summary"]["accepted"], 31);
    assert!(parsed["uptime_secs"].is_u64());
}

#[tokio::test]
async fn test_status_follows_writer_updates() {
    let status = status_fixture();
    let app = build_router(status.clone());

    status.write().await.round = 8;

    let req = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["round"], 8);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let app = build_router(status_fixture());

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = build_router(status_fixture());

    let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
