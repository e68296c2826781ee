// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain gateway client.
//!
//! The gateway owns the wallet key and the peer transport; this process
//! talks plain HTTP to it. Weight commits, stake reads and peer queries all
//! go through here, so the round loop itself never holds key material.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use veriscore::claim::{MinerClaim, PeerIdentity};

use crate::errors::ChainError;

/// One peer as the chain sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub uid: u16,
    pub hotkey: String,
    /// Whether the peer currently serves a reachable endpoint.
    pub reachable: bool,
}

impl PeerInfo {
    pub fn identity(&self) -> PeerIdentity {
        PeerIdentity::new(self.uid, self.hotkey.clone())
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Minimum blocks the chain enforces between two weight commits.
    async fn rate_limit_window(&self) -> Result<u64, ChainError>;
    /// Blocks elapsed since `uid` last committed weights.
    async fn blocks_since_update(&self, uid: u16) -> Result<u64, ChainError>;
    async fn stake_of(&self, uid: u16) -> Result<f64, ChainError>;
    async fn peer_population(&self) -> Result<Vec<PeerInfo>, ChainError>;
    /// Fans the wallet scan request out to the given peers and collects
    /// whatever answers within the timeout. Silent peers are simply absent
    /// from the result.
    async fn query_peers(
        &self,
        uids: &[u16],
        wallet: &str,
        timeout: Duration,
    ) -> Result<Vec<MinerClaim>, ChainError>;
    /// Commits normalized weights. Returns the inclusion block height.
    async fn commit_weights(
        &self,
        weights: &[(u16, f64)],
        timeout: Duration,
    ) -> Result<u64, ChainError>;
}

#[derive(Debug, Clone)]
pub struct GatewayChainClient {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct BlockBody {
    block: u64,
}

#[derive(Deserialize)]
struct BlocksBody {
    blocks: u64,
}

#[derive(Deserialize)]
struct StakeBody {
    stake: f64,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    uids: &'a [u16],
    wallet: &'a str,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct WeightsBody<'a> {
    weights: &'a [(u16, f64)],
}

impl GatewayChainClient {
    pub fn new(url: String) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ChainError::Rejected(format!("{} -> {}", path, resp.status())));
        }
        resp.json().await.map_err(|e| ChainError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for GatewayChainClient {
    async fn rate_limit_window(&self) -> Result<u64, ChainError> {
        Ok(self.get_json::<BlocksBody>("/v1/chain/rate_limit").await?.blocks)
    }

    async fn blocks_since_update(&self, uid: u16) -> Result<u64, ChainError> {
        let path = format!("/v1/peers/{uid}/blocks_since_update");
        Ok(self.get_json::<BlocksBody>(&path).await?.blocks)
    }

    async fn stake_of(&self, uid: u16) -> Result<f64, ChainError> {
        let path = format!("/v1/peers/{uid}/stake");
        Ok(self.get_json::<StakeBody>(&path).await?.stake)
    }

    async fn peer_population(&self) -> Result<Vec<PeerInfo>, ChainError> {
        self.get_json("/v1/peers").await
    }

    async fn query_peers(
        &self,
        uids: &[u16],
        wallet: &str,
        timeout: Duration,
    ) -> Result<Vec<MinerClaim>, ChainError> {
        let url = format!("{}/v1/query", self.base_url);
        let body = QueryBody {
            uids,
            wallet,
            timeout_secs: timeout.as_secs(),
        };
        // The gateway needs the whole window plus slack to gather answers.
        let resp = self
            .client
            .post(&url)
            .timeout(timeout + Duration::from_secs(5))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ChainError::Rejected(format!("/v1/query -> {}", resp.status())));
        }
        resp.json().await.map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn commit_weights(
        &self,
        weights: &[(u16, f64)],
        timeout: Duration,
    ) -> Result<u64, ChainError> {
        let url = format!("{}/v1/weights", self.base_url);
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&WeightsBody { weights })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ChainError::Rejected(format!("/v1/weights -> {}", resp.status())));
        }
        Ok(resp
            .json::<BlockBody>()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))?
            .block)
    }
}
