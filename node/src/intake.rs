// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Wallet intake client: which flagged wallet should this round scan.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::IntakeError;

#[async_trait]
pub trait WalletIntake: Send + Sync {
    /// The next wallet queued for scanning, `None` when the queue is empty.
    async fn next_wallet(&self) -> Result<Option<String>, IntakeError>;
}

#[derive(Debug, Clone)]
pub struct HttpIntake {
    base_url: String,
    client: Client,
    token: Option<String>,
}

#[derive(Deserialize)]
struct WalletBody {
    #[serde(default)]
    wallet: Option<String>,
}

impl HttpIntake {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WalletIntake for HttpIntake {
    async fn next_wallet(&self) -> Result<Option<String>, IntakeError> {
        let url = format!("{}/v1/wallets/next", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(IntakeError::Rejected(format!("status {}", resp.status())));
        }
        let body: WalletBody = resp
            .json()
            .await
            .map_err(|e| IntakeError::Decode(e.to_string()))?;
        Ok(body.wallet.filter(|w| !w.is_empty()))
    }
}
