// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger lookup client and verification classification.
//!
//! The ledger is the authority a disputed claim is measured against. The
//! asymmetry here is deliberate and load-bearing: only a positive answer
//! from the ledger may condemn a peer. Silence, timeouts and transport
//! noise stay inconclusive.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use veriscore::verdict::VerificationOutcome;

use crate::errors::LedgerError;

/// Participants of a transaction the ledger knows about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxParticipants {
    pub from: String,
    /// Absent for contract creation.
    pub to: Option<String>,
}

impl TxParticipants {
    /// Address comparison is case-insensitive; providers mix checksum and
    /// lowercase hex freely.
    pub fn involves(&self, address: &str) -> bool {
        self.from.eq_ignore_ascii_case(address)
            || self
                .to
                .as_deref()
                .is_some_and(|to| to.eq_ignore_ascii_case(address))
    }
}

#[async_trait]
pub trait LedgerService: Send + Sync {
    /// `Ok(Some)` the ledger holds the transaction, `Ok(None)` it positively
    /// does not, `Err` it could not be consulted.
    async fn lookup_transaction(&self, hash: &str) -> Result<Option<TxParticipants>, LedgerError>;
}

/// Turns a claim plus a ledger answer into a verification outcome.
///
/// Confirmed needs both existence and the claimed sender among the
/// participants. A positive answer that fails either test is fabrication.
/// An error never is.
pub fn classify(
    claimed_sender: &str,
    lookup: Result<Option<TxParticipants>, LedgerError>,
) -> VerificationOutcome {
    match lookup {
        Err(e) => VerificationOutcome::Inconclusive(e.to_string()),
        Ok(None) => VerificationOutcome::Fabricated,
        Ok(Some(tx)) => {
            if tx.involves(claimed_sender) {
                VerificationOutcome::Confirmed
            } else {
                VerificationOutcome::Fabricated
            }
        }
    }
}

/// JSON-RPC client for an execution-layer ledger endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    base_url: String,
    client: Client,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: [&'a str; 1],
}

#[derive(Deserialize)]
struct RpcResponse {
    /// Outer None: no `result` field at all (not a JSON-RPC answer, e.g. a
    /// proxy error page served with a 200). Inner None: `result: null`, the
    /// ledger positively saying "no such transaction". Only the latter may
    /// condemn anyone.
    #[serde(default, deserialize_with = "present_even_if_null")]
    result: Option<Option<TxParticipants>>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

fn present_even_if_null<'de, D>(de: D) -> Result<Option<Option<TxParticipants>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<TxParticipants>::deserialize(de).map(Some)
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl JsonRpcLedger {
    pub fn new(url: String, timeout: Duration, retries: u32, retry_delay: Duration) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout,
            retries: retries.max(1),
            retry_delay,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn lookup_once(&self, hash: &str) -> Result<Option<TxParticipants>, LedgerError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_getTransactionByHash",
            params: [hash],
        };
        let resp = self
            .client
            .post(&self.base_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(LedgerError::Transport(format!("status {}", resp.status())));
        }
        let rpc: RpcResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))?;
        if let Some(err) = rpc.error {
            return Err(LedgerError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        match rpc.result {
            Some(found) => Ok(found),
            None => Err(LedgerError::Decode(
                "body carries neither result nor error".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LedgerService for JsonRpcLedger {
    async fn lookup_transaction(&self, hash: &str) -> Result<Option<TxParticipants>, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.lookup_once(hash).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.retries {
                        return Err(e);
                    }
                    tracing::warn!(hash, attempt, error = %e, "ledger lookup failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: Option<&str>) -> TxParticipants {
        TxParticipants {
            from: from.to_string(),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn test_confirmed_on_participant_match() {
        let outcome = classify("0xAbC", Ok(Some(tx("0xabc", Some("0xdef")))));
        assert_eq!(outcome, VerificationOutcome::Confirmed);

        let outcome = classify("0xDEF", Ok(Some(tx("0xabc", Some("0xdef")))));
        assert_eq!(outcome, VerificationOutcome::Confirmed);
    }

    #[test]
    fn test_fabricated_on_not_found_or_mismatch() {
        assert!(classify("0xabc", Ok(None)).is_fabricated());
        assert!(classify("0xabc", Ok(Some(tx("0x111", Some("0x222"))))).is_fabricated());
    }

    #[test]
    fn test_errors_stay_inconclusive() {
        let outcome = classify("0xabc", Err(LedgerError::Timeout));
        assert!(matches!(outcome, VerificationOutcome::Inconclusive(_)));
        assert!(!outcome.is_fabricated());
    }

    #[test]
    fn test_missing_to_is_not_a_match_for_receiver() {
        // Contract creation: to is null. Only the sender can match.
        let outcome = classify("0xabc", Ok(Some(tx("0xabc", None))));
        assert_eq!(outcome, VerificationOutcome::Confirmed);
        let outcome = classify("0xdef", Ok(Some(tx("0xabc", None))));
        assert!(outcome.is_fabricated());
    }

    #[test]
    fn test_rpc_body_distinguishes_null_result_from_no_result() {
        // A proxy's error page with a 200 status has no result field; it
        // must not read as the ledger saying "no such transaction".
        let rpc: RpcResponse = serde_json::from_str(r#"{"message":"rate limited"}"#).unwrap();
        assert!(rpc.result.is_none());
        assert!(rpc.error.is_none());

        let rpc: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(rpc.result, Some(None), "explicit null is a positive answer");

        let rpc: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":{"from":"0xabc","to":"0xdef"}}"#,
        )
        .unwrap();
        assert_eq!(rpc.result, Some(Some(tx("0xabc", Some("0xdef")))));
    }
}
