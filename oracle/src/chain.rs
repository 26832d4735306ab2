//! The escrow chain surface the oracle talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use clashcast_types::{Address, DebateId, Signature, TokenAmount};

use crate::error::ChainError;

/// On-chain state of one escrow debate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateInfo {
    pub id: DebateId,
    pub entry_fee: TokenAmount,
    pub participant_count: u64,
    pub is_active: bool,
    pub is_completed: bool,
    pub winner: Option<Address>,
}

impl DebateInfo {
    /// Total pool collected: entry fee times participants.
    pub fn total_collected(&self) -> Option<TokenAmount> {
        self.entry_fee.checked_mul(self.participant_count as u128)
    }
}

/// Receipt of a submitted payout transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub debate_id: DebateId,
    pub winner: Address,
    pub amount: TokenAmount,
}

/// Minimum viable contract surface: read debate state, check
/// completion, and submit the signed payout.
#[async_trait]
pub trait EscrowChain: Send + Sync {
    async fn debate_info(&self, id: DebateId) -> Result<DebateInfo, ChainError>;

    async fn is_completed(&self, id: DebateId) -> Result<bool, ChainError>;

    /// Submit the signed payout. The contract recomputes the typed
    /// digest, verifies the signature against its registered oracle
    /// key, enforces the completed-debate guard, and transfers.
    async fn distribute_winner(
        &self,
        id: DebateId,
        winner: &Address,
        amount: TokenAmount,
        signature: &Signature,
    ) -> Result<TxReceipt, ChainError>;
}

/// Per-request timeout against the gateway.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Bounded retry for transient transport failures.
const MAX_ATTEMPTS: u32 = 3;
/// Initial backoff between attempts; doubles each retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct DistributeRequest<'a> {
    winner: &'a Address,
    amount: u128,
    signature: String,
}

#[derive(Deserialize)]
struct CompletedResponse {
    completed: bool,
}

/// HTTP client for an escrow chain gateway.
///
/// The gateway fronts the actual contract calls; this client only maps
/// its JSON surface onto [`EscrowChain`] with bounded timeouts and a
/// bounded retry for transport-level failures.
pub struct HttpEscrowChain {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEscrowChain {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn debate_url(&self, id: DebateId, suffix: &str) -> String {
        format!("{}/debates/{}{}", self.base_url, id.0, suffix)
    }

    /// Map an HTTP response status to the chain error taxonomy.
    fn map_status(id: DebateId, status: reqwest::StatusCode) -> ChainError {
        match status.as_u16() {
            404 => ChainError::DebateNotFound(id.0),
            409 => ChainError::DebateCompleted(id.0),
            422 => ChainError::InvalidSignature,
            s => ChainError::Gateway(format!("unexpected status {s}")),
        }
    }

    async fn get_with_retry(&self, id: DebateId, url: &str) -> Result<reqwest::Response, ChainError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .client
                .get(url)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => return Err(Self::map_status(id, resp.status())),
                Err(e) => {
                    warn!(url, attempt, error = %e, "chain gateway request failed");
                    last_err = Some(ChainError::Transport(e.to_string()));
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ChainError::Transport("no attempts made".into())))
    }
}

#[async_trait]
impl EscrowChain for HttpEscrowChain {
    async fn debate_info(&self, id: DebateId) -> Result<DebateInfo, ChainError> {
        let resp = self.get_with_retry(id, &self.debate_url(id, "")).await?;
        resp.json()
            .await
            .map_err(|e| ChainError::Gateway(format!("malformed debate info: {e}")))
    }

    async fn is_completed(&self, id: DebateId) -> Result<bool, ChainError> {
        let resp = self
            .get_with_retry(id, &self.debate_url(id, "/completed"))
            .await?;
        let body: CompletedResponse = resp
            .json()
            .await
            .map_err(|e| ChainError::Gateway(format!("malformed completed response: {e}")))?;
        Ok(body.completed)
    }

    async fn distribute_winner(
        &self,
        id: DebateId,
        winner: &Address,
        amount: TokenAmount,
        signature: &Signature,
    ) -> Result<TxReceipt, ChainError> {
        // Submission is not retried at the transport layer: the sweep
        // owns the retry policy and the contract's completed guard
        // makes resubmission safe anyway.
        let body = DistributeRequest {
            winner,
            amount: amount.raw(),
            signature: signature.to_hex(),
        };
        let resp = self
            .client
            .post(self.debate_url(id, "/distribute"))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::map_status(id, resp.status()));
        }
        resp.json()
            .await
            .map_err(|e| ChainError::Gateway(format!("malformed receipt: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_collected_multiplies() {
        let info = DebateInfo {
            id: DebateId(1),
            entry_fee: TokenAmount::from_tokens(1),
            participant_count: 5,
            is_active: true,
            is_completed: false,
            winner: None,
        };
        assert_eq!(info.total_collected(), Some(TokenAmount::from_tokens(5)));
    }

    #[test]
    fn total_collected_overflow_is_none() {
        let info = DebateInfo {
            id: DebateId(1),
            entry_fee: TokenAmount::new(u128::MAX),
            participant_count: 2,
            is_active: true,
            is_completed: false,
            winner: None,
        };
        assert!(info.total_collected().is_none());
    }

    #[test]
    fn status_mapping() {
        let id = DebateId(3);
        assert!(matches!(
            HttpEscrowChain::map_status(id, reqwest::StatusCode::NOT_FOUND),
            ChainError::DebateNotFound(3)
        ));
        assert!(matches!(
            HttpEscrowChain::map_status(id, reqwest::StatusCode::CONFLICT),
            ChainError::DebateCompleted(3)
        ));
        assert!(matches!(
            HttpEscrowChain::map_status(id, reqwest::StatusCode::UNPROCESSABLE_ENTITY),
            ChainError::InvalidSignature
        ));
        assert!(matches!(
            HttpEscrowChain::map_status(id, reqwest::StatusCode::BAD_GATEWAY),
            ChainError::Gateway(_)
        ));
    }

    #[test]
    fn base_url_is_normalized() {
        let chain = HttpEscrowChain::new("https://gateway.example/");
        assert_eq!(
            chain.debate_url(DebateId(9), "/completed"),
            "https://gateway.example/debates/9/completed"
        );
    }
}
