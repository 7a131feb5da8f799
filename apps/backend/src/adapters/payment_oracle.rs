//! Payment oracle: the boundary to the on-chain escrow that gates paid
//! lobbies.
//!
//! The server only ever asks two questions: which on-chain lobby a creation
//! transaction made, and whether a join transaction paid into a given
//! on-chain lobby. Everything else about the contract lives elsewhere.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::state::OnchainLobbyId;

/// What the escrow recorded for a lobby creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLobby {
    pub onchain_lobby_id: OnchainLobbyId,
    pub creator: String,
    /// Decimal string in the chain's smallest unit.
    pub entry_fee: String,
    pub max_players: u32,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinVerification {
    Verified { player: String, total_players: u32 },
    Rejected { reason: String },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("paid lobbies are disabled")]
    Disabled,
    #[error("unknown transaction {0}")]
    UnknownTransaction(String),
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle responded with status {0}")]
    Status(u16),
    #[error("malformed oracle response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PaymentOracle: Send + Sync {
    async fn resolve_lobby_id_from_tx(&self, tx_hash: &str) -> Result<ResolvedLobby, OracleError>;

    async fn verify_join_tx(
        &self,
        tx_hash: &str,
        expected: OnchainLobbyId,
    ) -> Result<JoinVerification, OracleError>;
}

/// Talks JSON over HTTP to an oracle service that watches the chain.
pub struct HttpPaymentOracle {
    client: reqwest::Client,
    base: String,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    tx_hash: &'a str,
}

#[derive(Serialize)]
struct VerifyJoinRequest<'a> {
    tx_hash: &'a str,
    onchain_lobby_id: OnchainLobbyId,
}

#[derive(Deserialize)]
struct VerifyJoinResponse {
    ok: bool,
    #[serde(default)]
    player: Option<String>,
    #[serde(default)]
    total_players: Option<u32>,
    #[serde(default)]
    reason: Option<String>,
}

impl HttpPaymentOracle {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, OracleError> {
        let url = format!("{}{path}", self.base);
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl PaymentOracle for HttpPaymentOracle {
    async fn resolve_lobby_id_from_tx(&self, tx_hash: &str) -> Result<ResolvedLobby, OracleError> {
        let resp = self
            .post("/lobbies/resolve", &ResolveRequest { tx_hash })
            .await?;
        resp.json::<ResolvedLobby>()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))
    }

    async fn verify_join_tx(
        &self,
        tx_hash: &str,
        expected: OnchainLobbyId,
    ) -> Result<JoinVerification, OracleError> {
        let resp = self
            .post(
                "/lobbies/verify-join",
                &VerifyJoinRequest {
                    tx_hash,
                    onchain_lobby_id: expected,
                },
            )
            .await?;
        let body = resp
            .json::<VerifyJoinResponse>()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;
        if !body.ok {
            return Ok(JoinVerification::Rejected {
                reason: body
                    .reason
                    .unwrap_or_else(|| "rejected by oracle".to_string()),
            });
        }
        match (body.player, body.total_players) {
            (Some(player), Some(total_players)) => Ok(JoinVerification::Verified {
                player,
                total_players,
            }),
            _ => Err(OracleError::Decode(
                "verified join without player or total_players".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct Ledger {
    creations: HashMap<String, ResolvedLobby>,
    /// join tx → (on-chain lobby, payer)
    joins: HashMap<String, (OnchainLobbyId, String)>,
}

/// Scripted oracle for tests and local development.
#[derive(Default)]
pub struct InMemoryPaymentOracle {
    ledger: RwLock<Ledger>,
    latency: Option<Duration>,
}

impl InMemoryPaymentOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer, e.g. to exercise caller timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn register_creation(&self, tx_hash: impl Into<String>, lobby: ResolvedLobby) {
        self.ledger.write().creations.insert(tx_hash.into(), lobby);
    }

    pub fn register_join(
        &self,
        tx_hash: impl Into<String>,
        onchain_lobby_id: OnchainLobbyId,
        player: impl Into<String>,
    ) {
        self.ledger
            .write()
            .joins
            .insert(tx_hash.into(), (onchain_lobby_id, player.into()));
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentOracle for InMemoryPaymentOracle {
    async fn resolve_lobby_id_from_tx(&self, tx_hash: &str) -> Result<ResolvedLobby, OracleError> {
        self.simulate_latency().await;
        self.ledger
            .read()
            .creations
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| OracleError::UnknownTransaction(tx_hash.to_string()))
    }

    async fn verify_join_tx(
        &self,
        tx_hash: &str,
        expected: OnchainLobbyId,
    ) -> Result<JoinVerification, OracleError> {
        self.simulate_latency().await;
        let ledger = self.ledger.read();
        let Some((paid_into, player)) = ledger.joins.get(tx_hash) else {
            return Ok(JoinVerification::Rejected {
                reason: format!("transaction {tx_hash} not found"),
            });
        };
        if *paid_into != expected {
            debug!(tx_hash, paid_into, expected, "join tx paid into another lobby");
            return Ok(JoinVerification::Rejected {
                reason: format!("transaction paid into lobby {paid_into}, not {expected}"),
            });
        }
        let total_players = ledger
            .joins
            .values()
            .filter(|(id, _)| *id == expected)
            .count() as u32;
        Ok(JoinVerification::Verified {
            player: player.clone(),
            total_players,
        })
    }
}

/// Used when paid lobbies are turned off: every call fails.
pub struct DisabledPaymentOracle;

#[async_trait]
impl PaymentOracle for DisabledPaymentOracle {
    async fn resolve_lobby_id_from_tx(&self, _tx_hash: &str) -> Result<ResolvedLobby, OracleError> {
        Err(OracleError::Disabled)
    }

    async fn verify_join_tx(
        &self,
        _tx_hash: &str,
        _expected: OnchainLobbyId,
    ) -> Result<JoinVerification, OracleError> {
        Err(OracleError::Disabled)
    }
}
