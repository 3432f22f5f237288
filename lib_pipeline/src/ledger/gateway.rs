//! HTTP gateway implementation of the ledger collaborator.
//!
//! The gateway service fronts the actual chain: it allocates addressed
//! records, accepts snapshot payloads and exposes transaction status. Every
//! write here is submit-then-poll: the call does not return until the
//! transaction is confirmed, rejected, or the bounded polling budget is
//! exhausted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::registry::model::StatSnapshot;
use crate::retrieve::api_client::ApiClient;

use super::{Ledger, LedgerAddress, LedgerError, TxReceipt};

/// The snapshot payload as written to a ledger record: the compared
/// counters plus the provider-side timestamp. Local markers such as
/// `provisional` never leave the registry.
#[derive(Debug, Serialize)]
struct SnapshotPayload {
    goals: u32,
    assists: u32,
    penalties_scored: u32,
    shots_total: u32,
    shots_on_target: u32,
    duels_total: u32,
    duels_won: u32,
    tackles: u32,
    appearances: u32,
    cards_yellow: u32,
    cards_red: u32,
    updated_at: DateTime<Utc>,
}

impl From<&StatSnapshot> for SnapshotPayload {
    fn from(snapshot: &StatSnapshot) -> Self {
        Self {
            goals: snapshot.goals,
            assists: snapshot.assists,
            penalties_scored: snapshot.penalties_scored,
            shots_total: snapshot.shots_total,
            shots_on_target: snapshot.shots_on_target,
            duels_total: snapshot.duels_total,
            duels_won: snapshot.duels_won,
            tackles: snapshot.tackles,
            appearances: snapshot.appearances,
            cards_yellow: snapshot.cards_yellow,
            cards_red: snapshot.cards_red,
            updated_at: snapshot.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProvisionRequest<'a> {
    name: &'a str,
    symbol: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    address: String,
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct TxStatusResponse {
    status: String,
}

/// HTTP-backed [`Ledger`] implementation.
pub struct LedgerGateway {
    client: ApiClient,
    confirm_poll: Duration,
    confirm_attempts: u32,
}

impl LedgerGateway {
    /// Creates a gateway client.
    ///
    /// `confirm_poll` and `confirm_attempts` bound the blocking wait for
    /// transaction confirmation; together they are the ledger-side timeout.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        confirm_poll: Duration,
        confirm_attempts: u32,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(Self {
            client: ApiClient::new(base_url, headers, timeout, 3)?,
            confirm_poll,
            confirm_attempts,
        })
    }

    /// Submits a request body and decodes the acknowledgement.
    async fn submit<B, T>(&self, endpoint: &str, body: &B) -> Result<T, LedgerError>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let transport = |reason: String| LedgerError::Transport {
            endpoint: endpoint.to_string(),
            reason,
        };

        let response = self
            .client
            .post_json::<T, B>(endpoint, body)
            .await
            .map_err(|e| transport(e.to_string()))?;

        if !response.success {
            let body = response.error_body.unwrap_or_default();
            return Err(transport(format!(
                "HTTP status {}: {}",
                response.status,
                body.trim()
            )));
        }

        response
            .data
            .ok_or_else(|| transport("empty acknowledgement body".to_string()))
    }

    /// Polls the transaction status endpoint until the write is confirmed.
    ///
    /// Confirmation latency is a blocking wait; the polling budget turns an
    /// unbounded wait into an ordinary [`LedgerError::Timeout`].
    async fn wait_for_confirmation(&self, tx_id: &str) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("transactions/{}", tx_id);
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let response = self
                .client
                .get_json::<TxStatusResponse>(&endpoint, &[])
                .await
                .map_err(|e| LedgerError::Transport {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?;

            if let Some(tx) = response.data {
                match tx.status.as_str() {
                    "confirmed" => {
                        return Ok(TxReceipt {
                            tx_id: tx_id.to_string(),
                            confirmed_at: Utc::now(),
                        });
                    }
                    "rejected" => {
                        return Err(LedgerError::Rejected {
                            tx_id: tx_id.to_string(),
                        });
                    }
                    other => {
                        log::debug!("Transaction {} still {}", tx_id, other);
                    }
                }
            }

            if attempts >= self.confirm_attempts {
                return Err(LedgerError::Timeout {
                    tx_id: tx_id.to_string(),
                    attempts,
                });
            }

            tokio::time::sleep(self.confirm_poll).await;
        }
    }
}

#[async_trait]
impl Ledger for LedgerGateway {
    async fn provision_record(
        &self,
        name: &str,
        symbol: &str,
    ) -> Result<LedgerAddress, LedgerError> {
        let ack: ProvisionResponse = self
            .submit("records", &ProvisionRequest { name, symbol })
            .await?;
        self.wait_for_confirmation(&ack.tx_id).await?;
        log::info!("Provisioned ledger record {} ({})", ack.address, symbol);
        Ok(LedgerAddress(ack.address))
    }

    async fn write_initial(
        &self,
        address: &str,
        snapshot: &StatSnapshot,
    ) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("records/{}/init", address);
        let ack: SubmitResponse = self
            .submit(&endpoint, &SnapshotPayload::from(snapshot))
            .await?;
        self.wait_for_confirmation(&ack.tx_id).await
    }

    async fn write_update(
        &self,
        address: &str,
        snapshot: &StatSnapshot,
    ) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("records/{}/snapshots", address);
        let ack: SubmitResponse = self
            .submit(&endpoint, &SnapshotPayload::from(snapshot))
            .await?;
        self.wait_for_confirmation(&ack.tx_id).await
    }

    fn name(&self) -> &str {
        "ledger-gateway"
    }
}
