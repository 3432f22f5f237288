//! # External Statistics Provider Module
//!
//! This module groups the client logic and data models for the external
//! football statistics API. Its purpose is to abstract the details of the
//! remote service, handing normalized records to the orchestrators.
//!
//! ## Contained Modules:
//!
//! - **`model`**: Normalized team and player records as the rest of the
//!   pipeline consumes them.
//!
//! - **`football`**: The `FootballApi` HTTP client, including API-key
//!   headers, response-envelope unwrapping, pagination and the
//!   null-to-zero decoding of counter fields.
//!
//! The seam between the orchestrators and the network is the
//! [`StatProvider`] trait, so tests can substitute scripted providers.

#![forbid(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::model::{DatasetScope, StatSnapshot};

/// HTTP client for the football statistics API.
pub mod football;
/// Normalized provider-side records.
pub mod model;

use model::{PlayerRecord, TeamRecord};

/// Failure surfaced by a provider call.
///
/// A well-formed response with zero results is NOT an error: callers receive
/// an empty collection (or `None` for single-entity lookups) and must treat
/// "found nothing" as a valid outcome.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure, non-2xx status, or a business-level error payload
    /// inside an otherwise successful response.
    #[error("provider unavailable at {endpoint} ({scope}): {reason}")]
    Unavailable {
        endpoint: String,
        scope: DatasetScope,
        reason: String,
    },
}

/// Trait that every statistics provider must implement.
#[async_trait]
pub trait StatProvider: Send + Sync {
    /// Returns every team participating in the scope's league and season.
    async fn fetch_teams(&self, scope: &DatasetScope) -> Result<Vec<TeamRecord>, ProviderError>;

    /// Returns the roster of one team within the scope. An empty roster is a
    /// valid, non-exceptional outcome.
    async fn fetch_players(
        &self,
        team_id: u64,
        scope: &DatasetScope,
    ) -> Result<Vec<PlayerRecord>, ProviderError>;

    /// Fetches the current statistics snapshot for one player. `Ok(None)`
    /// means the provider answered but holds no statistics for the player.
    async fn fetch_player_stats(
        &self,
        player_id: u64,
        scope: &DatasetScope,
    ) -> Result<Option<StatSnapshot>, ProviderError>;

    /// Cooperative pacing delay the caller inserts between successive
    /// external calls to respect the provider's request budget. A
    /// client-side contract, not something the provider enforces.
    async fn pace(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
