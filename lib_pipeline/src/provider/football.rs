//! HTTP client for the football statistics API.
//!
//! The provider wraps every payload in a common envelope carrying the result
//! list, pagination cursors and a business-level error object that can be
//! populated even on HTTP 200. Counter fields arrive as `null` for players
//! who never incremented them; those decode to zero deterministically so no
//! missing value propagates into the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::registry::model::{DatasetScope, StatSnapshot};
use crate::retrieve::api_client::ApiClient;

use super::model::{PlayerRecord, TeamRecord};
use super::{ProviderError, StatProvider};

/// Delay between successive pages of one paginated roster request.
const PAGE_DELAY_MS: u64 = 250;

/// Deserializes a nullable numeric counter into a plain `u32`.
///
/// The provider emits `null` for counters a player has never incremented.
fn de_null_counter<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.max(0) as u32).unwrap_or(0))
}

/// Common response envelope of the statistics API.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    response: Vec<T>,
    #[serde(default)]
    paging: Paging,
    /// Business-level errors; populated even on HTTP 200 (bad key, quota).
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    current: u32,
    #[serde(default)]
    total: u32,
}

fn envelope_has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    team: TeamInfo,
    #[serde(default)]
    venue: Option<VenueInfo>,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VenueInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    player: PlayerInfo,
    #[serde(default)]
    statistics: Vec<StatBlock>,
}

#[derive(Debug, Deserialize)]
struct PlayerInfo {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
    #[serde(default)]
    age: Option<u8>,
    #[serde(default)]
    nationality: Option<String>,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatBlock {
    #[serde(default)]
    games: GamesBlock,
    #[serde(default)]
    goals: GoalsBlock,
    #[serde(default)]
    shots: ShotsBlock,
    #[serde(default)]
    duels: DuelsBlock,
    #[serde(default)]
    tackles: TacklesBlock,
    #[serde(default)]
    cards: CardsBlock,
    #[serde(default)]
    penalty: PenaltyBlock,
}

#[derive(Debug, Default, Deserialize)]
struct GamesBlock {
    // The provider's own spelling of "appearances".
    #[serde(default, deserialize_with = "de_null_counter")]
    appearences: u32,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoalsBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    total: u32,
    #[serde(default, deserialize_with = "de_null_counter")]
    assists: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ShotsBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    total: u32,
    #[serde(default, deserialize_with = "de_null_counter")]
    on: u32,
}

#[derive(Debug, Default, Deserialize)]
struct DuelsBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    total: u32,
    #[serde(default, deserialize_with = "de_null_counter")]
    won: u32,
}

#[derive(Debug, Default, Deserialize)]
struct TacklesBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    total: u32,
}

#[derive(Debug, Default, Deserialize)]
struct CardsBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    yellow: u32,
    #[serde(default, deserialize_with = "de_null_counter")]
    red: u32,
}

#[derive(Debug, Default, Deserialize)]
struct PenaltyBlock {
    #[serde(default, deserialize_with = "de_null_counter")]
    scored: u32,
}

fn snapshot_from_block(block: &StatBlock) -> StatSnapshot {
    StatSnapshot {
        goals: block.goals.total,
        assists: block.goals.assists,
        penalties_scored: block.penalty.scored,
        shots_total: block.shots.total,
        shots_on_target: block.shots.on,
        duels_total: block.duels.total,
        duels_won: block.duels.won,
        tackles: block.tackles.total,
        appearances: block.games.appearences,
        cards_yellow: block.cards.yellow,
        cards_red: block.cards.red,
        updated_at: Utc::now(),
        provisional: false,
    }
}

fn roster_entry(entry: &PlayerEntry) -> PlayerRecord {
    let info = &entry.player;
    let display_name = info
        .name
        .clone()
        .or_else(|| match (&info.firstname, &info.lastname) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ => None,
        })
        .unwrap_or_else(|| format!("player-{}", info.id));

    PlayerRecord {
        external_id: info.id,
        display_name,
        first_name: info.firstname.clone(),
        last_name: info.lastname.clone(),
        position: entry
            .statistics
            .first()
            .and_then(|block| block.games.position.clone()),
        nationality: info.nationality.clone(),
        age: info.age,
        photo_url: info.photo.clone(),
    }
}

/// Client for the football statistics API.
pub struct FootballApi {
    client: ApiClient,
    page_pace: Duration,
}

impl FootballApi {
    /// Creates a client authenticated with the given API key.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL of the statistics API.
    /// * `api_key` - Static credential sent with every request.
    /// * `timeout` - Bounded per-request timeout.
    /// * `max_retries` - Transient-failure retries performed by the middleware.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let header_list = [
            ("accept", "application/json"),
            ("x-apisports-key", api_key),
        ];
        for (name, value) in header_list {
            if let (Ok(h_name), Ok(h_value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(h_name, h_value);
            }
        }

        Ok(Self {
            client: ApiClient::new(base_url, headers, timeout, max_retries)?,
            page_pace: Duration::from_millis(PAGE_DELAY_MS),
        })
    }

    /// Performs one GET and unwraps the provider envelope.
    ///
    /// Transport errors, non-2xx statuses and business-level error payloads
    /// all surface as [`ProviderError::Unavailable`] naming the endpoint and
    /// scope so the caller can decide what to do with the entity.
    async fn get_envelope<T>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        scope: &DatasetScope,
    ) -> Result<Envelope<T>, ProviderError>
    where
        T: DeserializeOwned,
    {
        let unavailable = |reason: String| ProviderError::Unavailable {
            endpoint: endpoint.to_string(),
            scope: *scope,
            reason,
        };

        let response = self
            .client
            .get_json::<Envelope<T>>(endpoint, query)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.success {
            let body = response.error_body.unwrap_or_default();
            return Err(unavailable(format!(
                "HTTP status {}: {}",
                response.status,
                body.trim()
            )));
        }

        let envelope = response
            .data
            .ok_or_else(|| unavailable("empty response body".to_string()))?;

        if envelope_has_errors(&envelope.errors) {
            return Err(unavailable(format!(
                "provider error payload: {}",
                envelope.errors
            )));
        }

        Ok(envelope)
    }
}

#[async_trait]
impl StatProvider for FootballApi {
    async fn fetch_teams(&self, scope: &DatasetScope) -> Result<Vec<TeamRecord>, ProviderError> {
        let query = [
            ("league", scope.league.to_string()),
            ("season", scope.season.to_string()),
        ];
        let envelope = self.get_envelope::<TeamEntry>("teams", &query, scope).await?;

        let teams: Vec<TeamRecord> = envelope
            .response
            .iter()
            .map(|entry| TeamRecord {
                external_id: entry.team.id,
                name: entry
                    .team
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("team-{}", entry.team.id)),
                logo_url: entry.team.logo.clone(),
                venue_name: entry.venue.as_ref().and_then(|v| v.name.clone()),
            })
            .collect();

        log::debug!("Fetched {} teams for {}", teams.len(), scope);
        Ok(teams)
    }

    async fn fetch_players(
        &self,
        team_id: u64,
        scope: &DatasetScope,
    ) -> Result<Vec<PlayerRecord>, ProviderError> {
        let mut players = Vec::new();
        let mut page = 1u32;

        loop {
            let query = [
                ("team", team_id.to_string()),
                ("league", scope.league.to_string()),
                ("season", scope.season.to_string()),
                ("page", page.to_string()),
            ];
            let envelope = self
                .get_envelope::<PlayerEntry>("players", &query, scope)
                .await?;

            players.extend(envelope.response.iter().map(roster_entry));

            if envelope.paging.total == 0 || envelope.paging.current >= envelope.paging.total {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_pace).await;
        }

        log::debug!(
            "Fetched {} players for team {} in {}",
            players.len(),
            team_id,
            scope
        );
        Ok(players)
    }

    async fn fetch_player_stats(
        &self,
        player_id: u64,
        scope: &DatasetScope,
    ) -> Result<Option<StatSnapshot>, ProviderError> {
        let query = [
            ("id", player_id.to_string()),
            ("league", scope.league.to_string()),
            ("season", scope.season.to_string()),
        ];
        let envelope = self
            .get_envelope::<PlayerEntry>("players", &query, scope)
            .await?;

        // A well-formed response with no entry or no statistics block is a
        // valid "nothing recorded yet" outcome.
        Ok(envelope
            .response
            .first()
            .and_then(|entry| entry.statistics.first())
            .map(snapshot_from_block))
    }

    fn name(&self) -> &str {
        "football-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Starts a mock HTTP server answering each connection with the next
    /// canned response, then returns its base URL.
    fn spawn_server(responses: Vec<(u16, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    break;
                };
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}/", addr)
    }

    fn api(base_url: &str) -> FootballApi {
        FootballApi::new(base_url, "test-key", Duration::from_secs(5), 0).unwrap()
    }

    fn scope() -> DatasetScope {
        DatasetScope::new(39, 2023)
    }

    #[tokio::test]
    async fn fetch_teams_parses_entries() {
        let body = serde_json::json!({
            "response": [
                {
                    "team": { "id": 50, "name": "Manchester City", "logo": "https://media.example/50.png" },
                    "venue": { "name": "Etihad Stadium" }
                }
            ],
            "paging": { "current": 1, "total": 1 },
            "errors": []
        })
        .to_string();
        let base_url = spawn_server(vec![(200, body)]);

        let teams = api(&base_url).fetch_teams(&scope()).await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].external_id, 50);
        assert_eq!(teams[0].name, "Manchester City");
        assert_eq!(teams[0].venue_name.as_deref(), Some("Etihad Stadium"));
    }

    #[tokio::test]
    async fn empty_response_is_not_an_error() {
        let body = serde_json::json!({
            "response": [],
            "paging": { "current": 1, "total": 0 },
            "errors": []
        })
        .to_string();
        let base_url = spawn_server(vec![(200, body)]);

        let teams = api(&base_url).fetch_teams(&scope()).await.unwrap();
        assert!(teams.is_empty());
    }

    #[tokio::test]
    async fn http_failure_is_unavailable() {
        let base_url = spawn_server(vec![(500, "{}".to_string())]);

        let err = api(&base_url).fetch_teams(&scope()).await.unwrap_err();
        let ProviderError::Unavailable { endpoint, .. } = err;
        assert_eq!(endpoint, "teams");
    }

    #[tokio::test]
    async fn business_error_payload_is_unavailable() {
        let body = serde_json::json!({
            "response": [],
            "paging": { "current": 1, "total": 0 },
            "errors": { "token": "Error/Missing application key." }
        })
        .to_string();
        let base_url = spawn_server(vec![(200, body)]);

        let err = api(&base_url).fetch_teams(&scope()).await.unwrap_err();
        let ProviderError::Unavailable { reason, .. } = err;
        assert!(reason.contains("application key"));
    }

    #[tokio::test]
    async fn null_counters_decode_to_zero() {
        let body = serde_json::json!({
            "response": [
                {
                    "player": { "id": 874, "name": "Test Player", "age": 27 },
                    "statistics": [
                        {
                            "games": { "appearences": 12, "position": "Attacker" },
                            "goals": { "total": 7, "assists": null },
                            "shots": { "total": null, "on": null },
                            "duels": { "total": 90, "won": 41 },
                            "tackles": { "total": null },
                            "cards": { "yellow": 1, "red": null },
                            "penalty": { "scored": null }
                        }
                    ]
                }
            ],
            "paging": { "current": 1, "total": 1 },
            "errors": []
        })
        .to_string();
        let base_url = spawn_server(vec![(200, body)]);

        let snapshot = api(&base_url)
            .fetch_player_stats(874, &scope())
            .await
            .unwrap()
            .expect("stats present");
        assert_eq!(snapshot.goals, 7);
        assert_eq!(snapshot.assists, 0);
        assert_eq!(snapshot.shots_total, 0);
        assert_eq!(snapshot.duels_won, 41);
        assert_eq!(snapshot.tackles, 0);
        assert_eq!(snapshot.appearances, 12);
        assert!(!snapshot.provisional);
    }

    #[tokio::test]
    async fn missing_statistics_is_not_found() {
        let body = serde_json::json!({
            "response": [
                { "player": { "id": 874, "name": "Test Player" }, "statistics": [] }
            ],
            "paging": { "current": 1, "total": 1 },
            "errors": []
        })
        .to_string();
        let base_url = spawn_server(vec![(200, body)]);

        let snapshot = api(&base_url).fetch_player_stats(874, &scope()).await.unwrap();
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn roster_pagination_is_followed() {
        let page = |id: u64, current: u32, total: u32| {
            serde_json::json!({
                "response": [
                    { "player": { "id": id, "name": format!("Player {}", id) }, "statistics": [] }
                ],
                "paging": { "current": current, "total": total },
                "errors": []
            })
            .to_string()
        };
        let base_url = spawn_server(vec![(200, page(1, 1, 2)), (200, page(2, 2, 2))]);

        let players = api(&base_url).fetch_players(50, &scope()).await.unwrap();
        let ids: Vec<u64> = players.iter().map(|p| p.external_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
