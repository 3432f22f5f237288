//! Normalized provider-side records.
//!
//! The wire shapes of the statistics API live next to the client in
//! `football`; these are the cleaned-up forms the orchestrators consume.

use serde::{Deserialize, Serialize};

/// One team as discovered from the provider for a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub external_id: u64,
    pub name: String,
    pub logo_url: Option<String>,
    pub venue_name: Option<String>,
}

/// One player as discovered from a team roster.
///
/// Identity and display metadata only; statistics are fetched separately via
/// [`StatProvider::fetch_player_stats`](super::StatProvider::fetch_player_stats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub external_id: u64,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub age: Option<u8>,
    pub photo_url: Option<String>,
}

impl PlayerRecord {
    /// The best available full name, preferred for token derivation:
    /// "firstname lastname" when both are known, otherwise the display name.
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.display_name.clone(),
        }
    }
}
