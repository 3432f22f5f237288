//! Durable data model for the registry: dataset scopes, statistics
//! snapshots and per-player records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk document version. Bumped when the persisted layout changes.
pub const REGISTRY_VERSION: u32 = 1;

/// Identifies one synchronization universe: a league plus a season.
///
/// Every registry document belongs to exactly one scope; requesting a
/// different scope always starts an empty registry (see
/// [`store::RegistryStore::load_or_create`](super::store::RegistryStore::load_or_create)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetScope {
    /// External league identifier (e.g. 39 for the Premier League).
    pub league: u32,
    /// Season year the statistics belong to.
    pub season: u32,
}

impl DatasetScope {
    /// Builds a scope from a league id and a season year.
    pub fn new(league: u32, season: u32) -> Self {
        Self { league, season }
    }
}

impl fmt::Display for DatasetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "league {} / season {}", self.league, self.season)
    }
}

/// The fixed set of statistics used for change detection and ledger writes.
///
/// Two snapshots are considered equal iff every counter matches; `updated_at`
/// and `provisional` never participate in the comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub goals: u32,
    pub assists: u32,
    pub penalties_scored: u32,
    pub shots_total: u32,
    pub shots_on_target: u32,
    pub duels_total: u32,
    pub duels_won: u32,
    pub tackles: u32,
    pub appearances: u32,
    pub cards_yellow: u32,
    pub cards_red: u32,
    /// Provider-side last-update timestamp. Excluded from change detection.
    pub updated_at: DateTime<Utc>,
    /// Marks a locally generated, non-authoritative snapshot (see
    /// [`StatSnapshot::placeholder`]). Excluded from change detection.
    #[serde(default)]
    pub provisional: bool,
}

/// The counters compared during reconciliation, in a fixed order.
///
/// Only a difference in one of these fields justifies a ledger write;
/// metadata changes update the registry alone. Widening the change-detection
/// policy means adding a row here.
pub const COMPARED_FIELDS: &[(&str, fn(&StatSnapshot) -> u32)] = &[
    ("goals", |s: &StatSnapshot| s.goals),
    ("assists", |s: &StatSnapshot| s.assists),
    ("penalties_scored", |s: &StatSnapshot| s.penalties_scored),
    ("shots_total", |s: &StatSnapshot| s.shots_total),
    ("shots_on_target", |s: &StatSnapshot| s.shots_on_target),
    ("duels_total", |s: &StatSnapshot| s.duels_total),
    ("duels_won", |s: &StatSnapshot| s.duels_won),
    ("tackles", |s: &StatSnapshot| s.tackles),
    ("appearances", |s: &StatSnapshot| s.appearances),
    ("cards_yellow", |s: &StatSnapshot| s.cards_yellow),
    ("cards_red", |s: &StatSnapshot| s.cards_red),
];

/// One field-level difference between a stored and a freshly fetched snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub previous: u32,
    pub current: u32,
}

impl StatSnapshot {
    /// A zeroed, locally generated snapshot used when the provider has no
    /// statistics for a freshly discovered player. Non-authoritative: the
    /// `provisional` marker stays set until a real fetch replaces it.
    pub fn placeholder() -> Self {
        Self {
            goals: 0,
            assists: 0,
            penalties_scored: 0,
            shots_total: 0,
            shots_on_target: 0,
            duels_total: 0,
            duels_won: 0,
            tackles: 0,
            appearances: 0,
            cards_yellow: 0,
            cards_red: 0,
            updated_at: Utc::now(),
            provisional: true,
        }
    }

    /// Computes the field-level diff against a newer snapshot over
    /// [`COMPARED_FIELDS`]. An empty result means "unchanged".
    pub fn diff(&self, newer: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        for (name, field) in COMPARED_FIELDS {
            let previous = field(self);
            let current = field(newer);
            if previous != current {
                changes.push(FieldChange {
                    field: name,
                    previous,
                    current,
                });
            }
        }
        changes
    }

    /// Counter-only equality. Timestamps and the provisional marker never
    /// make two snapshots unequal.
    pub fn counters_match(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

/// The durable unit of state, keyed by the player's external id within a
/// scope. `ledger_address` is write-once: provisioning never reassigns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub external_id: u64,
    pub display_name: String,
    /// Ledger address allocated at provisioning time. Never reassigned.
    pub ledger_address: String,
    pub team_external_id: u64,
    pub team_name: String,
    pub team_logo_url: Option<String>,
    pub venue_name: Option<String>,
    /// Token name derived from the player's name at provisioning time.
    pub token_name: String,
    /// Short symbolic code derived from the player's name.
    pub token_symbol: String,
    pub provisioned_at: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
    /// The last snapshot submitted to (or seeded into) the ledger record.
    pub last_snapshot: StatSnapshot,
}

/// The scope-tagged registry document. Serialized as pretty JSON so the
/// persisted file stays human-inspectable for operational recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub version: u32,
    pub scope: DatasetScope,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub records: BTreeMap<u64, RegistryRecord>,
}

impl Registry {
    /// Creates an empty registry for `scope`.
    pub fn new(scope: DatasetScope) -> Self {
        let now = Utc::now();
        Self {
            version: REGISTRY_VERSION,
            scope,
            created_at: now,
            last_updated: now,
            records: BTreeMap::new(),
        }
    }

    /// Looks up a record by external id.
    pub fn get(&self, external_id: u64) -> Option<&RegistryRecord> {
        self.records.get(&external_id)
    }

    /// Mutable lookup, used for in-place metadata refreshes.
    pub fn get_mut(&mut self, external_id: u64) -> Option<&mut RegistryRecord> {
        self.records.get_mut(&external_id)
    }

    /// Inserts or replaces a record and bumps the document timestamp.
    pub fn upsert(&mut self, record: RegistryRecord) {
        self.last_updated = Utc::now();
        self.records.insert(record.external_id, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
