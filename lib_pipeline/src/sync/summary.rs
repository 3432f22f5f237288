//! Run summaries: the report every provisioning or reconciliation pass
//! produces for operational tooling. Ephemeral: written once at the end of
//! a run, never an input to later runs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::model::{DatasetScope, FieldChange};

/// Which pass produced the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Provision,
    Reconcile,
}

/// Per-entity classification of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    /// A new ledger record was allocated and seeded.
    Provisioned {
        address: String,
        /// True when the seed snapshot is a locally generated placeholder.
        placeholder_stats: bool,
    },
    /// Nothing to do for this entity this run (already provisioned, or the
    /// provider had no data to reconcile against).
    Skipped { reason: String },
    /// A material change was detected and written to the ledger.
    Updated { changes: Vec<FieldChange> },
    /// The fetched snapshot matched the stored one; no ledger write.
    Unchanged,
    /// The entity failed this run and is left for the next pass.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub external_id: u64,
    pub display_name: String,
    #[serde(flatten)]
    pub outcome: EntityOutcome,
}

/// Aggregate report of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub kind: RunKind,
    pub scope: DatasetScope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub updated: usize,
    /// Run-level conditions that are not tied to one entity (e.g. a team
    /// roster that could not be listed).
    pub notes: Vec<String>,
    pub entries: Vec<EntityReport>,
}

impl SyncRunSummary {
    pub fn start(kind: RunKind, scope: DatasetScope) -> Self {
        let now = Utc::now();
        Self {
            kind,
            scope,
            started_at: now,
            finished_at: now,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            unchanged: 0,
            updated: 0,
            notes: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Records one entity outcome and bumps the matching aggregate counter.
    pub fn record(&mut self, external_id: u64, display_name: &str, outcome: EntityOutcome) {
        self.total += 1;
        match &outcome {
            EntityOutcome::Provisioned { .. } => self.succeeded += 1,
            EntityOutcome::Skipped { .. } => self.skipped += 1,
            EntityOutcome::Updated { .. } => {
                self.succeeded += 1;
                self.updated += 1;
            }
            EntityOutcome::Unchanged => self.unchanged += 1,
            EntityOutcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(EntityReport {
            external_id,
            display_name: display_name.to_string(),
            outcome,
        });
    }

    pub fn note(&mut self, note: String) {
        self.notes.push(note);
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// One-line aggregate for logging.
    pub fn headline(&self) -> String {
        format!(
            "{:?} pass for {}: {} total, {} succeeded ({} updated), {} unchanged, {} skipped, {} failed",
            self.kind,
            self.scope,
            self.total,
            self.succeeded,
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed
        )
    }
}
