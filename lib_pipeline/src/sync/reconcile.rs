//! Reconciliation engine: re-fetches statistics for every provisioned
//! player, diffs them against the stored snapshot, and writes to the ledger
//! only when a material change is detected.
//!
//! Ledger writes carry a non-refundable cost, so the diff-before-write
//! policy is the heart of this engine: a payload identical to what is
//! already recorded must never be submitted. Equality is defined strictly
//! over the fixed counter set; metadata refreshes (team name, logo, venue)
//! update the registry alone.

use std::collections::HashMap;

use chrono::Utc;

use crate::configs::config_pipeline::PipelineConfig;
use crate::ledger::Ledger;
use crate::provider::model::TeamRecord;
use crate::provider::StatProvider;
use crate::registry::model::{FieldChange, Registry, RegistryRecord, StatSnapshot};
use crate::registry::store::RegistryStore;

use super::summary::{EntityOutcome, RunKind, SyncRunSummary};
use super::SyncError;

/// Outcome of diffing one record against a freshly fetched snapshot.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Every compared counter matched; nothing to write.
    Unchanged,
    /// At least one counter differs; the ledger record is stale.
    Changed(Vec<FieldChange>),
}

/// Pure diff of one registry record against a fresh snapshot.
pub fn reconcile_one(record: &RegistryRecord, fresh: &StatSnapshot) -> ReconcileOutcome {
    let changes = record.last_snapshot.diff(fresh);
    if changes.is_empty() {
        ReconcileOutcome::Unchanged
    } else {
        ReconcileOutcome::Changed(changes)
    }
}

/// Walks every provisioned record and keeps the ledger current.
pub struct Reconciler<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn StatProvider,
    ledger: &'a dyn Ledger,
    store: &'a RegistryStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        provider: &'a dyn StatProvider,
        ledger: &'a dyn Ledger,
        store: &'a RegistryStore,
    ) -> Self {
        Self {
            config,
            provider,
            ledger,
            store,
        }
    }

    /// Runs one full reconciliation pass over the registry.
    ///
    /// A failed fetch or a failed ledger write leaves the stored snapshot
    /// untouched, so the next cycle recomputes the same diff and retries.
    /// Only registry store failures abort the run.
    pub async fn reconcile_all(&self, registry: &mut Registry) -> Result<SyncRunSummary, SyncError> {
        let scope = self.config.scope;
        let mut summary = SyncRunSummary::start(RunKind::Reconcile, scope);
        log::info!(
            "Reconciliation pass starting for {} ({} records)",
            scope,
            registry.len()
        );

        // Opportunistic metadata refresh: one team listing per run. Not
        // having it only costs the metadata, never the counter sync.
        let team_index: HashMap<u64, TeamRecord> = match self.provider.fetch_teams(&scope).await {
            Ok(teams) => teams.into_iter().map(|t| (t.external_id, t)).collect(),
            Err(e) => {
                log::warn!("Team metadata refresh unavailable this run: {}", e);
                summary.note(format!("team metadata refresh unavailable: {}", e));
                HashMap::new()
            }
        };

        let ids: Vec<u64> = registry.records.keys().copied().collect();
        let mut since_checkpoint = 0usize;

        for external_id in ids {
            let Some(record) = registry.get(external_id).cloned() else {
                continue;
            };

            let fresh = match self
                .provider
                .fetch_player_stats(external_id, &scope)
                .await
            {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    summary.record(
                        external_id,
                        &record.display_name,
                        EntityOutcome::Skipped {
                            reason: "provider returned no statistics".to_string(),
                        },
                    );
                    self.provider.pace(self.config.pace).await;
                    continue;
                }
                Err(e) => {
                    // Never mutate state on a failed fetch.
                    summary.record(
                        external_id,
                        &record.display_name,
                        EntityOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                    self.provider.pace(self.config.pace).await;
                    continue;
                }
            };

            match reconcile_one(&record, &fresh) {
                ReconcileOutcome::Unchanged => {
                    // No ledger write. The registry only gets the sync
                    // timestamp and a metadata refresh.
                    if let Some(live) = registry.get_mut(external_id) {
                        live.last_synced_at = Utc::now();
                        live.last_snapshot.provisional = fresh.provisional;
                        refresh_team_metadata(live, &team_index);
                    }
                    summary.record(external_id, &record.display_name, EntityOutcome::Unchanged);
                }
                ReconcileOutcome::Changed(changes) => {
                    match self.ledger.write_update(&record.ledger_address, &fresh).await {
                        Ok(receipt) => {
                            log::info!(
                                "Updated {} ({}) on the ledger, tx {}",
                                record.display_name,
                                external_id,
                                receipt.tx_id
                            );
                            let mut updated = record.clone();
                            updated.last_snapshot = fresh;
                            updated.last_synced_at = Utc::now();
                            refresh_team_metadata(&mut updated, &team_index);
                            registry.upsert(updated);
                            summary.record(
                                external_id,
                                &record.display_name,
                                EntityOutcome::Updated { changes },
                            );
                            since_checkpoint += 1;
                            if since_checkpoint >= self.config.checkpoint_every {
                                self.store.save(registry)?;
                                since_checkpoint = 0;
                            }
                        }
                        Err(e) => {
                            // The stored snapshot does not advance; the next
                            // run recomputes the diff and retries the write.
                            log::warn!(
                                "Ledger update failed for {} ({}): {}",
                                record.display_name,
                                external_id,
                                e
                            );
                            summary.record(
                                external_id,
                                &record.display_name,
                                EntityOutcome::Failed {
                                    reason: e.to_string(),
                                },
                            );
                        }
                    }
                }
            }

            self.provider.pace(self.config.pace).await;
        }

        self.store.save(registry)?;
        summary.finish();
        log::info!("{}", summary.headline());
        Ok(summary)
    }
}

fn refresh_team_metadata(record: &mut RegistryRecord, team_index: &HashMap<u64, TeamRecord>) {
    if let Some(team) = team_index.get(&record.team_external_id) {
        record.team_name = team.name.clone();
        record.team_logo_url = team.logo_url.clone();
        record.venue_name = team.venue_name.clone();
    }
}
